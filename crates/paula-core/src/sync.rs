//! Visual sync queue
//!
//! Every register write is mirrored into a bounded single-producer /
//! single-consumer ring as a timestamped [`SyncRecord`]. The render thread
//! drains records only once their timestamp plus the host output latency has
//! passed, so meters and scopes follow what is audible rather than what was
//! last written.
//!
//! The producer side runs under the audio lock and must never block. When the
//! ring is full it resets both cursors (dropping everything unread) and
//! counts the event; the consumer logs a warning the next time it looks.
//!
//! Slots are plain atomics, so a consumer racing a reset can at worst show a
//! stale record for one frame.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::config::MAX_SYNC_QUEUE_BITS;
use crate::{PaulaError, Result};

bitflags! {
    /// Which fields of a [`SyncRecord`] were written
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SyncFlags: u8 {
        /// Volume register written
        const VOLUME = 1 << 0;
        /// Period register written
        const PERIOD = 1 << 1;
        /// Data pointer written
        const DATA = 1 << 2;
        /// Length register written
        const LENGTH = 1 << 3;
        /// DMA started (note trigger)
        const TRIGGER = 1 << 4;
        /// DMA stopped
        const STOP = 1 << 5;
    }
}

/// Snapshot of one voice's visible registers after a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncRecord {
    /// Playback time in nanoseconds on the [`SyncClock`] timeline
    pub timestamp: u64,
    /// Voice index (0-3)
    pub voice: u8,
    /// Fields changed by this write
    pub flags: SyncFlags,
    /// Volume (0-64)
    pub volume: u8,
    /// Raw period register
    pub period: u16,
    /// Length register (words)
    pub length: u16,
    /// Byte offset of the data pointer, `None` when silent
    pub data: Option<usize>,
}

const NO_DATA: u64 = u64::MAX;

impl SyncRecord {
    fn pack(&self) -> u64 {
        u64::from(self.voice)
            | u64::from(self.flags.bits()) << 8
            | u64::from(self.volume) << 16
            | u64::from(self.length) << 24
            | u64::from(self.period) << 40
    }

    fn unpack(timestamp: u64, packed: u64, data: u64) -> Self {
        Self {
            timestamp,
            voice: packed as u8,
            flags: SyncFlags::from_bits_truncate((packed >> 8) as u8),
            volume: (packed >> 16) as u8,
            length: (packed >> 24) as u16,
            period: (packed >> 40) as u16,
            data: if data == NO_DATA {
                None
            } else {
                usize::try_from(data).ok()
            },
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    timestamp: AtomicU64,
    packed: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    fn store(&self, record: &SyncRecord) {
        let data = record.data.map_or(NO_DATA, |offset| offset as u64);
        self.timestamp.store(record.timestamp, Ordering::Relaxed);
        self.packed.store(record.pack(), Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn load(&self) -> SyncRecord {
        SyncRecord::unpack(
            self.timestamp.load(Ordering::Relaxed),
            self.packed.load(Ordering::Relaxed),
            self.data.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug)]
struct Shared {
    slots: Box<[Slot]>,
    mask: usize,
    read: AtomicUsize,
    write: AtomicUsize,
    resets: AtomicU64,
}

impl Shared {
    fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read) & self.mask
    }
}

/// Ring of `2^bits` slots holding up to `2^bits - 1` records
#[derive(Debug)]
pub struct SyncQueue {
    shared: Arc<Shared>,
}

impl SyncQueue {
    /// Allocate a queue
    ///
    /// # Arguments
    ///
    /// * `bits` - Size exponent (1-20); the queue holds `2^bits - 1` records
    ///
    /// # Errors
    ///
    /// `ConfigError` for an out-of-range size, `Allocation` if the slots
    /// cannot be allocated.
    pub fn with_capacity_bits(bits: u32) -> Result<Self> {
        if !(1..=MAX_SYNC_QUEUE_BITS).contains(&bits) {
            return Err(PaulaError::ConfigError(format!(
                "sync queue bits {bits} outside 1-{MAX_SYNC_QUEUE_BITS}"
            )));
        }
        let size = 1usize << bits;
        let mut slots = Vec::new();
        slots.try_reserve_exact(size)?;
        slots.resize_with(size, Slot::default);

        Ok(Self {
            shared: Arc::new(Shared {
                slots: slots.into_boxed_slice(),
                mask: size - 1,
                read: AtomicUsize::new(0),
                write: AtomicUsize::new(0),
                resets: AtomicU64::new(0),
            }),
        })
    }

    /// Maximum number of queued records
    pub fn capacity(&self) -> usize {
        self.shared.mask
    }

    /// Split into the two endpoints
    pub fn split(self) -> (SyncProducer, SyncConsumer) {
        let consumer = SyncConsumer {
            shared: Arc::clone(&self.shared),
            latency_ns: 0,
            seen_resets: 0,
        };
        (SyncProducer { shared: self.shared }, consumer)
    }
}

/// Write side, owned by the engine
#[derive(Debug)]
pub struct SyncProducer {
    shared: Arc<Shared>,
}

impl SyncProducer {
    /// Queue a record without blocking
    ///
    /// On overflow the queue is emptied first and the reset is counted.
    pub fn push(&mut self, record: SyncRecord) {
        let shared = &*self.shared;
        let mut write = shared.write.load(Ordering::Relaxed);
        let next = (write + 1) & shared.mask;

        if next == shared.read.load(Ordering::Acquire) {
            shared.read.store(0, Ordering::Release);
            shared.write.store(0, Ordering::Release);
            shared.resets.fetch_add(1, Ordering::Relaxed);
            write = 0;
        }

        shared.slots[write].store(&record);
        shared.write.store((write + 1) & shared.mask, Ordering::Release);
    }

    /// Records not yet consumed
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overflow resets so far
    pub fn reset_count(&self) -> u64 {
        self.shared.resets.load(Ordering::Relaxed)
    }
}

/// Read side, handed to the render thread
#[derive(Debug)]
pub struct SyncConsumer {
    shared: Arc<Shared>,
    latency_ns: u64,
    seen_resets: u64,
}

impl SyncConsumer {
    /// Set the host output latency records are held back by
    pub fn set_output_latency(&mut self, latency: Duration) {
        self.latency_ns = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
    }

    /// Current output latency
    pub fn output_latency(&self) -> Duration {
        Duration::from_nanos(self.latency_ns)
    }

    /// Pop the oldest record if it is due at `now_ns`
    ///
    /// A record is due once `timestamp + latency <= now_ns`. Records that
    /// are not yet due stay queued.
    pub fn pop_due(&mut self, now_ns: u64) -> Option<SyncRecord> {
        self.check_resets();

        let shared = &*self.shared;
        let read = shared.read.load(Ordering::Acquire);
        if read == shared.write.load(Ordering::Acquire) {
            return None;
        }

        let record = shared.slots[read].load();
        if record.timestamp.saturating_add(self.latency_ns) > now_ns {
            return None;
        }

        // Fails only if the producer reset the ring in the meantime
        shared
            .read
            .compare_exchange(
                read,
                (read + 1) & shared.mask,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| record)
    }

    /// Pop every due record, oldest first
    ///
    /// # Returns
    ///
    /// Number of records handed to `f`
    pub fn drain_due(&mut self, now_ns: u64, mut f: impl FnMut(SyncRecord)) -> usize {
        let mut count = 0;
        while let Some(record) = self.pop_due(now_ns) {
            f(record);
            count += 1;
        }
        count
    }

    /// Records waiting, due or not
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overflow resets so far
    pub fn reset_count(&self) -> u64 {
        self.shared.resets.load(Ordering::Relaxed)
    }

    fn check_resets(&mut self) {
        let resets = self.reset_count();
        if resets != self.seen_resets {
            log::warn!(
                "Sync queue overflowed {} time(s); visual state skipped ahead",
                resets - self.seen_resets
            );
            self.seen_resets = resets;
        }
    }
}

/// Monotonic nanosecond clock shared by the writer and render threads
#[derive(Debug, Clone, Copy)]
pub struct SyncClock {
    epoch: Instant,
}

impl SyncClock {
    /// Clock starting now
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds since the clock was created
    pub fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new()
    }
}

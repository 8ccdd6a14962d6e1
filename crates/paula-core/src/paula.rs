//! Paula chip: four DMA voices and the raw stereo mixer
//!
//! Voices are addressed by index 0..=3; writes to any other index are
//! ignored, like writes to unmapped custom chip registers. The stereo
//! wiring is fixed: voices 0 and 3 feed the left output, 1 and 2 the right.

use crate::constants::{DMACON_AUDIO_MASK, DMACON_SET, NUM_VOICES, PAULA_PAL_CLOCK};
use crate::memory::{DataPointer, SampleMemory};
use crate::voice::Voice;

/// Output side a voice is wired to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Left output
    Left,
    /// Right output
    Right,
}

/// Hardware stereo routing, indexed by voice
pub const ROUTING: [Side; NUM_VOICES] = [Side::Left, Side::Right, Side::Right, Side::Left];

/// Paula audio emulator
///
/// Generates the raw (unfiltered) stereo mix at the Paula rate, which is the
/// output rate or twice the output rate when oversampling.
///
/// # Example
///
/// ```
/// use paula::{Paula, SampleMemory};
///
/// let mut chip = Paula::new(48_000.0);
/// chip.attach_memory(SampleMemory::from_vec(vec![64, -64]));
/// chip.set_data(0, Some(0));
/// chip.set_length(0, 1);
/// chip.set_period(0, 214);
/// chip.set_volume(0, 64);
/// chip.write_dmacon(0x8001);
///
/// let mut left = [0.0f64; 64];
/// let mut right = [0.0f64; 64];
/// chip.generate(&mut left, &mut right);
/// assert!(right.iter().all(|&s| s == 0.0));
/// ```
#[derive(Clone)]
pub struct Paula {
    clock: f64,
    paula_rate: f64,
    voices: [Voice; NUM_VOICES],
    memory: SampleMemory,
}

impl Paula {
    /// Create a PAL Paula generating at `paula_rate` Hz
    pub fn new(paula_rate: f64) -> Self {
        Self::with_clock(PAULA_PAL_CLOCK, paula_rate)
    }

    /// Create a Paula with a custom clock
    ///
    /// # Arguments
    ///
    /// * `clock` - Paula clock in Hz (PAL or NTSC colour clock)
    /// * `paula_rate` - Rate the mixer generates samples at, in Hz
    pub fn with_clock(clock: f64, paula_rate: f64) -> Self {
        let divisor = clock / paula_rate;
        Self {
            clock,
            paula_rate,
            voices: std::array::from_fn(|_| Voice::new(divisor)),
            memory: SampleMemory::empty(),
        }
    }

    /// Change clock and generation rate
    ///
    /// Pending deltas are re-derived from the stored period registers.
    pub fn set_rates(&mut self, clock: f64, paula_rate: f64) {
        self.clock = clock;
        self.paula_rate = paula_rate;
        let divisor = clock / paula_rate;
        for voice in &mut self.voices {
            voice.set_delta_divisor(divisor);
        }
    }

    /// Paula clock in Hz
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Generation rate in Hz
    pub fn paula_rate(&self) -> f64 {
        self.paula_rate
    }

    /// Reset all voices to power-on state (memory stays attached)
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    /// Attach a new sample arena
    ///
    /// All DMA is stopped and every data pointer is redirected to silence,
    /// since offsets into the previous arena mean nothing in the new one.
    pub fn attach_memory(&mut self, memory: SampleMemory) {
        for voice in &mut self.voices {
            voice.stop_dma();
            voice.set_data(DataPointer::Silent);
        }
        self.memory = memory;
    }

    /// Attached sample arena
    pub fn memory(&self) -> &SampleMemory {
        &self.memory
    }

    /// AUDxPER write
    ///
    /// # Arguments
    ///
    /// * `voice` - Voice index (0-3)
    /// * `period` - Period in Paula clock ticks per sample byte
    pub fn set_period(&mut self, voice: usize, period: u16) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_period(period);
        }
    }

    /// AUDxVOL write (0-64, larger values clamp)
    pub fn set_volume(&mut self, voice: usize, volume: u16) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_volume(volume);
        }
    }

    /// AUDxLEN write (in words, 0 means 65536)
    pub fn set_length(&mut self, voice: usize, length: u16) {
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_length(length);
        }
    }

    /// AUDxLC write
    ///
    /// # Arguments
    ///
    /// * `voice` - Voice index (0-3)
    /// * `offset` - Byte offset into the attached memory; `None` or an
    ///   offset outside the arena selects the silent buffer
    pub fn set_data(&mut self, voice: usize, offset: Option<usize>) {
        let pointer = self.memory.resolve(offset);
        if let Some(v) = self.voices.get_mut(voice) {
            v.set_data(pointer);
        }
    }

    /// Start DMA for every voice whose bit is set in `mask`
    pub fn start_dma(&mut self, mask: u16) {
        for (i, voice) in self.voices.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                voice.start_dma();
            }
        }
    }

    /// Stop DMA for every voice whose bit is set in `mask`
    pub fn stop_dma(&mut self, mask: u16) {
        for (i, voice) in self.voices.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                voice.stop_dma();
            }
        }
    }

    /// DMACON write
    ///
    /// Bit 15 selects set (start) or clear (stop); bits 0-3 select voices.
    pub fn write_dmacon(&mut self, value: u16) {
        let mask = value & DMACON_AUDIO_MASK;
        if value & DMACON_SET != 0 {
            self.start_dma(mask);
        } else {
            self.stop_dma(mask);
        }
    }

    /// Audio DMA enable bits as they would read back from DMACONR
    pub fn dma_enabled(&self) -> u16 {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active())
            .fold(0, |mask, (i, _)| mask | (1 << i))
    }

    /// Voice state by index
    pub fn voice(&self, voice: usize) -> Option<&Voice> {
        self.voices.get(voice)
    }

    /// All four voices
    pub fn voices(&self) -> &[Voice; NUM_VOICES] {
        &self.voices
    }

    /// Mix all active voices into `left` / `right`
    ///
    /// Both buffers are overwritten; if their lengths differ only the common
    /// prefix is generated. Inactive voices contribute nothing and do not
    /// advance; their step history restarts from silence.
    pub fn generate(&mut self, left: &mut [f64], right: &mut [f64]) {
        let len = left.len().min(right.len());
        let left = &mut left[..len];
        let right = &mut right[..len];
        left.fill(0.0);
        right.fill(0.0);
        if len == 0 {
            return;
        }

        for (voice, side) in self.voices.iter_mut().zip(ROUTING) {
            if !voice.is_active() {
                voice.silence();
                continue;
            }
            let out = match side {
                Side::Left => &mut *left,
                Side::Right => &mut *right,
            };
            for sample in out.iter_mut() {
                *sample += voice.next_sample(&self.memory);
            }
        }
    }
}

impl Default for Paula {
    fn default() -> Self {
        Self::new(48_000.0)
    }
}

impl std::fmt::Debug for Paula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paula")
            .field("clock", &self.clock)
            .field("paula_rate", &self.paula_rate)
            .field("dma_enabled", &self.dma_enabled())
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

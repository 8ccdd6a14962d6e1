//! Paula voice (audio DMA channel)
//!
//! A voice mirrors the AUDxLC/AUDxLEN/AUDxPER/AUDxVOL registers and the DMA
//! engine behind them. DMA fetches one 16-bit word (two sample bytes) at a
//! time; the phase accumulator decides when the next byte is due. A period
//! write only becomes audible at the next phase wraparound, the same point
//! at which the hardware reloads its period counter.

use crate::blep::Blep;
use crate::constants::{effective_period, MAX_VOLUME, VOLUME_SCALE};
use crate::memory::{DataPointer, SampleMemory};

/// Number of words DMA plays for a length register value (0 means 65536)
#[inline]
fn length_in_words(length: u16) -> u32 {
    match length {
        0 => 65_536,
        words => u32::from(words),
    }
}

/// Single Paula voice
#[derive(Clone, Debug, PartialEq)]
pub struct Voice {
    // Latched registers
    data_latch: DataPointer,
    length_latch: u16,
    period: u16,
    volume: u16,
    volume_scale: f64,

    // Clock / output rate, cached per effective period
    delta_divisor: f64,
    cached_period: u32,
    cached_delta: f64,

    // DMA
    active: bool,
    location: DataPointer,
    length_counter: u32,
    fetch: [i8; 2],
    fetch_left: u8,

    // Phase accumulator
    phase: f64,
    delta: f64,
    pending_delta: f64,
    blep_offset: f64,

    // Anti-aliasing
    last_raw: f64,
    blep: Blep,
}

impl Voice {
    /// Create an idle voice
    ///
    /// # Arguments
    ///
    /// * `delta_divisor` - Paula clock divided by the rate the voice is
    ///   generated at (already doubled when oversampling)
    pub fn new(delta_divisor: f64) -> Self {
        let mut voice = Self {
            data_latch: DataPointer::Silent,
            length_latch: 0,
            period: 0,
            volume: 0,
            volume_scale: 0.0,
            delta_divisor,
            cached_period: 0,
            cached_delta: 0.0,
            active: false,
            location: DataPointer::Silent,
            length_counter: 0,
            fetch: [0; 2],
            fetch_left: 0,
            phase: 0.0,
            delta: 0.0,
            pending_delta: 0.0,
            blep_offset: 0.0,
            last_raw: 0.0,
            blep: Blep::new(),
        };
        voice.set_period(0);
        voice.delta = voice.pending_delta;
        voice
    }

    /// Reset to power-on state, keeping the rate configuration
    pub fn reset(&mut self) {
        *self = Self::new(self.delta_divisor);
    }

    /// Change the clock / rate ratio
    ///
    /// The pending delta is re-derived from the stored period; the active
    /// delta is rescaled so the current byte keeps its duration in time.
    pub fn set_delta_divisor(&mut self, delta_divisor: f64) {
        if self.delta_divisor > 0.0 {
            self.delta *= delta_divisor / self.delta_divisor;
        }
        self.delta_divisor = delta_divisor;
        self.cached_period = 0;
        self.set_period(self.period);
    }

    /// AUDxPER write
    ///
    /// Takes effect at the next phase wraparound (or DMA start).
    #[inline]
    pub fn set_period(&mut self, period: u16) {
        self.period = period;
        let effective = effective_period(period);
        if effective != self.cached_period {
            self.cached_period = effective;
            self.cached_delta = self.delta_divisor / f64::from(effective);
        }
        self.pending_delta = self.cached_delta;
    }

    /// AUDxVOL write, clamped to 0..=64
    #[inline]
    pub fn set_volume(&mut self, volume: u16) {
        self.volume = volume.min(MAX_VOLUME);
        self.volume_scale = f64::from(self.volume) * VOLUME_SCALE;
    }

    /// AUDxLEN write (in words)
    #[inline]
    pub fn set_length(&mut self, length: u16) {
        self.length_latch = length;
    }

    /// AUDxLC write
    #[inline]
    pub fn set_data(&mut self, pointer: DataPointer) {
        self.data_latch = pointer;
    }

    /// DMA enable: restart from the latched pointer and length immediately
    pub fn start_dma(&mut self) {
        self.location = self.data_latch;
        self.length_counter = length_in_words(self.length_latch);
        self.fetch_left = 0;
        self.phase = 0.0;
        self.blep_offset = 0.0;
        self.delta = self.pending_delta;
        self.active = true;
    }

    /// DMA disable; the voice is silent from the next sample on
    #[inline]
    pub fn stop_dma(&mut self) {
        self.active = false;
    }

    /// Record that the voice emitted silence
    ///
    /// The mixer calls this for every block it skips an inactive voice, so
    /// the first sample after a restart is stepped up from zero rather than
    /// from the value held before the stop.
    #[inline]
    pub fn silence(&mut self) {
        self.last_raw = 0.0;
        self.blep.clear();
    }

    /// Generate one output sample
    ///
    /// Returns the raw held sample plus any pending BLEP correction.
    #[inline]
    pub fn next_sample(&mut self, memory: &SampleMemory) -> f64 {
        // Both bytes of the last word played: DMA fetches the next one
        if self.fetch_left == 0 {
            self.fetch_word(memory);
        }

        // New held value: queue a band-limited step for the difference
        let raw = f64::from(self.fetch[0]) * self.volume_scale;
        if raw != self.last_raw {
            self.blep.add(self.blep_offset, self.last_raw - raw);
            self.last_raw = raw;
        }

        let mut output = raw;
        if self.blep.is_active() {
            output += self.blep.run();
        }

        // Advance; a wrap moves on to the next byte
        self.phase += self.delta;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            // Output samples elapsed since the edge, as seen from the next sample
            self.blep_offset = self.phase / self.delta;

            // Shift the second byte of the word into the output latch
            self.fetch[0] = self.fetch[1];
            self.fetch_left = self.fetch_left.saturating_sub(1);

            // Period writes become audible here
            self.delta = self.pending_delta;
        }

        output
    }

    fn fetch_word(&mut self, memory: &SampleMemory) {
        self.fetch = memory.word(self.location);
        self.fetch_left = 2;
        self.location = self.location.next_word();

        // Last word of the block: reload pointer and length from the latches
        self.length_counter = self.length_counter.saturating_sub(1);
        if self.length_counter == 0 {
            self.location = self.data_latch;
            self.length_counter = length_in_words(self.length_latch);
        }
    }

    /// Whether DMA is running for this voice
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw period register value
    pub fn period(&self) -> u16 {
        self.period
    }

    /// Volume register value after clamping
    pub fn volume(&self) -> u16 {
        self.volume
    }

    /// Latched length register (words)
    pub fn length(&self) -> u16 {
        self.length_latch
    }

    /// Latched data pointer
    pub fn data(&self) -> DataPointer {
        self.data_latch
    }

    /// Current DMA position
    pub fn location(&self) -> DataPointer {
        self.location
    }

    /// Phase increment currently driving output
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Phase increment waiting for the next wraparound
    pub fn pending_delta(&self) -> f64 {
        self.pending_delta
    }

    /// Phase accumulator in `[0, 1)`
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

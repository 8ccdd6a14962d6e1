//! Render-side voice state
//!
//! Rebuilds what each voice looks like from drained [`SyncRecord`]s, for
//! level meters, scopes and pattern-side note display. Nothing here can reach
//! back into the engine.
//!
//! # Example
//!
//! ```
//! use paula::{ChipView, SyncFlags, SyncRecord};
//! use paula::constants::PAULA_PAL_CLOCK;
//!
//! let mut view = ChipView::new(PAULA_PAL_CLOCK);
//! view.apply(&SyncRecord {
//!     voice: 0,
//!     flags: SyncFlags::PERIOD | SyncFlags::VOLUME | SyncFlags::TRIGGER,
//!     period: 428,
//!     volume: 64,
//!     ..Default::default()
//! });
//!
//! assert_eq!(view.voices[0].note_name, Some("C-2"));
//! assert_eq!(view.voices[0].vu, 1.0);
//! ```

use crate::constants::{MAX_VOLUME, NUM_VOICES};
use crate::sync::{SyncFlags, SyncRecord};

/// ProTracker periods (finetune 0) for C-1 .. B-3
const NOTE_PERIODS: [u16; 36] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, //
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226, //
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113,
];

const NOTE_NAMES: [&str; 36] = [
    "C-1", "C#1", "D-1", "D#1", "E-1", "F-1", "F#1", "G-1", "G#1", "A-1", "A#1", "B-1", //
    "C-2", "C#2", "D-2", "D#2", "E-2", "F-2", "F#2", "G-2", "G#2", "A-2", "A#2", "B-2", //
    "C-3", "C#3", "D-3", "D#3", "E-3", "F-3", "F#3", "G-3", "G#3", "A-3", "A#3", "B-3",
];

/// Half a semitone as a period ratio
const HALF_SEMITONE: f64 = 1.029_302_236_643_492;

/// Tracker note for a period
///
/// Picks the nearest entry of the ProTracker period table; periods more
/// than half a semitone outside the table have no name.
pub fn period_to_note(period: u16) -> Option<&'static str> {
    if period == 0 {
        return None;
    }
    let (index, &nearest) = NOTE_PERIODS
        .iter()
        .enumerate()
        .min_by_key(|&(_, &p)| p.abs_diff(period))?;

    let ratio = f64::from(period.max(nearest)) / f64::from(period.min(nearest));
    if ratio > HALF_SEMITONE {
        return None;
    }
    NOTE_NAMES.get(index).copied()
}

/// Visible state of one voice
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoiceView {
    /// Raw period register
    pub period: u16,
    /// Sample playback rate in Hz (`clock / period`), `None` for period 0
    pub playback_rate_hz: Option<f64>,
    /// Tracker note name (e.g. "C-2", "A#3")
    pub note_name: Option<&'static str>,
    /// Volume register (0-64)
    pub volume: u8,
    /// Volume as 0.0-1.0
    pub volume_normalized: f32,
    /// Data pointer byte offset, `None` when silent
    pub data: Option<usize>,
    /// Length register (words)
    pub length: u16,
    /// DMA running
    pub dma_active: bool,
    /// Meter level, set on trigger and decayed by [`ChipView::decay_vu`]
    pub vu: f32,
}

impl VoiceView {
    fn apply(&mut self, record: &SyncRecord, clock: f64) {
        self.period = record.period;
        self.playback_rate_hz = (record.period > 0).then(|| clock / f64::from(record.period));
        self.note_name = period_to_note(record.period);
        self.volume = record.volume;
        self.volume_normalized = f32::from(record.volume) / f32::from(MAX_VOLUME);
        self.data = record.data;
        self.length = record.length;

        if record.flags.contains(SyncFlags::TRIGGER) {
            self.dma_active = true;
            self.vu = self.volume_normalized;
        } else if record.flags.contains(SyncFlags::VOLUME) && self.dma_active {
            self.vu = self.vu.max(self.volume_normalized);
        }
        if record.flags.contains(SyncFlags::STOP) {
            self.dma_active = false;
        }
    }
}

/// Visible state of all four voices
#[derive(Debug, Clone, PartialEq)]
pub struct ChipView {
    /// Per-voice state, indexed by voice
    pub voices: [VoiceView; NUM_VOICES],
    clock: f64,
}

impl ChipView {
    /// Empty view for a Paula clock (Hz)
    pub fn new(clock: f64) -> Self {
        Self {
            voices: [VoiceView::default(); NUM_VOICES],
            clock,
        }
    }

    /// Apply one drained record (unknown voices are ignored)
    pub fn apply(&mut self, record: &SyncRecord) {
        if let Some(voice) = self.voices.get_mut(usize::from(record.voice)) {
            voice.apply(record, self.clock);
        }
    }

    /// Multiply every meter level by `factor` (0.0-1.0)
    pub fn decay_vu(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        for voice in &mut self.voices {
            voice.vu *= factor;
        }
    }

    /// Highest meter level across voices
    pub fn max_vu(&self) -> f32 {
        self.voices.iter().map(|v| v.vu).fold(0.0, f32::max)
    }

    /// Voices with DMA running and non-zero volume
    pub fn active_voices(&self) -> impl Iterator<Item = (usize, &VoiceView)> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.dma_active && v.volume > 0)
    }
}

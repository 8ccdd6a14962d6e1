//! Engine configuration
//!
//! Everything here is setup-time state. Validation happens once, when the
//! engine is built or reconfigured; register writes never consult it.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_OUTPUT_RATE, MIN_OUTPUT_RATE, PAULA_NTSC_CLOCK, PAULA_PAL_CLOCK};
use crate::{PaulaError, Result};

/// Default host output rate (48 kHz)
pub const DEFAULT_OUTPUT_RATE: u32 = 48_000;

/// Default largest block rendered in one pass
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 4096;

/// Default sync queue size: 2^13 slots, 8191 usable
pub const DEFAULT_SYNC_QUEUE_BITS: u32 = 13;

/// Largest accepted sync queue size exponent
pub const MAX_SYNC_QUEUE_BITS: u32 = 20;

/// Emulated machine, which selects the analog output filter components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmigaModel {
    /// A500: 4.4 kHz static low-pass, always audible
    #[default]
    A500,
    /// A1200: 34 kHz static low-pass, only applied when below Nyquist
    A1200,
}

/// Video standard, which selects the Paula clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStandard {
    /// PAL colour clock (3.546895 MHz)
    #[default]
    Pal,
    /// NTSC colour clock (3.579545 MHz)
    Ntsc,
}

impl VideoStandard {
    /// Paula clock in Hz
    pub fn paula_clock(self) -> f64 {
        match self {
            VideoStandard::Pal => PAULA_PAL_CLOCK,
            VideoStandard::Ntsc => PAULA_NTSC_CLOCK,
        }
    }
}

/// Internal 2x oversampling mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oversampling {
    /// Generate and filter at the output rate
    #[default]
    Off,
    /// Generate and filter at twice the output rate, then decimate
    ///
    /// Improves BLEP and filter accuracy near Nyquist.
    FilterAtHighRate,
    /// Generate at twice the output rate, decimate, then filter
    FilterAtOutputRate,
}

impl Oversampling {
    /// Whether voices generate at twice the output rate
    pub fn is_enabled(self) -> bool {
        !matches!(self, Oversampling::Off)
    }

    /// Generation rate factor (1 or 2)
    pub fn factor(self) -> usize {
        if self.is_enabled() {
            2
        } else {
            1
        }
    }
}

/// Engine setup parameters
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host output rate in Hz (32000-384000)
    pub output_rate: u32,
    /// Oversampling mode
    pub oversampling: Oversampling,
    /// Emulated machine
    pub model: AmigaModel,
    /// Paula clock source
    pub video_standard: VideoStandard,
    /// Initial LED filter state
    pub led_filter: bool,
    /// Stereo separation in percent (0 = mono, 100 = hard L/R/R/L)
    pub stereo_separation: u8,
    /// Linear gain applied after the filter chain
    pub master_gain: f32,
    /// Largest block rendered in one pass; scratch buffers are sized from it
    pub max_block_frames: usize,
    /// Sync queue holds `2^sync_queue_bits - 1` records
    pub sync_queue_bits: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_rate: DEFAULT_OUTPUT_RATE,
            oversampling: Oversampling::Off,
            model: AmigaModel::A500,
            video_standard: VideoStandard::Pal,
            led_filter: false,
            stereo_separation: 20,
            master_gain: 0.5,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            sync_queue_bits: DEFAULT_SYNC_QUEUE_BITS,
        }
    }
}

impl EngineConfig {
    /// Set the output rate
    pub fn output_rate(mut self, rate: u32) -> Self {
        self.output_rate = rate;
        self
    }

    /// Set the oversampling mode
    pub fn oversampling(mut self, mode: Oversampling) -> Self {
        self.oversampling = mode;
        self
    }

    /// Set the emulated machine
    pub fn model(mut self, model: AmigaModel) -> Self {
        self.model = model;
        self
    }

    /// Set the video standard
    pub fn video_standard(mut self, standard: VideoStandard) -> Self {
        self.video_standard = standard;
        self
    }

    /// Set the initial LED filter state
    pub fn led_filter(mut self, enabled: bool) -> Self {
        self.led_filter = enabled;
        self
    }

    /// Set the stereo separation (percent)
    pub fn stereo_separation(mut self, percent: u8) -> Self {
        self.stereo_separation = percent;
        self
    }

    /// Set the master gain
    pub fn master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain;
        self
    }

    /// Set the largest block rendered in one pass
    pub fn max_block_frames(mut self, frames: usize) -> Self {
        self.max_block_frames = frames;
        self
    }

    /// Set the sync queue size exponent
    pub fn sync_queue_bits(mut self, bits: u32) -> Self {
        self.sync_queue_bits = bits;
        self
    }

    /// Rate the voices and (depending on mode) the filters run at
    pub fn paula_rate(&self) -> f64 {
        f64::from(self.output_rate) * self.oversampling.factor() as f64
    }

    /// Check every field against its accepted range
    pub fn validate(&self) -> Result<()> {
        validate_output_rate(self.output_rate)?;

        if self.stereo_separation > 100 {
            return Err(PaulaError::ConfigError(format!(
                "stereo separation {}% outside 0-100",
                self.stereo_separation
            )));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(PaulaError::ConfigError(format!(
                "master gain {} must be finite and non-negative",
                self.master_gain
            )));
        }
        if self.max_block_frames == 0 {
            return Err(PaulaError::ConfigError(
                "max block frames must be non-zero".to_string(),
            ));
        }
        if !(1..=MAX_SYNC_QUEUE_BITS).contains(&self.sync_queue_bits) {
            return Err(PaulaError::ConfigError(format!(
                "sync queue bits {} outside 1-{}",
                self.sync_queue_bits, MAX_SYNC_QUEUE_BITS
            )));
        }
        Ok(())
    }
}

/// Check a host output rate
pub fn validate_output_rate(rate: u32) -> Result<()> {
    if (MIN_OUTPUT_RATE..=MAX_OUTPUT_RATE).contains(&rate) {
        Ok(())
    } else {
        Err(PaulaError::ConfigError(format!(
            "output rate {rate} Hz outside {MIN_OUTPUT_RATE}-{MAX_OUTPUT_RATE} Hz"
        )))
    }
}

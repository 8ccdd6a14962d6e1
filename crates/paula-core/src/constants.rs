//! Paula hardware constants
//!
//! Clocks, period limits, DMACON bits and the nominal component values of
//! the analog output stage. Cutoff helpers derive the -3 dB points from the
//! resistor/capacitor pairs instead of hardcoding rounded frequencies.

use std::f64::consts::PI;

/// Number of Paula voices
pub const NUM_VOICES: usize = 4;

/// PAL Paula clock in Hz (colour clock of a PAL Amiga)
pub const PAULA_PAL_CLOCK: f64 = 3_546_895.0;

/// NTSC Paula clock in Hz
pub const PAULA_NTSC_CLOCK: f64 = 3_579_545.0;

/// Lowest period the DMA can sustain; smaller values are raised to this.
pub const MIN_PERIOD: u32 = 113;

/// Period register value 0 wraps around to the longest possible period.
pub const ZERO_PERIOD: u32 = 65_536;

/// Maximum volume register value
pub const MAX_VOLUME: u16 = 64;

/// Volume scale: `volume / (128 * 64)` maps signed 8-bit sample data and
/// volume 0..=64 onto roughly -1.0..1.0.
pub const VOLUME_SCALE: f64 = 1.0 / (128.0 * 64.0);

/// DMACON SET/CLR bit
pub const DMACON_SET: u16 = 0x8000;

/// DMACON audio channel enable bits (AUD0..AUD3)
pub const DMACON_AUDIO_MASK: u16 = 0x000F;

/// Bias added inside every filter stage so sustained silence never decays
/// into denormals.
pub const DENORMAL_OFFSET: f64 = 1e-20;

/// Supported host output rates in Hz.
pub const MIN_OUTPUT_RATE: u32 = 32_000;
/// Upper bound of the supported host output rate.
pub const MAX_OUTPUT_RATE: u32 = 384_000;

/// A500 static low-pass: R = 360 ohm, C = 0.1 uF (~4421 Hz)
pub const A500_LOWPASS_R: f64 = 360.0;
/// A500 static low-pass capacitor
pub const A500_LOWPASS_C: f64 = 1e-7;

/// A1200 static low-pass: R = 680 ohm, C = 6800 pF (~34419 Hz)
pub const A1200_LOWPASS_R: f64 = 680.0;
/// A1200 static low-pass capacitor
pub const A1200_LOWPASS_C: f64 = 6.8e-9;

/// A500 high-pass: R = 1390 ohm (1k + 390), C = 22 uF (~5.2 Hz)
pub const A500_HIGHPASS_R: f64 = 1390.0;
/// A500 high-pass capacitor
pub const A500_HIGHPASS_C: f64 = 2.2e-5;

/// A1200 high-pass: R = 1360 ohm (1k + 360), C = 22 uF (~5.3 Hz)
pub const A1200_HIGHPASS_R: f64 = 1360.0;
/// A1200 high-pass capacitor
pub const A1200_HIGHPASS_C: f64 = 2.2e-5;

/// LED filter (Sallen-Key) resistors, both 10 kohm
pub const LED_R1: f64 = 10_000.0;
/// Second LED filter resistor
pub const LED_R2: f64 = 10_000.0;
/// LED filter capacitor C1 (6800 pF)
pub const LED_C1: f64 = 6.8e-9;
/// LED filter capacitor C2 (3900 pF)
pub const LED_C2: f64 = 3.9e-9;

/// -3 dB frequency of a first order RC network
#[inline]
pub fn rc_cutoff(r: f64, c: f64) -> f64 {
    1.0 / (2.0 * PI * r * c)
}

/// Cutoff of the unity gain Sallen-Key low-pass (~3090 Hz)
pub fn led_cutoff() -> f64 {
    1.0 / (2.0 * PI * (LED_R1 * LED_R2 * LED_C1 * LED_C2).sqrt())
}

/// Q of the unity gain Sallen-Key low-pass (~0.660)
pub fn led_q() -> f64 {
    (LED_R1 * LED_R2 * LED_C1 * LED_C2).sqrt() / (LED_C2 * (LED_R1 + LED_R2))
}

/// Effective period for a raw period register value
///
/// 0 wraps around to 65536 and anything below [`MIN_PERIOD`] is raised to it.
#[inline]
pub fn effective_period(period: u16) -> u32 {
    match u32::from(period) {
        0 => ZERO_PERIOD,
        p if p < MIN_PERIOD => MIN_PERIOD,
        p => p,
    }
}

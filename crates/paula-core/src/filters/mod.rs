//! Analog output stage of the A500 / A1200
//!
//! - [`OnePole`] - RC low-pass and high-pass stages
//! - [`LedFilter`] - switchable two-pole "LED" low-pass
//! - [`FilterChain`] - the fixed static LP -> LED -> HP pipeline

mod chain;
mod led;
mod one_pole;

pub use chain::{FilterChain, Pipeline};
pub use led::LedFilter;
pub use one_pole::{OnePole, OnePoleKind};

/// Highest cutoff used for coefficient design, as a fraction of the rate
const MAX_CUTOFF_RATIO: f64 = 0.49;

/// Per-channel filter state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Stereo<T> {
    pub(crate) left: T,
    pub(crate) right: T,
}

/// Keep a cutoff below Nyquist so the pre-warp stays finite
#[inline]
pub(crate) fn clamp_cutoff(cutoff: f64, rate: f64) -> f64 {
    cutoff.min(rate * MAX_CUTOFF_RATIO)
}

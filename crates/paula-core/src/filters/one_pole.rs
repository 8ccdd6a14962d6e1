//! First order RC stage
//!
//! Bilinear transform with tangent pre-warping, so the -3 dB point lands on
//! the analog cutoff regardless of the rate. Evaluated in direct form I with
//! one history sample per channel.

use std::f64::consts::PI;

use super::{clamp_cutoff, Stereo};
use crate::constants::DENORMAL_OFFSET;

/// Response of a [`OnePole`] stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnePoleKind {
    /// RC low-pass
    LowPass,
    /// RC high-pass (DC blocker)
    HighPass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct History {
    x1: f64,
    y1: f64,
}

/// One-pole IIR stage with stereo state
#[derive(Debug, Clone, PartialEq)]
pub struct OnePole {
    kind: OnePoleKind,
    cutoff: f64,
    b0: f64,
    b1: f64,
    a1: f64,
    state: Stereo<History>,
}

impl OnePole {
    /// Create a stage
    ///
    /// # Arguments
    ///
    /// * `kind` - Low-pass or high-pass response
    /// * `cutoff` - -3 dB frequency in Hz
    /// * `rate` - Rate the stage runs at in Hz
    pub fn new(kind: OnePoleKind, cutoff: f64, rate: f64) -> Self {
        let mut stage = Self {
            kind,
            cutoff,
            b0: 1.0,
            b1: 0.0,
            a1: 0.0,
            state: Stereo::default(),
        };
        stage.set_rate(rate);
        stage
    }

    /// RC low-pass stage
    pub fn low_pass(cutoff: f64, rate: f64) -> Self {
        Self::new(OnePoleKind::LowPass, cutoff, rate)
    }

    /// RC high-pass stage
    pub fn high_pass(cutoff: f64, rate: f64) -> Self {
        Self::new(OnePoleKind::HighPass, cutoff, rate)
    }

    /// Recompute coefficients for a new rate (state is kept)
    pub fn set_rate(&mut self, rate: f64) {
        let k = (PI * clamp_cutoff(self.cutoff, rate) / rate).tan();
        let norm = 1.0 / (1.0 + k);
        match self.kind {
            OnePoleKind::LowPass => {
                self.b0 = k * norm;
                self.b1 = self.b0;
            }
            OnePoleKind::HighPass => {
                self.b0 = norm;
                self.b1 = -norm;
            }
        }
        self.a1 = (k - 1.0) * norm;
    }

    /// Change the cutoff at a given rate (state is kept)
    pub fn set_cutoff(&mut self, cutoff: f64, rate: f64) {
        self.cutoff = cutoff;
        self.set_rate(rate);
    }

    /// Configured cutoff in Hz
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Stage response
    pub fn kind(&self) -> OnePoleKind {
        self.kind
    }

    /// Zero the history of both channels
    pub fn clear(&mut self) {
        self.state = Stereo::default();
    }

    /// Filter one stereo frame
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        (
            Self::tick(self.b0, self.b1, self.a1, &mut self.state.left, left),
            Self::tick(self.b0, self.b1, self.a1, &mut self.state.right, right),
        )
    }

    #[inline(always)]
    fn tick(b0: f64, b1: f64, a1: f64, h: &mut History, input: f64) -> f64 {
        let x = input + DENORMAL_OFFSET;
        let y = b0 * x + b1 * h.x1 - a1 * h.y1;
        h.x1 = x;
        h.y1 = y;
        y
    }
}

//! "LED" filter: unity gain Sallen-Key low-pass
//!
//! Two-pole section with cutoff and Q taken from the nominal component
//! values, mapped to the digital domain with a tangent pre-warped bilinear
//! transform. Coefficients depend only on the rate.

use std::f64::consts::PI;

use super::{clamp_cutoff, Stereo};
use crate::constants::{led_cutoff, led_q, DENORMAL_OFFSET};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct History {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

/// Two-pole resonant low-pass with stereo state
#[derive(Debug, Clone, PartialEq)]
pub struct LedFilter {
    cutoff: f64,
    q: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    state: Stereo<History>,
}

impl LedFilter {
    /// LED filter from the hardware component values
    pub fn new(rate: f64) -> Self {
        Self::with_params(led_cutoff(), led_q(), rate)
    }

    /// Two-pole low-pass with explicit cutoff (Hz) and Q
    pub fn with_params(cutoff: f64, q: f64, rate: f64) -> Self {
        let mut filter = Self {
            cutoff,
            q,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state: Stereo::default(),
        };
        filter.set_rate(rate);
        filter
    }

    /// Recompute coefficients for a new rate (state is kept)
    pub fn set_rate(&mut self, rate: f64) {
        let k = (PI * clamp_cutoff(self.cutoff, rate) / rate).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / self.q + k2);

        self.b0 = k2 * norm;
        self.b1 = 2.0 * self.b0;
        self.b2 = self.b0;
        self.a1 = 2.0 * (k2 - 1.0) * norm;
        self.a2 = (1.0 - k / self.q + k2) * norm;
    }

    /// Cutoff in Hz
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Quality factor
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Zero the history of both channels
    pub fn clear(&mut self) {
        self.state = Stereo::default();
    }

    /// Filter one stereo frame
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let c = [self.b0, self.b1, self.b2, self.a1, self.a2];
        (
            Self::tick(&c, &mut self.state.left, left),
            Self::tick(&c, &mut self.state.right, right),
        )
    }

    #[inline(always)]
    fn tick(c: &[f64; 5], h: &mut History, input: f64) -> f64 {
        let x = input + DENORMAL_OFFSET;
        let y = c[0] * x + c[1] * h.x1 + c[2] * h.x2 - c[3] * h.y1 - c[4] * h.y2;
        h.x2 = h.x1;
        h.x1 = x;
        h.y2 = h.y1;
        h.y1 = y;
        y
    }
}

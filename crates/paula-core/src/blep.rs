//! Band-limited step synthesis
//!
//! Each voice owns a small ring buffer of pending correction energy. When the
//! raw sample-and-hold output jumps, [`Blep::add`] spreads the jump over the
//! next [`BLEP_TAPS`] output samples using the shared residual table, and
//! [`Blep::run`] drains one correction per output sample. The table is static
//! and the ring is inline, so nothing on this path allocates.

use crate::tables::{BLEP_OVERSAMPLING, BLEP_TABLE};

pub use crate::tables::BLEP_TAPS;

/// Ring buffer size (power of two, at least [`BLEP_TAPS`])
const RING_SIZE: usize = BLEP_TAPS.next_power_of_two();
const RING_MASK: usize = RING_SIZE - 1;

/// Kernel value `taps_after_edge` output samples after a discontinuity
///
/// Linearly interpolated between table points.
#[inline]
pub fn kernel(taps_after_edge: f64) -> f64 {
    let pos = taps_after_edge * BLEP_OVERSAMPLING as f64;
    let index = pos as usize;
    if index + 1 >= BLEP_TABLE.len() {
        return 0.0;
    }
    let frac = pos - index as f64;
    BLEP_TABLE[index] + (BLEP_TABLE[index + 1] - BLEP_TABLE[index]) * frac
}

/// Per-voice BLEP correction state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Blep {
    buffer: [f64; RING_SIZE],
    index: usize,
    samples_left: usize,
}

impl Blep {
    /// Create an empty synthesizer
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a discontinuity
    ///
    /// # Arguments
    ///
    /// * `offset` - Output samples elapsed between the discontinuity and the
    ///   next drained sample, clamped to `[0, 1)`
    /// * `amplitude` - Value before the jump minus value after it
    #[inline]
    pub fn add(&mut self, offset: f64, amplitude: f64) {
        let offset = if offset.is_finite() {
            offset.clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };

        let mut i = self.index;
        for tap in 0..BLEP_TAPS {
            self.buffer[i] += amplitude * kernel(tap as f64 + offset);
            i = (i + 1) & RING_MASK;
        }
        self.samples_left = BLEP_TAPS;
    }

    /// Drain the correction for the current output sample
    #[inline]
    pub fn run(&mut self) -> f64 {
        let value = self.buffer[self.index];
        self.buffer[self.index] = 0.0;
        self.index = (self.index + 1) & RING_MASK;
        self.samples_left = self.samples_left.saturating_sub(1);
        value
    }

    /// Whether corrections are still pending
    #[inline]
    pub fn is_active(&self) -> bool {
        self.samples_left > 0
    }

    /// Drop all pending corrections
    pub fn clear(&mut self) {
        self.buffer = [0.0; RING_SIZE];
        self.index = 0;
        self.samples_left = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_blep_is_idle() {
        let mut blep = Blep::new();
        assert!(!blep.is_active());
        assert_eq!(blep.run(), 0.0);
    }

    #[test]
    fn test_drained_corrections_sum_to_scaled_kernel() {
        for &offset in &[0.0, 0.25, 0.5, 0.9] {
            let amplitude = -0.73;
            let mut blep = Blep::new();
            blep.add(offset, amplitude);

            let mut drained = 0.0;
            for _ in 0..BLEP_TAPS {
                assert!(blep.is_active());
                drained += blep.run();
            }
            assert!(!blep.is_active());

            let expected: f64 = (0..BLEP_TAPS)
                .map(|tap| amplitude * kernel(tap as f64 + offset))
                .sum();
            assert_abs_diff_eq!(drained, expected, epsilon = 1e-12);

            // Nothing left behind once drained
            for _ in 0..RING_SIZE {
                assert_eq!(blep.run(), 0.0);
            }
        }
    }

    #[test]
    fn test_first_correction_cancels_jump() {
        // At the edge the residual is 1.0, so old + correction == previous value
        let mut blep = Blep::new();
        blep.add(0.0, 0.5);
        assert_abs_diff_eq!(blep.run(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_is_clamped() {
        let mut a = Blep::new();
        let mut b = Blep::new();
        a.add(-3.0, 1.0);
        b.add(0.0, 1.0);
        assert_eq!(a, b);

        let mut c = Blep::new();
        c.add(f64::NAN, 1.0);
        assert_eq!(c, b);
    }

    #[test]
    fn test_overlapping_edges_accumulate() {
        let mut single = Blep::new();
        single.add(0.0, 1.0);
        let first = single.run();

        let mut double = Blep::new();
        double.add(0.0, 1.0);
        double.add(0.0, 1.0);
        assert_abs_diff_eq!(double.run(), 2.0 * first, epsilon = 1e-12);
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut blep = Blep::new();
        blep.add(0.3, 1.0);
        blep.clear();
        assert_eq!(blep, Blep::new());
    }
}

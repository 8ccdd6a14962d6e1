//! 2x half-band decimator
//!
//! Polyphase IIR half-band (two parallel chains of six second order
//! allpass sections, order 12 overall, ~-70 dB stopband). Every input sample
//! runs through the filter; every second output is kept.
//!
//! Odd input counts are handled with a floor rule: a call yields
//! `(pending + n) / 2` samples and the leftover input is carried into the
//! next call, so splitting a stream into blocks never changes the result.

/// Allpass coefficients of the even path
#[rustfmt::skip]
const PATH_A: [f64; 6] = [
    0.036_681_502_163_648_017,
    0.274_631_759_379_454_1,
    0.561_098_969_787_919_5,
    0.769_741_833_862_266,
    0.892_260_818_003_878_9,
    0.962_094_548_378_084,
];

/// Allpass coefficients of the odd path
#[rustfmt::skip]
const PATH_B: [f64; 6] = [
    0.136_547_624_631_957_71,
    0.423_138_617_436_566_67,
    0.677_540_049_974_161_6,
    0.839_889_624_849_638,
    0.931_541_959_963_183_9,
    0.987_816_370_732_897_1,
];

/// Second order allpass in `z^-2`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Allpass {
    a: f64,
    x: [f64; 2],
    y: [f64; 2],
}

impl Allpass {
    const fn new(a: f64) -> Self {
        Self {
            a,
            x: [0.0; 2],
            y: [0.0; 2],
        }
    }

    #[inline(always)]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.x[1] + (x - self.y[1]) * self.a;
        self.x = [x, self.x[0]];
        self.y = [y, self.y[0]];
        y
    }
}

fn run_path(path: &mut [Allpass; 6], x: f64) -> f64 {
    path.iter_mut().fold(x, |acc, section| section.process(acc))
}

/// Single channel 2:1 decimator
#[derive(Debug, Clone, PartialEq)]
pub struct Decimator {
    path_a: [Allpass; 6],
    path_b: [Allpass; 6],
    delayed_b: f64,
    /// An input sample is waiting for its pair
    pending: bool,
}

impl Decimator {
    /// Create a decimator with cleared delay lines
    pub fn new() -> Self {
        Self {
            path_a: PATH_A.map(Allpass::new),
            path_b: PATH_B.map(Allpass::new),
            delayed_b: 0.0,
            pending: false,
        }
    }

    /// Clear the delay lines and the carried sample
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether an odd input sample is carried into the next call
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Run one high-rate sample through the half-band filter
    #[inline]
    fn filter(&mut self, x: f64) -> f64 {
        // Path B output is one sample late relative to path A
        let y = (run_path(&mut self.path_a, x) + self.delayed_b) * 0.5;
        self.delayed_b = run_path(&mut self.path_b, x);
        y
    }

    /// Decimate `buf` in place
    ///
    /// Output samples are written to the front of `buf`.
    ///
    /// # Returns
    ///
    /// Number of output samples written
    pub fn process_in_place(&mut self, buf: &mut [f64]) -> usize {
        let mut written = 0;
        for i in 0..buf.len() {
            // Every input runs through the filter to keep the delay lines current
            let y = self.filter(buf[i]);

            // Keep the second sample of each pair; `written <= i`, so the
            // write never overtakes the read
            if self.pending {
                buf[written] = y;
                written += 1;
            }
            self.pending = !self.pending;
        }
        written
    }
}

impl Default for Decimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Left/right decimator pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoDecimator {
    left: Decimator,
    right: Decimator,
}

impl StereoDecimator {
    /// Create a pair with cleared delay lines
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both channels
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Decimate both channels in place (common prefix only)
    ///
    /// # Returns
    ///
    /// Number of output frames at the front of each buffer
    pub fn process_in_place(&mut self, left: &mut [f64], right: &mut [f64]) -> usize {
        let len = left.len().min(right.len());
        let written = self.left.process_in_place(&mut left[..len]);
        self.right.process_in_place(&mut right[..len]);
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dc_gain_is_unity() {
        let mut dec = Decimator::new();
        let mut buf = vec![0.75; 4096];
        let n = dec.process_in_place(&mut buf);
        assert_eq!(n, 2048);
        assert_abs_diff_eq!(buf[n - 1], 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_high_rate_nyquist() {
        let mut dec = Decimator::new();
        let mut buf: Vec<f64> = (0..4096)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let n = dec.process_in_place(&mut buf);
        for &y in &buf[n / 2..n] {
            assert!(y.abs() < 1e-3, "leak {y}");
        }
    }

    #[test]
    fn test_odd_counts_carry_over() {
        let mut dec = Decimator::new();
        let mut first = [1.0; 5];
        assert_eq!(dec.process_in_place(&mut first), 2);
        assert!(dec.has_pending());

        let mut second = [1.0; 3];
        assert_eq!(dec.process_in_place(&mut second), 2);
        assert!(!dec.has_pending());

        let mut single = [1.0];
        assert_eq!(dec.process_in_place(&mut single), 0);
        assert_eq!(dec.process_in_place(&mut []), 0);
    }

    #[test]
    fn test_block_split_matches_single_pass() {
        let input: Vec<f64> = (0..301).map(|i| ((i * 37) % 101) as f64 / 50.0 - 1.0).collect();

        let mut whole = input.clone();
        let mut dec = Decimator::new();
        let n = dec.process_in_place(&mut whole);
        assert_eq!(n, 150);

        let mut split = Decimator::new();
        let mut out = Vec::new();
        for chunk in input.chunks(7) {
            let mut chunk = chunk.to_vec();
            let m = split.process_in_place(&mut chunk);
            out.extend_from_slice(&chunk[..m]);
        }
        assert_eq!(out, whole[..n]);
    }

    #[test]
    fn test_stereo_pair_is_independent() {
        let mut dec = StereoDecimator::new();
        let mut left = vec![1.0; 64];
        let mut right = vec![0.0; 64];
        let n = dec.process_in_place(&mut left, &mut right);
        assert_eq!(n, 32);
        assert!(right[..n].iter().all(|&s| s == 0.0));
        assert!(left[..n].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut dec = StereoDecimator::new();
        let mut left = vec![0.3; 9];
        let mut right = vec![-0.3; 9];
        dec.process_in_place(&mut left, &mut right);
        dec.reset();
        assert_eq!(dec, StereoDecimator::new());
    }
}

//! Post-filter output stage
//!
//! Hardware stereo is hard-panned (L/R/R/L), which is tiring on headphones;
//! trackers narrow it with a mid/side blend. Gain is applied afterwards and
//! the result leaves the engine as `f32`. Integer conversion belongs to the
//! audio callback and is offered here as a helper.

/// Stereo separation and master gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoMix {
    side_scale: f64,
    gain: f64,
}

impl StereoMix {
    /// Create a post stage
    ///
    /// # Arguments
    ///
    /// * `separation` - Stereo width in percent (0 = mono, 100 = hardware)
    /// * `gain` - Linear output gain
    pub fn new(separation: u8, gain: f32) -> Self {
        Self {
            side_scale: f64::from(separation.min(100)) / 100.0,
            gain: f64::from(gain),
        }
    }

    /// Change the separation (percent, clamped to 100)
    pub fn set_separation(&mut self, separation: u8) {
        self.side_scale = f64::from(separation.min(100)) / 100.0;
    }

    /// Change the output gain
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = f64::from(gain);
    }

    /// Separation in percent
    pub fn separation(&self) -> u8 {
        (self.side_scale * 100.0).round() as u8
    }

    /// One stereo frame
    #[inline]
    pub fn apply(&self, left: f64, right: f64) -> (f32, f32) {
        let mid = (left + right) * 0.5;
        let side = (left - right) * 0.5 * self.side_scale;
        (
            ((mid + side) * self.gain) as f32,
            ((mid - side) * self.gain) as f32,
        )
    }

    /// Write a processed block into `f32` output buffers
    ///
    /// Processes the shortest of the four slices.
    pub fn apply_block(
        &self,
        src_left: &[f64],
        src_right: &[f64],
        left: &mut [f32],
        right: &mut [f32],
    ) {
        let frames = src_left.iter().zip(src_right);
        for ((l, r), (&sl, &sr)) in left.iter_mut().zip(right.iter_mut()).zip(frames) {
            (*l, *r) = self.apply(sl, sr);
        }
    }
}

impl Default for StereoMix {
    fn default() -> Self {
        Self::new(100, 1.0)
    }
}

/// Convert a float sample to 16-bit PCM, clamping to full scale
#[inline]
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Interleave a stereo float block into 16-bit PCM
///
/// # Returns
///
/// Number of frames written (limited by the shortest buffer)
pub fn to_i16_interleaved(left: &[f32], right: &[f32], out: &mut [i16]) -> usize {
    let mut frames = 0;
    for ((frame, &l), &r) in out.chunks_exact_mut(2).zip(left).zip(right) {
        frame[0] = to_i16(l);
        frame[1] = to_i16(r);
        frames += 1;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_separation_is_identity() {
        let mix = StereoMix::new(100, 1.0);
        let (l, r) = mix.apply(0.5, -0.25);
        assert_relative_eq!(l, 0.5);
        assert_relative_eq!(r, -0.25);
    }

    #[test]
    fn test_zero_separation_is_mono() {
        let mix = StereoMix::new(0, 1.0);
        let (l, r) = mix.apply(1.0, 0.0);
        assert_eq!(l, 0.5);
        assert_eq!(r, 0.5);
    }

    #[test]
    fn test_gain_and_clamped_separation() {
        let mix = StereoMix::new(250, 0.5);
        assert_eq!(mix.separation(), 100);
        let (l, r) = mix.apply(1.0, -1.0);
        assert_eq!((l, r), (0.5, -0.5));
    }

    #[test]
    fn test_apply_block_uses_shortest_slice() {
        let mix = StereoMix::default();
        let src_l = [0.1, 0.2, 0.3];
        let src_r = [0.4, 0.5];
        let mut left = [9.0f32; 4];
        let mut right = [9.0f32; 4];
        mix.apply_block(&src_l, &src_r, &mut left, &mut right);
        assert_relative_eq!(left[1], 0.2);
        assert_relative_eq!(right[1], 0.5);
        assert_eq!(left[2], 9.0);
    }

    #[test]
    fn test_i16_conversion() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-1.0), -32767);
        assert_eq!(to_i16(3.0), 32767);
        assert_eq!(to_i16(-3.0), -32767);

        let mut out = [0i16; 6];
        let frames = to_i16_interleaved(&[0.5, -0.5], &[1.0, 0.0], &mut out);
        assert_eq!(frames, 2);
        assert_eq!(out, [16384, 32767, -16384, 0, 0, 0]);
    }
}

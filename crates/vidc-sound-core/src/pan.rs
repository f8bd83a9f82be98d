//! Stereo image registers and the per-channel pan matrix
//!
//! Each of the eight channels has a 3-bit stereo image register selecting a
//! left/right split; the matrix holds the resulting gain pairs in 16.16
//! fixed point so the decoder can position samples with one multiply per
//! side.

/// Byte ordering of channel data in the DMA stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StereoSense {
    /// Data is ordered with the left channel first
    #[default]
    LeftFirst,
    /// Data is ordered with the right channel first
    RightFirst,
}

/// Number of time-division-multiplexed channels.
pub const NUM_CHANNELS: usize = 8;

/// Per-channel left/right gains, 16.16 fixed point.
///
/// Starts fully muted; gains appear once the stereo image registers are
/// programmed, matching the hardware coming out of reset.
#[derive(Clone, Debug, Default)]
pub struct PanMatrix {
    gains: [[i32; 2]; NUM_CHANNELS],
}

impl PanMatrix {
    /// Create a muted pan matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute all channel gains from the stereo image registers.
    ///
    /// Image codes run 1 (full left) through 7 (full right) with 4 centred;
    /// 0 and anything above 7 are invalid and mute the channel. With
    /// `StereoSense::RightFirst` the image is mirrored.
    pub fn update(&mut self, image: &[u8; NUM_CHANNELS], sense: StereoSense) {
        for (gains, &reg) in self.gains.iter_mut().zip(image.iter()) {
            let code = if sense == StereoSense::RightFirst {
                8u8.wrapping_sub(reg)
            } else {
                reg
            };
            *gains = match code {
                // Centre
                4 => [(0.5 * 65536.0) as i32, (0.5 * 65536.0) as i32],

                // Left 100% / 83% / 67%
                1 => [(1.0 * 65536.0) as i32, 0],
                2 => [(0.83 * 65536.0) as i32, (0.17 * 65536.0) as i32],
                3 => [(0.67 * 65536.0) as i32, (0.33 * 65536.0) as i32],

                // Right 67% / 83% / 100%
                5 => [(0.33 * 65536.0) as i32, (0.67 * 65536.0) as i32],
                6 => [(0.17 * 65536.0) as i32, (0.83 * 65536.0) as i32],
                7 => [0, (1.0 * 65536.0) as i32],

                // Bad setting - just mute it
                _ => [0, 0],
            };
        }
    }

    /// Position a decoded sample on channel `ch`, returning the (L, R) pair.
    #[inline]
    pub fn apply(&self, ch: usize, value: i16) -> (i16, i16) {
        let [left, right] = self.gains[ch];
        (
            ((left * value as i32) >> 16) as i16,
            ((right * value as i32) >> 16) as i16,
        )
    }

    /// Raw gain pair for channel `ch` (left, right).
    #[inline]
    pub fn gains(&self, ch: usize) -> (i32, i32) {
        let [left, right] = self.gains[ch];
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_for(code: u8, sense: StereoSense) -> PanMatrix {
        let mut pan = PanMatrix::new();
        pan.update(&[code; NUM_CHANNELS], sense);
        pan
    }

    #[test]
    fn test_gains_sum_to_unity() {
        for code in 1..=7u8 {
            let pan = matrix_for(code, StereoSense::LeftFirst);
            let (l, r) = pan.gains(0);
            let sum = l + r;
            assert!(
                (65534..=65536).contains(&sum),
                "code {code}: gains {l}+{r} sum to {sum}"
            );
        }
    }

    #[test]
    fn test_invalid_codes_mute() {
        for code in [0u8, 8, 9, 255] {
            let pan = matrix_for(code, StereoSense::LeftFirst);
            assert_eq!(pan.gains(0), (0, 0), "code {code} should mute");
        }
    }

    #[test]
    fn test_centre_is_half_half() {
        let pan = matrix_for(4, StereoSense::LeftFirst);
        assert_eq!(pan.gains(0), (32768, 32768));
    }

    #[test]
    fn test_full_left_and_right() {
        let pan = matrix_for(1, StereoSense::LeftFirst);
        assert_eq!(pan.gains(0), (65536, 0));
        let pan = matrix_for(7, StereoSense::LeftFirst);
        assert_eq!(pan.gains(0), (0, 65536));
    }

    #[test]
    fn test_right_first_mirrors_image() {
        let normal = matrix_for(2, StereoSense::LeftFirst);
        let swapped = matrix_for(6, StereoSense::RightFirst);
        assert_eq!(normal.gains(0), swapped.gains(0));

        // Centre is its own mirror.
        let centre = matrix_for(4, StereoSense::RightFirst);
        assert_eq!(centre.gains(0), (32768, 32768));

        // Mirroring must not resurrect the invalid code 0.
        let muted = matrix_for(8, StereoSense::RightFirst);
        assert_eq!(muted.gains(0), (0, 0));
    }

    #[test]
    fn test_apply_scales_and_signs() {
        let pan = matrix_for(4, StereoSense::LeftFirst);
        assert_eq!(pan.apply(0, 1000), (500, 500));
        assert_eq!(pan.apply(0, -1000), (-500, -500));

        let pan = matrix_for(1, StereoSense::LeftFirst);
        assert_eq!(pan.apply(0, -20_000), (-20_000, 0));
    }

    #[test]
    fn test_new_matrix_is_muted() {
        let pan = PanMatrix::new();
        for ch in 0..NUM_CHANNELS {
            assert_eq!(pan.apply(ch, 32_000), (0, 0));
        }
    }
}

//! Area-accumulation resampling mixer
//!
//! Converts the internal-rate stereo stream to the host rate while folding
//! in the hardware's time-division multiplexing. Every source pair is
//! treated as lasting eight source ticks, so with no rate conversion a
//! destination pair would be the average of the current pair and its seven
//! predecessors; rate conversion widens or narrows the sampling window and
//! weights each source pair by how many of its ticks fall inside. A box
//! filter, in other words, with no interpolation between ticks.
//!
//! Two code paths bound the 32-bit accumulators: above a ratio of eight
//! source pairs per destination pair no source pair ever spans the whole
//! window, so fully-covered pairs are summed at unit weight in a second
//! accumulator pair and folded in at the end; at or below that ratio the
//! walk runs backwards over exactly eight pairs, scaling the
//! always-covered ones by the ratio and splitting the two edge pairs
//! between neighbouring windows.

use crate::ring::SampleRing;

/// Fraction bits of the resampling step.
///
/// Bigger values make the mixing more accurate; 9 is the biggest value
/// that avoids overflowing the 32-bit accumulators.
pub const TIMESHIFT: u32 = 9;

/// Fixed-point resampling state: phase, step and output scale.
#[derive(Clone, Copy, Debug)]
pub struct Resampler {
    /// Offset into the first buffered source pair, Q9
    time: u32,
    /// Source pairs per destination pair, Q9
    step: u32,
    /// Output scale factor, 16.16 fixed point
    scale: u32,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler {
    /// Create a resampler with identity coefficients.
    pub fn new() -> Self {
        Self {
            time: 0,
            step: 1 << TIMESHIFT,
            scale: 1 << 16,
        }
    }

    /// Current step (source pairs per destination pair, Q9).
    #[inline]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Current output scale (Q16).
    #[inline]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Recompute step and scale from the source clock and the host rate,
    /// resetting the phase.
    ///
    /// The source runs at `(clock_hz * 1024) / (24 * (sound_freq + 2))`
    /// in 1/1024 Hz units; the step is that over `host_rate_q10` and the
    /// scale is its reciprocal. Callers flush already-buffered data
    /// first so old samples are not mixed with new coefficients.
    pub fn set_rates(&mut self, clock_hz: u32, sound_freq: u8, host_rate_q10: u32) {
        let a = (clock_hz as u64) * 1024;
        let b = (host_rate_q10 as u64) * 24 * (sound_freq as u64 + 2);
        self.step = ((a << TIMESHIFT) / b) as u32;
        self.scale = ((b << 16) / a) as u32;
        self.time = 0;
    }

    /// Buffered pairs that must be held back so neither code path reads
    /// past the valid samples.
    #[inline]
    pub fn margin(&self) -> usize {
        10 + (self.step >> TIMESHIFT) as usize
    }

    #[cfg(test)]
    pub(crate) fn set_coefficients(&mut self, step: u32, scale: u32) {
        self.step = step;
        self.scale = scale;
        self.time = 0;
    }

    /// Drain `ring` into `out`, stopping when the output is full or the
    /// ring is down to the safety margin. Returns pairs written.
    pub fn mix(&mut self, ring: &mut SampleRing, out: &mut [i16]) -> usize {
        let src = ring.samples();
        let step = self.step as i32;
        let scale = self.scale as i64;
        let mut time = self.time;

        let mut srcavail = ring.pairs() as i32 - (10 + (step >> TIMESHIFT));
        let mut destavail = (out.len() / 2) as i32;
        let mut p = 0usize; // sample index of the first unconsumed pair
        let mut q = 0usize;

        if step > 8 << TIMESHIFT {
            // Big downmix factor: no source pair ever covers the whole
            // window, so the fully-covered middle runs at unit weight in
            // the second accumulator pair.
            while srcavail > 0 && destavail > 0 {
                let mut lacc = 0i32;
                let mut racc = 0i32;
                let mut lacc2 = 0i32;
                let mut racc2 = 0i32;
                let oldp = p;

                // Leading pairs, weighted by how far they reach into the
                // window; `amt` is the contribution factor.
                let mut amt = (1 << TIMESHIFT) - time as i32;
                while amt < 8 << TIMESHIFT {
                    lacc += src[p] as i32 * amt;
                    racc += src[p + 1] as i32 * amt;
                    p += 2;
                    amt += 1 << TIMESHIFT;
                }
                // Middle pairs at fixed full weight; `amt` now tracks time.
                while amt <= step {
                    lacc2 += src[p] as i32;
                    racc2 += src[p + 1] as i32;
                    p += 2;
                    amt += 1 << TIMESHIFT;
                }
                // Trailing pairs, cropped by the far edge of the window.
                amt = (8 << TIMESHIFT) - (amt - step);
                while amt > 0 {
                    lacc += src[p] as i32 * amt;
                    racc += src[p + 1] as i32 * amt;
                    p += 2;
                    amt -= 1 << TIMESHIFT;
                }

                lacc2 += lacc >> (3 + TIMESHIFT);
                racc2 += racc >> (3 + TIMESHIFT);
                out[q] = ((lacc2 as i64 * scale) >> 16) as i16;
                out[q + 1] = ((racc2 as i64 * scale) >> 16) as i16;
                q += 2;
                destavail -= 1;

                time += step as u32;
                let adv = (time >> TIMESHIFT) as usize;
                time &= (1 << TIMESHIFT) - 1;
                p = oldp + adv * 2;
                srcavail -= adv as i32;
            }
        } else {
            // Small downmix factor: the window spans exactly eight pairs.
            while srcavail > 0 && destavail > 0 {
                let mut lacc = 0i32;
                let mut racc = 0i32;

                // Walk backwards over the pairs with both ends inside the
                // window; `amt` tracks time here, the contribution factor
                // is fixed at `step`.
                let mut amt = (8 << TIMESHIFT) - time as i32;
                p += 16;
                while amt > step {
                    p -= 1;
                    racc += src[p] as i32;
                    p -= 1;
                    lacc += src[p] as i32;
                    amt -= 1 << TIMESHIFT;
                }
                lacc *= step;
                racc *= step;
                // The edge pairs: each splits its eight ticks between this
                // window (`amt`) and the one eight pairs later (`step - amt`).
                while amt > 0 {
                    p -= 2;
                    lacc += src[p] as i32 * amt + src[p + 16] as i32 * (step - amt);
                    racc += src[p + 1] as i32 * amt + src[p + 17] as i32 * (step - amt);
                    amt -= 1 << TIMESHIFT;
                }

                let l = (lacc >> (3 + TIMESHIFT)) as i64;
                let r = (racc >> (3 + TIMESHIFT)) as i64;
                out[q] = ((l * scale) >> 16) as i16;
                out[q + 1] = ((r * scale) >> 16) as i16;
                q += 2;
                destavail -= 1;

                time += step as u32;
                let adv = (time >> TIMESHIFT) as usize;
                time &= (1 << TIMESHIFT) - 1;
                p += adv * 2;
                srcavail -= adv as i32;
            }
        }

        self.time = time;
        ring.discard_front(p / 2);
        q / 2
    }
}

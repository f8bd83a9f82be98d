//! Adaptive fetch-rate controller
//!
//! The emulated and host sample clocks drift; rather than measure absolute
//! latency, the controller biases the DMA scheduling interval from how
//! full the host playback buffer is after each delivery. Underflow and
//! overflow step or halve the bias hard, occupancy outside the middle 50%
//! nudges it gently, and inside the comfort zone the bias decays one unit
//! per delivery toward zero.

/// Occupancy snapshot of the host playback buffer, in stereo pairs.
///
/// Measured by the sink before it accepts a delivery.
#[derive(Clone, Copy, Debug)]
pub struct SinkSpace {
    /// Pairs queued and not yet played
    pub used: i32,
    /// Pairs of free space
    pub free: i32,
    /// Total buffer capacity
    pub capacity: i32,
}

/// Feedback controller biasing the DMA scheduling interval.
#[derive(Clone, Copy, Debug, Default)]
pub struct RateControl {
    fudge: i32,
    /// Deliveries that found the host buffer empty
    pub underruns: u32,
    /// Deliveries the host buffer could not fully accept
    pub overruns: u32,
}

impl RateControl {
    /// Create a controller with no bias.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bias, in scheduling cycles per fetch.
    #[inline]
    pub fn fudge(&self) -> i32 {
        self.fudge
    }

    /// Clear bias and counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Classify one delivery and adjust the bias.
    ///
    /// `step` is the adjustment quantum (a quarter of the DMA interval
    /// works well), `attempted` the pairs offered to the sink this
    /// delivery. A bias already fighting the detected condition is halved
    /// instead of pushed further, so a big transient cannot wind the
    /// controller up.
    pub fn adjust(&mut self, step: i32, attempted: i32, space: SinkSpace) {
        if attempted > space.free {
            self.overruns += 1;
            eprintln!("*** sound overflow! {} ***", attempted - space.free);
            if self.fudge < -step {
                self.fudge /= 2;
            } else {
                self.fudge += step;
            }
        } else if space.used == 0 {
            self.underruns += 1;
            eprintln!("*** sound underflow! ***");
            if self.fudge > step {
                self.fudge /= 2;
            } else {
                self.fudge -= step;
            }
        } else if space.used < space.capacity / 4 {
            self.fudge -= step >> 4;
        } else if space.free < space.capacity / 4 {
            self.fudge += step >> 4;
        } else if self.fudge != 0 {
            // Bring the bias back towards zero until we leave the comfort zone.
            self.fudge += if self.fudge > 0 { -1 } else { 1 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: i32 = 4096;

    fn space(used: i32) -> SinkSpace {
        SinkSpace {
            used,
            free: CAP - used,
            capacity: CAP,
        }
    }

    #[test]
    fn test_underflow_steps_then_halves() {
        let mut rc = RateControl::new();
        rc.adjust(100, 64, space(0));
        assert_eq!(rc.fudge(), -100, "empty buffer pushes the bias down");
        assert_eq!(rc.underruns, 1);

        // A bias that was aiding buffering gets halved, not stepped.
        let mut rc = RateControl::new();
        for _ in 0..30 {
            rc.adjust(100, 64, space(CAP - 64)); // high occupancy winds it up
        }
        let wound = rc.fudge();
        assert!(wound > 100);
        rc.adjust(100, 64, space(0));
        assert_eq!(rc.fudge(), wound / 2);
    }

    #[test]
    fn test_overflow_steps_then_halves() {
        let mut rc = RateControl::new();
        rc.adjust(100, CAP + 1, space(CAP));
        assert_eq!(rc.fudge(), 100, "rejected delivery pushes the bias up");
        assert_eq!(rc.overruns, 1);

        let mut rc = RateControl::new();
        for _ in 0..30 {
            rc.adjust(100, 64, space(32)); // low occupancy nudges down
        }
        let wound = rc.fudge();
        assert!(wound < -100);
        rc.adjust(100, CAP + 1, space(CAP));
        assert_eq!(rc.fudge(), wound / 2);
    }

    #[test]
    fn test_quarter_band_nudges() {
        let mut rc = RateControl::new();
        rc.adjust(160, 64, space(CAP / 8));
        assert_eq!(rc.fudge(), -10, "low occupancy nudges by step/16");
        rc.adjust(160, 64, space(CAP - CAP / 8));
        assert_eq!(rc.fudge(), 0);
        rc.adjust(160, 64, space(CAP - CAP / 8));
        assert_eq!(rc.fudge(), 10);
    }

    #[test]
    fn test_comfort_zone_decays_to_zero_and_stays() {
        let mut rc = RateControl::new();
        for _ in 0..5 {
            rc.adjust(160, 64, space(CAP - CAP / 8));
        }
        let start = rc.fudge();
        assert!(start > 0);

        // Held at 50% occupancy the bias walks back to zero...
        for _ in 0..start {
            rc.adjust(160, 64, space(CAP / 2));
        }
        assert_eq!(rc.fudge(), 0);

        // ...and stays there.
        for _ in 0..100 {
            rc.adjust(160, 64, space(CAP / 2));
        }
        assert_eq!(rc.fudge(), 0);
        assert_eq!(rc.underruns, 0);
        assert_eq!(rc.overruns, 0);
    }

    #[test]
    fn test_reset() {
        let mut rc = RateControl::new();
        rc.adjust(100, 64, space(0));
        rc.reset();
        assert_eq!(rc.fudge(), 0);
        assert_eq!(rc.underruns, 0);
    }
}

//! Line-position measurement from the 8-channel reflectance array
//!
//! Each channel reports a high-to-low decay time: short over a reflective
//! surface, long over a dark one. The hardware read caps every channel at
//! 2000 us to bound worst-case step latency; a capped reading is a valid
//! "very dark" measurement, not an error. The weighted sum of the decays is
//! a signed scalar roughly proportional to lateral line offset, and the
//! unweighted sum against a fixed threshold detects the all-dark condition.

/// Per-channel decay cap in microseconds
pub const DECAY_TIMEOUT_US: u32 = 2000;

/// Unweighted decay sum above which all channels are considered saturated
pub const FULL_BLACK_THRESHOLD: u32 = 12_000;

/// Per-channel weights, alternating sign with magnitude increasing toward
/// the edges of the array (channels are wired alternating left/right)
pub const CHANNEL_WEIGHTS: [f32; 8] = [-1.4, 1.4, -2.4, 2.4, -3.75, 3.75, -5.0, 5.0];

/// Raw decay source: one read drives all 8 channels high, releases them, and
/// times each high-to-low decay, capping at [`DECAY_TIMEOUT_US`].
pub trait LineSensorArray: Send {
    fn read_decays(&mut self) -> [u32; 8];
}

/// One line measurement
#[derive(Clone, Copy, Debug)]
pub struct LineReading {
    /// Signed weighted position; zero when centered (or fully dark)
    pub position: f32,
    /// All channels saturated: off any line, on a uniform dark target
    pub full_black: bool,
}

/// Line-position reader built on a raw decay source
pub struct LinePosition {
    array: Box<dyn LineSensorArray>,
}

impl LinePosition {
    pub fn new(array: Box<dyn LineSensorArray>) -> Self {
        Self { array }
    }

    /// Read the array and compute the weighted position and full-black flag.
    pub fn read(&mut self) -> LineReading {
        let decays = self.array.read_decays();

        let mut total: u32 = 0;
        let mut position: f32 = 0.0;
        for (i, &decay) in decays.iter().enumerate() {
            let decay = decay.min(DECAY_TIMEOUT_US);
            total += decay;
            position += decay as f32 * CHANNEL_WEIGHTS[i];
        }

        LineReading {
            position,
            full_black: total > FULL_BLACK_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedArray([u32; 8]);

    impl LineSensorArray for FixedArray {
        fn read_decays(&mut self) -> [u32; 8] {
            self.0
        }
    }

    fn read_frame(decays: [u32; 8]) -> LineReading {
        LinePosition::new(Box::new(FixedArray(decays))).read()
    }

    #[test]
    fn all_channels_at_cap_is_full_black() {
        let reading = read_frame([DECAY_TIMEOUT_US; 8]);
        assert!(reading.full_black);
        // Weights sum to zero, so a uniform reading is centered
        assert!(reading.position.abs() < 1e-3, "position = {}", reading.position);
    }

    #[test]
    fn reflective_surface_is_not_full_black() {
        let reading = read_frame([200; 8]);
        assert!(!reading.full_black);
    }

    #[test]
    fn boundary_sits_just_above_threshold() {
        // 8 * 1500 = 12000 is not above the threshold; one more microsecond is
        assert!(!read_frame([1500; 8]).full_black);
        let mut frame = [1500; 8];
        frame[0] = 1501;
        assert!(read_frame(frame).full_black);
    }

    #[test]
    fn line_under_left_edge_reads_negative() {
        // Channel 6 carries weight -5.0 (leftmost)
        let mut frame = [100; 8];
        frame[6] = 2000;
        let reading = read_frame(frame);
        assert!(reading.position < 0.0);
    }

    #[test]
    fn decays_beyond_cap_are_clamped() {
        let capped = read_frame([DECAY_TIMEOUT_US; 8]);
        let over = read_frame([60_000; 8]);
        assert_eq!(capped.full_black, over.full_black);
        assert!((capped.position - over.position).abs() < 1e-3);
    }

    #[test]
    fn weighted_sum_matches_coefficient_table() {
        let mut frame = [0u32; 8];
        frame[0] = 1000;
        frame[7] = 1000;
        let reading = read_frame(frame);
        // -1.4 * 1000 + 5.0 * 1000
        assert!((reading.position - 3600.0).abs() < 1e-2);
    }
}

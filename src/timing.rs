//! Derived Morse timing table.

use crate::limits::{GAP_MAX, WEIGHT_MAX, WEIGHT_MIN};

/// All durations in microseconds, derived from speed/gap/weighting by a
/// single synchronization step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub unit_us: i32,
    pub dot_len_us: i32,
    pub dash_len_us: i32,
    pub mark_space_us: i32,
    pub eoc_additional_us: i32,
    pub eow_additional_us: i32,
    pub additional_space_us: i32,
    pub adjustment_space_us: i32,
}

impl Timing {
    /// Recompute the full table from speed (WPM), gap, and weighting.
    ///
    /// `gap` widens inter-character/inter-word spacing (Farnsworth-style)
    /// without slowing the dots/dashes themselves.
    pub fn synchronize(speed_wpm: u32, gap: u32, weighting: u32) -> Self {
        let speed = speed_wpm.max(1) as i64;
        let weighting = weighting.clamp(WEIGHT_MIN, WEIGHT_MAX) as i64;
        let gap = gap.min(GAP_MAX) as i64;

        let unit = 1_200_000i64 / speed;
        // Single division from the 1_200_000 constant rather than routing
        // through the already-truncated `unit`, so weighting doesn't
        // compound rounding error on top of the speed truncation.
        let dot_len = (1_200_000i64 * weighting) / (speed * 50);
        let dash_len = (3 * 1_200_000i64 * (100 - weighting)) / (speed * 50);
        let mark_space = unit;
        let eoc_additional = 2 * unit;
        let eow_additional = 5 * unit;

        // Farnsworth-style widening: `gap` additional units stretched into
        // the inter-character and inter-word gaps, proportionally.
        let additional_space = gap * unit;
        let adjustment_space = gap * unit * 5 / 3;

        Timing {
            unit_us: unit as i32,
            dot_len_us: dot_len as i32,
            dash_len_us: dash_len as i32,
            mark_space_us: mark_space as i32,
            eoc_additional_us: eoc_additional as i32,
            eow_additional_us: eow_additional as i32,
            additional_space_us: additional_space as i32,
            adjustment_space_us: adjustment_space as i32,
        }
    }

    /// Total duration of an end-of-character space, including the
    /// mark-space already emitted by the trailing dot/dash.
    pub fn total_eoc_us(&self) -> i32 {
        self.mark_space_us + self.eoc_additional_us + self.additional_space_us
    }

    /// Total duration of an end-of-word space, including mark-space and
    /// end-of-character space already emitted.
    pub fn total_eow_us(&self) -> i32 {
        self.mark_space_us + self.eow_additional_us + self.adjustment_space_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_matches_scenario_s5() {
        let t = Timing::synchronize(20, 0, 50);
        assert_eq!(t.dot_len_us, 60_000);
        assert_eq!(t.dash_len_us, 180_000);
        assert_eq!(t.eoc_additional_us, 120_000);
        assert_eq!(t.eow_additional_us, 300_000);
    }

    #[test]
    fn weighting_rebalances_dot_and_dash() {
        let light = Timing::synchronize(20, 0, 20);
        let heavy = Timing::synchronize(20, 0, 80);
        assert!(light.dot_len_us < heavy.dot_len_us);
        assert!(light.dash_len_us > heavy.dash_len_us);
    }

    #[test]
    fn unit_halves_when_speed_doubles() {
        let slow = Timing::synchronize(10, 0, 50);
        let fast = Timing::synchronize(20, 0, 50);
        assert_eq!(slow.unit_us, fast.unit_us * 2);
    }
}

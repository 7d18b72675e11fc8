// Hit windows in conductor units. The early and late sides are configured
// independently; a press may land up to `early` units before a note or up to
// `late` units after it.

use crate::core::clock::Cu;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WindowPosition {
    /// Note is still further away than the early edge.
    TooEarly,
    Inside,
    /// Note is past the late edge.
    TooLate,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimingWindows {
    pub early: Cu,
    pub late: Cu,
}

impl TimingWindows {
    #[inline(always)]
    pub const fn new(early: Cu, late: Cu) -> Self {
        Self {
            early: if early < 0 { 0 } else { early },
            late: if late < 0 { 0 } else { late },
        }
    }

    /// Converts beat-denominated windows into conductor units.
    pub fn from_beats(early_beats: f32, late_beats: f32, units_per_beat: u32) -> Self {
        Self::new(
            beats_to_cu(early_beats, units_per_beat),
            beats_to_cu(late_beats, units_per_beat),
        )
    }

    /// Classifies `offset = scheduled - at`.
    #[inline(always)]
    pub const fn classify(&self, offset: Cu) -> WindowPosition {
        if offset > self.early {
            WindowPosition::TooEarly
        } else if offset < -self.late {
            WindowPosition::TooLate
        } else {
            WindowPosition::Inside
        }
    }

    /// Last position at which a note scheduled at `scheduled` can still be hit.
    #[inline(always)]
    pub const fn late_edge(&self, scheduled: Cu) -> Cu {
        scheduled.saturating_add(self.late)
    }
}

#[inline(always)]
pub fn beats_to_cu(beats: f32, units_per_beat: u32) -> Cu {
    if !beats.is_finite() || beats <= 0.0 {
        return 0;
    }
    (f64::from(beats) * f64::from(units_per_beat)).round() as Cu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asymmetric_edges_are_inclusive() {
        let w = TimingWindows::new(2, 1);
        assert_eq!(w.classify(3), WindowPosition::TooEarly);
        assert_eq!(w.classify(2), WindowPosition::Inside);
        assert_eq!(w.classify(0), WindowPosition::Inside);
        assert_eq!(w.classify(-1), WindowPosition::Inside);
        assert_eq!(w.classify(-2), WindowPosition::TooLate);
    }

    #[test]
    fn negative_widths_clamp_to_zero() {
        let w = TimingWindows::new(-5, -1);
        assert_eq!(w, TimingWindows::new(0, 0));
        assert_eq!(w.classify(0), WindowPosition::Inside);
        assert_eq!(w.classify(1), WindowPosition::TooEarly);
        assert_eq!(w.classify(-1), WindowPosition::TooLate);
    }

    #[test]
    fn beats_convert_with_rounding() {
        assert_eq!(beats_to_cu(0.25, 480), 120);
        assert_eq!(beats_to_cu(0.126, 1000), 126);
        assert_eq!(beats_to_cu(-1.0, 480), 0);
        assert_eq!(beats_to_cu(f32::NAN, 480), 0);
        let w = TimingWindows::from_beats(0.5, 0.125, 480);
        assert_eq!((w.early, w.late), (240, 60));
    }
}

use crate::core::clock::Cu;
use crate::game::note::LiveNote;

/// Result of one press.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Judgment {
    /// `offset` is scheduled - press time: positive when early.
    Hit { note: LiveNote, offset: Cu },
    MissHit { lane: usize, at: Cu },
}

impl Judgment {
    #[inline(always)]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    pub fn describe_offset(offset: Cu) -> &'static str {
        match offset {
            0 => "exact",
            o if o > 0 => "early",
            _ => "late",
        }
    }
}

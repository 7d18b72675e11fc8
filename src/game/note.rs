use serde::{Deserialize, Serialize};

use crate::core::clock::Cu;

/// One authored note of a chart. `position` is relative to the section start.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    pub pitch: usize,
    pub position: Cu,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteStatus {
    Pending,
    Hit,
    Missed,
}

/// Runtime instance of a chart note while it sits in the track.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LiveNote {
    pub data: NoteData,
    /// Absolute timeline position: section origin + data.position.
    pub scheduled: Cu,
    pub status: NoteStatus,
}

impl LiveNote {
    #[inline(always)]
    pub const fn spawn(data: NoteData, origin: Cu) -> Self {
        Self {
            data,
            scheduled: origin.saturating_add(data.position),
            status: NoteStatus::Pending,
        }
    }

    #[inline(always)]
    pub const fn lane(&self) -> usize {
        self.data.pitch
    }

    #[inline(always)]
    pub fn is_pending(&self) -> bool {
        self.status == NoteStatus::Pending
    }

    /// Signed distance from `at` to the scheduled position. Positive means the
    /// press came early.
    #[inline(always)]
    pub const fn offset_from(&self, at: Cu) -> Cu {
        self.scheduled.saturating_sub(at)
    }
}

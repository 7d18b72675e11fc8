use log::{debug, info};

use crate::game::note::LiveNote;

/// Visual/sound feedback sink. Fire-and-forget.
pub trait Effects {
    fn note_hit(&mut self, note: &LiveNote);
    fn note_missed(&mut self, note: &LiveNote);
    fn miss_hit(&mut self, lane: usize);
    /// Replays the section-failure cue after a failed attempt.
    fn failure_feedback(&mut self);
}

/// Writes every notification to the log.
#[derive(Debug, Default)]
pub struct LogEffects;

impl Effects for LogEffects {
    fn note_hit(&mut self, note: &LiveNote) {
        debug!("FX hit: lane {} @ {}", note.lane(), note.scheduled);
    }

    fn note_missed(&mut self, note: &LiveNote) {
        debug!("FX miss: lane {} @ {}", note.lane(), note.scheduled);
    }

    fn miss_hit(&mut self, lane: usize) {
        debug!("FX miss-hit flash: lane {lane}");
    }

    fn failure_feedback(&mut self) {
        info!("FX failure cue");
    }
}

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;

use crate::core::timeline::{TimelineEvent, TimelineSender};

/// Conductor units: the integer time base shared by charts, windows and the
/// audio transport.
pub type Cu = i64;

/// Transport of the external audio timeline.
pub trait ClockAdapter {
    fn current_position(&self) -> Cu;
    fn pause(&mut self);
    fn resume(&mut self);
    fn seek(&mut self, position: Cu);
    fn is_paused(&self) -> bool;
    /// Named mix parameter on the music event (e.g. `NumFails`).
    fn set_parameter(&mut self, name: &str, value: f32);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineMarker {
    pub label: String,
    pub position: Cu,
}

impl TimelineMarker {
    pub fn new(label: impl Into<String>, position: Cu) -> Self {
        Self {
            label: label.into(),
            position,
        }
    }
}

/// In-process transport that advances only when told to. It plays the role
/// of the audio engine: crossing a beat boundary or a marker pushes an event
/// through the timeline hand-off, the same way a device callback would.
#[derive(Debug)]
pub struct ManualClock {
    position: Cu,
    paused: bool,
    units_per_beat: Cu,
    markers: Vec<TimelineMarker>,
    parameters: FxHashMap<String, f32>,
    events: TimelineSender,
}

impl ManualClock {
    /// Starts paused at position 0. Markers are kept sorted by position.
    pub fn new(
        units_per_beat: u32,
        mut markers: Vec<TimelineMarker>,
        events: TimelineSender,
    ) -> Self {
        markers.sort_by_key(|m| m.position);
        Self {
            position: 0,
            paused: true,
            units_per_beat: Cu::from(units_per_beat.max(1)),
            markers,
            parameters: FxHashMap::default(),
            events,
        }
    }

    /// Moves the play head forward by `units` if playing. Emits every beat
    /// and marker in `[old, new)`.
    pub fn advance(&mut self, units: Cu) {
        if self.paused || units <= 0 {
            return;
        }
        let from = self.position;
        let to = from.saturating_add(units);

        // Merge beats and markers so events leave in timeline order.
        let mut pending: Vec<TimelineEvent> = Vec::new();
        let first_beat = from.div_euclid(self.units_per_beat)
            + Cu::from(from.rem_euclid(self.units_per_beat) != 0);
        let mut beat = first_beat * self.units_per_beat;
        while beat < to {
            pending.push(TimelineEvent::Beat { position: beat });
            let Some(next) = beat.checked_add(self.units_per_beat) else {
                break;
            };
            beat = next;
        }
        for m in self
            .markers
            .iter()
            .filter(|m| m.position >= from && m.position < to)
        {
            pending.push(TimelineEvent::Marker {
                label: m.label.clone(),
                position: m.position,
            });
        }
        // Markers sort ahead of a beat on the same position.
        pending.sort_by_key(|ev| (ev.position(), matches!(ev, TimelineEvent::Beat { .. })));

        for ev in pending {
            if let TimelineEvent::Marker { label, position } = &ev {
                debug!("Timeline marker '{label}' at {position}");
            }
            if let Err(e) = self.events.send(ev) {
                warn!("Clock could not deliver timeline event: {e}");
            }
        }
        self.position = to;
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }
}

impl ClockAdapter for ManualClock {
    fn current_position(&self) -> Cu {
        self.position
    }

    fn pause(&mut self) {
        trace!("Clock paused at {}", self.position);
        self.paused = true;
    }

    fn resume(&mut self) {
        trace!("Clock resumed at {}", self.position);
        self.paused = false;
    }

    fn seek(&mut self, position: Cu) {
        debug!("Clock seek {} -> {position}", self.position);
        self.position = position;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_parameter(&mut self, name: &str, value: f32) {
        self.parameters.insert(name.to_string(), value);
    }
}

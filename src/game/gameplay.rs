use crate::core::clock::Cu;
use crate::core::feedback::Effects;
use crate::game::chart::Chart;
use crate::game::judgment::Judgment;
use crate::game::life::{HEALTH_MISS_HIT, HEALTH_NOTE_MISSED};
use crate::game::note::{LiveNote, NoteStatus};
use crate::game::stage_stats::SectionStats;
use crate::game::timing_windows::{TimingWindows, WindowPosition};
use crate::game::track::Track;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub windows: TimingWindows,
    pub max_health: i32,
    pub num_lanes: usize,
    /// How far ahead of its scheduled position a note enters the track.
    pub spawn_lead: Cu,
}

/// A section that just stopped, handed back for reporting.
#[derive(Clone, Debug)]
pub struct EndedSection {
    pub chart_index: usize,
    pub chart: Arc<Chart>,
    pub stats: SectionStats,
}

pub struct State {
    pub windows: TimingWindows,
    pub max_health: i32,
    pub num_lanes: usize,
    pub spawn_lead: Cu,
    pub chart: Option<Arc<Chart>>,
    pub chart_index: usize,
    /// Timeline position the chart's relative note positions are anchored to.
    pub origin: Cu,
    pub note_spawn_cursor: usize,
    pub track: Track,
    pub stats: SectionStats,
}

pub fn init(settings: EngineSettings) -> State {
    let num_lanes = settings.num_lanes.max(1);
    State {
        windows: settings.windows,
        max_health: settings.max_health.max(1),
        num_lanes,
        spawn_lead: settings.spawn_lead.max(0),
        chart: None,
        chart_index: 0,
        origin: 0,
        note_spawn_cursor: 0,
        track: Track::new(num_lanes),
        stats: SectionStats::fresh(settings.max_health),
    }
}

#[inline(always)]
pub fn is_active(state: &State) -> bool {
    state.chart.is_some()
}

/// Begins a section: fresh stats, empty track, spawning from the first note.
pub fn start_section(state: &mut State, chart_index: usize, chart: Arc<Chart>, origin: Cu) {
    info!(
        "Starting section with chart #{chart_index} '{}' ({} notes) at {origin}",
        chart.name,
        chart.len()
    );
    state.stats = SectionStats::fresh(state.max_health);
    state.track.clear();
    state.note_spawn_cursor = 0;
    state.origin = origin;
    state.chart_index = chart_index;
    state.chart = Some(chart);
}

/// Stops the running section and discards every live note.
pub fn end_section(state: &mut State) -> Option<EndedSection> {
    let chart = state.chart.take()?;
    let dropped = state.track.len();
    state.track.clear();
    state.note_spawn_cursor = 0;
    debug!(
        "Section '{}' ended: {} judged, {} live notes discarded",
        chart.name,
        state.stats.judged(),
        dropped
    );
    Some(EndedSection {
        chart_index: state.chart_index,
        chart,
        stats: state.stats.clone(),
    })
}

/// True once the chart has spawned every note and all of them are resolved.
pub fn is_section_complete(state: &State) -> bool {
    state
        .chart
        .as_ref()
        .is_some_and(|c| state.note_spawn_cursor >= c.len() && state.track.is_empty())
}

/// Moves chart notes due within the spawn lead into the track.
pub fn spawn_lookahead_notes(state: &mut State, now: Cu) -> usize {
    let Some(chart) = state.chart.as_ref() else {
        return 0;
    };
    let horizon = now.saturating_add(state.spawn_lead);
    let notes = chart.notes();
    let mut cursor = state.note_spawn_cursor;
    let mut spawned = 0;
    while cursor < notes.len() {
        let live = LiveNote::spawn(notes[cursor], state.origin);
        if live.scheduled > horizon {
            break;
        }
        if live.lane() < state.num_lanes && state.track.insert(live) {
            spawned += 1;
        } else {
            warn!(
                "Chart '{}' note {cursor} uses lane {} outside 0..{}; skipped.",
                chart.name,
                live.lane(),
                state.num_lanes
            );
        }
        cursor += 1;
    }
    state.note_spawn_cursor = cursor;
    spawned
}

/// Index of the earliest pending note in `notes` that a press at `at` can
/// hit. `notes` must be ordered by scheduled position.
#[inline(always)]
pub fn find_hittable(notes: &[LiveNote], at: Cu, windows: &TimingWindows) -> Option<usize> {
    for (idx, note) in notes.iter().enumerate() {
        if !note.is_pending() {
            continue;
        }
        match windows.classify(note.offset_from(at)) {
            // Everything after this note is later still.
            WindowPosition::TooEarly => break,
            WindowPosition::Inside => return Some(idx),
            WindowPosition::TooLate => {}
        }
    }
    None
}

/// Judges one press on `lane` at timeline position `at`.
pub fn judge_a_press(state: &mut State, lane: usize, at: Cu, fx: &mut dyn Effects) -> Judgment {
    let found = find_hittable(state.track.lane(lane), at, &state.windows);
    if let Some(mut note) = found.and_then(|idx| state.track.remove(lane, idx)) {
        note.status = NoteStatus::Hit;
        let offset = note.offset_from(at);
        state.stats.hit_count += 1;
        debug!(
            "HIT: lane={lane}, scheduled={}, at={at}, offset={offset} ({})",
            note.scheduled,
            Judgment::describe_offset(offset)
        );
        fx.note_hit(&note);
        return Judgment::Hit { note, offset };
    }

    state.stats.miss_hit_count += 1;
    state.stats.lose_health(HEALTH_MISS_HIT);
    debug!(
        "MISS-HIT: lane={lane}, at={at}, health={}/{}",
        state.stats.health, state.stats.max_health
    );
    fx.miss_hit(lane);
    Judgment::MissHit { lane, at }
}

/// Resolves a pending note whose late window elapsed without a hit.
pub fn handle_note_passed(
    state: &mut State,
    lane: usize,
    index: usize,
    fx: &mut dyn Effects,
) -> Option<LiveNote> {
    if !state.track.lane(lane).get(index)?.is_pending() {
        return None;
    }
    let mut note = state.track.remove(lane, index)?;
    note.status = NoteStatus::Missed;
    state.stats.missed_count += 1;
    state.stats.lose_health(HEALTH_NOTE_MISSED);
    debug!(
        "MISSED: lane={lane}, scheduled={}, health={}/{}",
        note.scheduled, state.stats.health, state.stats.max_health
    );
    fx.note_missed(&note);
    Some(note)
}

/// Misses every pending note whose late edge is behind `now`.
pub fn apply_time_based_misses(state: &mut State, now: Cu, fx: &mut dyn Effects) -> u32 {
    let mut missed = 0;
    for lane in 0..state.track.num_lanes() {
        while let Some(front) = state.track.front(lane) {
            if state.windows.late_edge(front.scheduled) >= now {
                break;
            }
            if handle_note_passed(state, lane, 0, fx).is_none() {
                break;
            }
            missed += 1;
        }
    }
    missed
}

#[inline(always)]
pub fn check_failure(state: &State) -> bool {
    state.stats.is_exhausted()
}

/// Reports a failure at most once per section.
pub fn take_failure(state: &mut State) -> bool {
    if state.stats.failed || !check_failure(state) {
        return false;
    }
    state.stats.failed = true;
    info!(
        "Section failed: {} hit, {} missed, {} miss-hits",
        state.stats.hit_count, state.stats.missed_count, state.stats.miss_hit_count
    );
    true
}

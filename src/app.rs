use crate::config::{self, Config};
use crate::core::clock::{ClockAdapter, Cu, ManualClock, TimelineMarker};
use crate::core::dialogue::TimedDialogue;
use crate::core::feedback::LogEffects;
use crate::core::host::LogHost;
use crate::core::timeline::timeline_channel;
use crate::game::chart::{Chart, ChartStore};
use crate::game::note::NoteData;
use crate::game::progression::GameState;
use crate::game::session::Session;
use crate::game::stage_stats::RunSummary;
use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use std::error::Error;

/* -------------------- frame pacing -------------------- */
const FRAMES_PER_SECOND: f64 = 60.0;
const FRAME_DELTA: f32 = 1.0 / 60.0;
// Ten minutes of frames; a run that has not ended by then is stuck.
const MAX_FRAMES: u64 = 60 * 60 * 10;
const DIALOGUE_FRAMES: u32 = 90;

/* -------------------- timeline layout (beats) -------------------- */
const INTRO_BEATS: Cu = 4;
const RESPONSE_BEATS: Cu = 2;
const SECTION_TAIL_BEATS: Cu = 4;
const CHART_LEAD_IN_BEATS: Cu = 2;

pub type HeadlessSession = Session<ManualClock, TimedDialogue, LogEffects, LogHost>;

/// Builds the four section charts: a slow tutorial and three levels that
/// grow denser and longer.
pub fn generate_charts(lanes: usize, units_per_beat: u32) -> Vec<Chart> {
    let upb = Cu::from(units_per_beat.max(1));
    let lanes = lanes.max(1);
    (0..4)
        .map(|index: usize| {
            let (count, step) = if index == 0 {
                (8, upb)
            } else {
                (12 + 4 * index, (upb / 2).max(1))
            };
            let notes = (0..count)
                .map(|i| NoteData {
                    pitch: (i * (index + 1) + i / lanes) % lanes,
                    position: CHART_LEAD_IN_BEATS * upb + i as Cu * step,
                })
                .collect();
            let name = if index == 0 {
                "Tutorial".to_string()
            } else {
                format!("Level {index}")
            };
            Chart::new(name, notes)
        })
        .collect()
}

/// Lays the markers out around the charts so each section has room for its
/// last note's late window before the next marker.
pub fn build_timeline(charts: &[Chart], units_per_beat: u32) -> Vec<TimelineMarker> {
    let upb = Cu::from(units_per_beat.max(1));
    let section_len = |index: usize| {
        let last = charts.get(index).map_or(0, Chart::last_position);
        last + SECTION_TAIL_BEATS * upb
    };
    let layout: [(&str, Cu); 10] = [
        ("Intro", INTRO_BEATS * upb),
        ("Tutorial", section_len(0)),
        ("Loop1", RESPONSE_BEATS * upb),
        ("Level1", section_len(1)),
        ("Post1", RESPONSE_BEATS * upb),
        ("Level2", section_len(2)),
        ("Post2", RESPONSE_BEATS * upb),
        ("Level3", section_len(3)),
        ("Post3", RESPONSE_BEATS * upb),
        ("Ending", INTRO_BEATS * upb),
    ];
    let mut position = 0;
    layout
        .iter()
        .map(|&(label, len)| {
            let marker = TimelineMarker::new(label, position);
            position += len;
            marker
        })
        .collect()
}

/* -------------------- autoplay -------------------- */

/// Presses every live note once the play head reaches it, skipping every
/// `miss_every`-th note.
#[derive(Debug, Default)]
pub struct Autoplay {
    miss_every: u32,
    seen: u32,
    decided: FxHashSet<(usize, Cu)>,
    section: Option<(GameState, u32)>,
}

impl Autoplay {
    pub fn new(miss_every: u32) -> Self {
        Self {
            miss_every,
            ..Default::default()
        }
    }

    pub fn press_due(&mut self, session: &mut HeadlessSession) {
        let key = (session.progression.state(), session.attempt());
        if self.section != Some(key) {
            self.decided.clear();
            self.section = Some(key);
        }
        let now = session.clock.current_position();
        let due: Vec<_> = session
            .engine
            .track
            .iter_by_time()
            .filter(|n| n.is_pending() && n.scheduled <= now)
            .filter(|n| !self.decided.contains(&(n.lane(), n.scheduled)))
            .copied()
            .collect();

        for note in due {
            self.decided.insert((note.lane(), note.scheduled));
            self.seen += 1;
            if self.miss_every > 0 && self.seen % self.miss_every == 0 {
                debug!("Autoplay skipping lane {} @ {}", note.lane(), note.scheduled);
                continue;
            }
            if let Err(e) = session.queue_input(note.lane(), note.scheduled) {
                warn!("Autoplay press rejected: {e}");
            }
        }
    }
}

/* -------------------- run loop -------------------- */

pub fn build_session(cfg: &Config) -> HeadlessSession {
    let charts = generate_charts(cfg.lanes, cfg.units_per_beat);
    let markers = build_timeline(&charts, cfg.units_per_beat);
    let (tx, rx) = timeline_channel(cfg.marker_queue_capacity);
    let clock = ManualClock::new(cfg.units_per_beat, markers, tx);
    Session::new(
        cfg,
        ChartStore::new(charts),
        clock,
        rx,
        TimedDialogue::new(DIALOGUE_FRAMES),
        LogEffects,
        LogHost::default(),
    )
}

/// Plays the whole timeline headlessly and returns what happened.
pub fn play_through(cfg: &Config) -> RunSummary {
    let mut session = build_session(cfg);
    let mut autoplay = Autoplay::new(cfg.autoplay_miss_every);
    let units_per_frame = cfg.units_per_second() / FRAMES_PER_SECOND;
    let mut carry = 0.0_f64;

    session.start_run();
    let mut frame_count = 0;
    while frame_count < MAX_FRAMES {
        frame_count += 1;
        if !session.clock.is_paused() {
            carry += units_per_frame;
            let step = carry.floor();
            carry -= step;
            session.clock.advance(step as Cu);
        }
        autoplay.press_due(&mut session);
        session.frame(FRAME_DELTA);

        if session.progression.is_reload_requested() {
            info!("Run ended in a reload after {frame_count} frames.");
            break;
        }
        if session.progression.state() == GameState::Ending {
            info!("Ending reached after {frame_count} frames.");
            break;
        }
    }
    if frame_count >= MAX_FRAMES {
        warn!("Run did not finish within {MAX_FRAMES} frames.");
    }
    session.summary()
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cfg = config::get();
    info!(
        "Headless run: {} lanes, {} BPM, {} units/beat",
        cfg.lanes, cfg.bpm, cfg.units_per_beat
    );
    let summary = play_through(&cfg);
    info!(
        "Run summary: {} hits, {} misses, {} failures",
        summary.total_hits(),
        summary.total_misses(),
        summary.total_failures
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

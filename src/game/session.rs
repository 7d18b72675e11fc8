//! Per-frame driver that wires the judgment engine and the progression
//! machine to the clock, dialogue, feedback and host collaborators.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::config::Config;
use crate::core::clock::{ClockAdapter, Cu};
use crate::core::dialogue::Dialogue;
use crate::core::feedback::Effects;
use crate::core::host::Host;
use crate::core::timeline::TimelineReceiver;
use crate::error::CoreError;
use crate::game::chart::ChartStore;
use crate::game::gameplay::{self, State};
use crate::game::progression::{Command, Commands, GameState, Progression};
use crate::game::stage_stats::{RunSummary, SectionOutcome, SectionReport};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub lane: usize,
    pub at: Cu,
}

pub struct Session<C: ClockAdapter, D: Dialogue, E: Effects, H: Host> {
    pub engine: State,
    pub progression: Progression,
    pub charts: ChartStore,
    pub clock: C,
    pub dialogue: D,
    pub effects: E,
    pub host: H,
    timeline: TimelineReceiver,
    pending_inputs: VecDeque<InputEvent>,
    beat_count: u64,
    last_beat: Option<Cu>,
    section_state: GameState,
    attempt: u32,
    total_failures: u32,
    history: Vec<SectionReport>,
}

impl<C: ClockAdapter, D: Dialogue, E: Effects, H: Host> Session<C, D, E, H> {
    pub fn new(
        cfg: &Config,
        charts: ChartStore,
        clock: C,
        timeline: TimelineReceiver,
        dialogue: D,
        effects: E,
        host: H,
    ) -> Self {
        Self {
            engine: gameplay::init(cfg.engine_settings()),
            progression: Progression::new(cfg.game_over_delay_seconds),
            charts,
            clock,
            dialogue,
            effects,
            host,
            timeline,
            pending_inputs: VecDeque::new(),
            beat_count: 0,
            last_beat: None,
            section_state: GameState::None,
            attempt: 0,
            total_failures: 0,
            history: Vec::new(),
        }
    }

    pub fn start_run(&mut self) {
        self.pending_inputs.clear();
        let dropped = self.timeline.discard();
        if dropped > 0 {
            debug!("Discarded {dropped} stale timeline events before the run.");
        }
        self.history.clear();
        self.total_failures = 0;
        self.beat_count = 0;
        self.last_beat = None;
        let cmds = self.progression.start_run();
        self.execute(cmds);
    }

    /// Queues a press for judgment on the next frame.
    pub fn queue_input(&mut self, lane: usize, at: Cu) -> Result<(), CoreError> {
        let lanes = self.engine.num_lanes;
        if lane >= lanes {
            return Err(CoreError::InvalidLane { lane, lanes });
        }
        self.pending_inputs.push_back(InputEvent { lane, at });
        Ok(())
    }

    #[inline(always)]
    pub fn pending_inputs(&self) -> usize {
        self.pending_inputs.len()
    }

    #[inline(always)]
    pub const fn beat_count(&self) -> u64 {
        self.beat_count
    }

    #[inline(always)]
    pub const fn last_beat(&self) -> Option<Cu> {
        self.last_beat
    }

    /// 1-based attempt number of the section in play, 0 before any section.
    #[inline(always)]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reports(&self) -> &[SectionReport] {
        &self.history
    }

    pub fn frame(&mut self, delta_seconds: f32) {
        if let Some(tally) = self.timeline.take_beats() {
            self.beat_count += tally.count;
            self.last_beat = Some(tally.last);
        }
        for marker in self.timeline.drain() {
            let cmds = self.progression.marker_reached(&marker.label, marker.position);
            self.execute(cmds);
        }

        if let Some(node) = self.dialogue.poll_finished() {
            let cmds = self.progression.dialogue_finished(&node);
            self.execute(cmds);
        }

        let cmds = self.progression.update(delta_seconds);
        self.execute(cmds);

        if self.progression.is_reload_requested() {
            self.pending_inputs.clear();
            return;
        }
        if self.clock.is_paused() {
            if !self.pending_inputs.is_empty() {
                debug!("Clock paused; dropping {} queued presses.", self.pending_inputs.len());
                self.pending_inputs.clear();
            }
            return;
        }

        if self.retry_if_failed() {
            return;
        }

        let now = self.clock.current_position();
        if !gameplay::is_active(&self.engine) {
            if !self.pending_inputs.is_empty() {
                debug!("No active section; ignoring {} presses.", self.pending_inputs.len());
                self.pending_inputs.clear();
            }
            return;
        }
        gameplay::spawn_lookahead_notes(&mut self.engine, now);
        while let Some(input) = self.pending_inputs.pop_front() {
            gameplay::judge_a_press(&mut self.engine, input.lane, input.at, &mut self.effects);
        }
        gameplay::apply_time_based_misses(&mut self.engine, now, &mut self.effects);

        self.retry_if_failed();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            final_state: Some(self.progression.state()),
            total_failures: self.total_failures,
            reload_requested: self.progression.is_reload_requested(),
            beats_played: self.beat_count,
            sections: self.history.clone(),
        }
    }

    fn retry_if_failed(&mut self) -> bool {
        if !gameplay::take_failure(&mut self.engine) {
            return false;
        }
        self.total_failures += 1;
        let cmds = self.progression.section_failed();
        self.execute(cmds);
        true
    }

    fn execute(&mut self, cmds: Commands) {
        for cmd in cmds {
            debug!("Executing {cmd:?}");
            match cmd {
                Command::StartDialogue(node) => self.dialogue.start_node(node),
                Command::StartSection { chart, origin } => self.start_section(chart, origin),
                Command::EndSection => self.finish_section(),
                Command::PauseClock => self.clock.pause(),
                Command::ResumeClock => self.clock.resume(),
                Command::SeekClock(position) => self.clock.seek(position),
                Command::SetClockParameter(name, value) => self.clock.set_parameter(name, value),
                Command::DiscardInFlight => {
                    self.finish_section();
                    self.pending_inputs.clear();
                    let dropped = self.timeline.discard();
                    if dropped > 0 {
                        debug!("Discarded {dropped} queued timeline events.");
                    }
                }
                Command::FailureFeedback => self.effects.failure_feedback(),
                Command::ShowGameOver => self.host.show_game_over(),
                Command::RevealEnding => self.host.reveal_ending(),
                Command::RequestFullReload => {
                    self.finish_section();
                    self.pending_inputs.clear();
                    self.clock.pause();
                    self.host.request_full_reload();
                }
            }
        }
    }

    fn start_section(&mut self, chart_index: usize, origin: Cu) {
        let chart = match self.charts.get(chart_index) {
            Ok(chart) => chart,
            Err(e) => {
                warn!("Cannot start section: {e}");
                return;
            }
        };
        if gameplay::is_active(&self.engine) {
            self.finish_section();
        }
        self.section_state = self.progression.state();
        self.attempt = self.progression.fail_count() + 1;
        gameplay::start_section(&mut self.engine, chart_index, chart, origin);
    }

    fn finish_section(&mut self) {
        let complete = gameplay::is_section_complete(&self.engine);
        let Some(ended) = gameplay::end_section(&mut self.engine) else {
            return;
        };
        let outcome = if ended.stats.failed {
            SectionOutcome::Failed
        } else if complete {
            SectionOutcome::Cleared
        } else {
            SectionOutcome::Abandoned
        };
        info!(
            "{:?} attempt {} on '{}': {outcome:?} ({} hit, {} missed, {} miss-hits)",
            self.section_state,
            self.attempt,
            ended.chart.name,
            ended.stats.hit_count,
            ended.stats.missed_count,
            ended.stats.miss_hit_count
        );
        self.history.push(SectionReport {
            state: self.section_state,
            chart_index: ended.chart_index,
            chart_name: ended.chart.name.clone(),
            attempt: self.attempt,
            outcome,
            stats: ended.stats,
        });
    }
}

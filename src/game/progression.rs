//! Section progression driven by timeline markers.
//!
//! The machine is pure: every entry point returns the commands the session
//! must run against the clock, dialogue, chart engine and host, in order.

use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::clock::Cu;

pub const FAIL_COUNT_PARAMETER: &str = "NumFails";
pub const STRIKE_NODES: [&str; 3] = ["Strike1", "Strike2", "Strike3"];
pub const GAME_OVER_STRIKES: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameState {
    None,
    Intro,
    Tutorial,
    FirstChorus,
    Level1,
    Response1,
    Level2,
    Response2,
    Level3,
    Response3,
    Ending,
}

impl GameState {
    pub const ALL: [GameState; 11] = [
        Self::None,
        Self::Intro,
        Self::Tutorial,
        Self::FirstChorus,
        Self::Level1,
        Self::Response1,
        Self::Level2,
        Self::Response2,
        Self::Level3,
        Self::Response3,
        Self::Ending,
    ];

    #[inline(always)]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Successor in the fixed order; `None` past the ending.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Whether entering this state stops the music until its dialogue ends.
    pub fn pauses_clock(self) -> bool {
        entry_actions(self).contains(&EntryAction::PauseClock)
    }

    /// Dialogue node started on entry, if any.
    pub fn entry_dialogue(self) -> Option<&'static str> {
        entry_actions(self).iter().find_map(|a| match a {
            EntryAction::StartDialogue(node) => Some(*node),
            _ => None,
        })
    }

    /// Chart played on entry, if any.
    pub fn entry_chart(self) -> Option<usize> {
        entry_actions(self).iter().find_map(|a| match a {
            EntryAction::StartSection(chart) => Some(*chart),
            _ => None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryAction {
    /// Stop the previous chart before a state that plays none.
    EndSection,
    StartDialogue(&'static str),
    StartSection(usize),
    PauseClock,
    RevealEnding,
}

/// What entering each state does.
pub const fn entry_actions(state: GameState) -> &'static [EntryAction] {
    use EntryAction::*;
    match state {
        GameState::None => &[],
        GameState::Intro => &[EndSection, StartDialogue("Intro")],
        GameState::Tutorial => &[StartDialogue("Tutorial"), StartSection(0)],
        GameState::FirstChorus => &[EndSection, StartDialogue("Loop1"), PauseClock],
        GameState::Level1 => &[StartSection(1)],
        GameState::Response1 => &[EndSection, StartDialogue("Post1"), PauseClock],
        GameState::Level2 => &[StartSection(2)],
        GameState::Response2 => &[EndSection, StartDialogue("Post2"), PauseClock],
        GameState::Level3 => &[StartSection(3)],
        GameState::Response3 => &[EndSection, StartDialogue("Post3"), PauseClock],
        GameState::Ending => &[EndSection, RevealEnding],
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    StartDialogue(&'static str),
    StartSection { chart: usize, origin: Cu },
    EndSection,
    PauseClock,
    ResumeClock,
    SeekClock(Cu),
    SetClockParameter(&'static str, f32),
    /// Drop live notes, queued presses and queued marker events.
    DiscardInFlight,
    FailureFeedback,
    ShowGameOver,
    RevealEnding,
    RequestFullReload,
}

pub type Commands = SmallVec<[Command; 8]>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub label: String,
    pub position: Cu,
}

#[derive(Debug)]
pub struct Progression {
    state: GameState,
    labels_passed: FxHashSet<String>,
    fail_count: u32,
    last_marker: Option<Marker>,
    game_over_delay: f32,
    game_over_remaining: Option<f32>,
    reload_requested: bool,
}

impl Progression {
    pub fn new(game_over_delay_seconds: f32) -> Self {
        let game_over_delay = if game_over_delay_seconds.is_finite() {
            game_over_delay_seconds.max(0.0)
        } else {
            0.0
        };
        Self {
            state: GameState::None,
            labels_passed: FxHashSet::default(),
            fail_count: 0,
            last_marker: None,
            game_over_delay,
            game_over_remaining: None,
            reload_requested: false,
        }
    }

    #[inline(always)]
    pub const fn state(&self) -> GameState {
        self.state
    }

    #[inline(always)]
    pub const fn fail_count(&self) -> u32 {
        self.fail_count
    }

    #[inline(always)]
    pub fn labels_passed(&self) -> &FxHashSet<String> {
        &self.labels_passed
    }

    #[inline(always)]
    pub fn last_marker(&self) -> Option<&Marker> {
        self.last_marker.as_ref()
    }

    #[inline(always)]
    pub const fn is_game_over(&self) -> bool {
        self.game_over_remaining.is_some() || self.reload_requested
    }

    /// Terminal: a reload was requested and nothing else will be acted on.
    #[inline(always)]
    pub const fn is_reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Where a retry rewinds to.
    #[inline(always)]
    pub fn rewind_position(&self) -> Cu {
        self.last_marker.as_ref().map_or(0, |m| m.position)
    }

    /// Starts a play-through from the very beginning of the timeline.
    pub fn start_run(&mut self) -> Commands {
        info!("Starting run.");
        self.state = GameState::None;
        self.labels_passed.clear();
        self.fail_count = 0;
        self.last_marker = None;
        self.game_over_remaining = None;
        self.reload_requested = false;

        let mut out = Commands::new();
        out.push(Command::EndSection);
        out.push(Command::SeekClock(0));
        out.push(Command::SetClockParameter(FAIL_COUNT_PARAMETER, 0.0));
        out.push(Command::ResumeClock);
        out
    }

    /// Handles a timeline marker. Each label advances the state at most once
    /// per run, however many times the audio passes over it.
    pub fn marker_reached(&mut self, label: &str, position: Cu) -> Commands {
        let mut out = Commands::new();
        if self.reload_requested {
            return out;
        }
        // A passed label is stale: it neither advances nor moves the rewind point.
        if self.labels_passed.contains(label) {
            debug!("Marker '{label}' at {position} already passed; ignoring.");
            return out;
        }
        self.last_marker = Some(Marker {
            label: label.to_string(),
            position,
        });
        self.labels_passed.insert(label.to_string());
        self.fail_count = 0;
        out.push(Command::SetClockParameter(FAIL_COUNT_PARAMETER, 0.0));

        let Some(next) = self.state.next() else {
            warn!(
                "Marker '{label}' at {position} arrived after {:?}; no further state.",
                self.state
            );
            return out;
        };
        info!("Marker '{label}' at {position}: {:?} -> {next:?}", self.state);
        self.state = next;
        self.enter(position, &mut out);
        out
    }

    /// Retry protocol, run when the judgment engine reports a failed section.
    /// The current state is replayed from the last marker; the third strike
    /// also starts the game-over countdown.
    pub fn section_failed(&mut self) -> Commands {
        let mut out = Commands::new();
        if self.reload_requested {
            return out;
        }
        self.fail_count += 1;
        info!("Section {:?} failed (strike {}).", self.state, self.fail_count);

        if let Some(node) = STRIKE_NODES.get(self.fail_count as usize - 1) {
            out.push(Command::StartDialogue(node));
        }
        if self.fail_count >= GAME_OVER_STRIKES && self.game_over_remaining.is_none() {
            info!("Strike limit reached; game over in {:.1}s.", self.game_over_delay);
            out.push(Command::ShowGameOver);
            self.game_over_remaining = Some(self.game_over_delay);
        }

        let origin = self.rewind_position();
        out.push(Command::DiscardInFlight);
        out.push(Command::FailureFeedback);
        out.push(Command::SetClockParameter(FAIL_COUNT_PARAMETER, self.fail_count as f32));
        out.push(Command::SeekClock(origin));
        debug!("Replaying {:?} from {origin}", self.state);
        self.enter(origin, &mut out);
        out
    }

    /// Chains to the next part of the music once a pausing state's dialogue
    /// is over.
    pub fn dialogue_finished(&mut self, node: &str) -> Commands {
        let mut out = Commands::new();
        if self.reload_requested {
            return out;
        }
        if self.state.pauses_clock() && self.state.entry_dialogue() == Some(node) {
            debug!("Dialogue '{node}' finished; resuming music.");
            out.push(Command::ResumeClock);
        }
        out
    }

    /// Advances the game-over countdown by one frame.
    pub fn update(&mut self, delta_seconds: f32) -> Commands {
        let mut out = Commands::new();
        let Some(remaining) = self.game_over_remaining.as_mut() else {
            return out;
        };
        *remaining -= delta_seconds.max(0.0);
        if *remaining <= 0.0 {
            self.game_over_remaining = None;
            self.reload_requested = true;
            info!("Game over countdown elapsed; requesting reload.");
            out.push(Command::RequestFullReload);
        }
        out
    }

    fn enter(&self, origin: Cu, out: &mut Commands) {
        for action in entry_actions(self.state) {
            out.push(match *action {
                EntryAction::EndSection => Command::EndSection,
                EntryAction::StartDialogue(node) => Command::StartDialogue(node),
                EntryAction::StartSection(chart) => Command::StartSection { chart, origin },
                EntryAction::PauseClock => Command::PauseClock,
                EntryAction::RevealEnding => Command::RevealEnding,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [&str; 10] = [
        "Intro", "Tutorial", "Loop1", "Level1", "Post1", "Level2", "Post2", "Level3", "Post3",
        "Ending",
    ];

    fn advance_to(p: &mut Progression, target: GameState) {
        for (i, label) in ORDER.iter().enumerate() {
            if p.state() == target {
                return;
            }
            p.marker_reached(label, (i as Cu + 1) * 1000);
        }
    }

    #[test]
    fn order_is_total_and_stepwise() {
        for pair in GameState::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(GameState::Ending.next(), None);
    }

    #[test]
    fn action_table_matches_states() {
        assert_eq!(GameState::Intro.entry_dialogue(), Some("Intro"));
        assert_eq!(GameState::Tutorial.entry_chart(), Some(0));
        assert_eq!(GameState::Tutorial.entry_dialogue(), Some("Tutorial"));
        assert_eq!(GameState::Level3.entry_chart(), Some(3));
        let pausing: Vec<_> = GameState::ALL
            .iter()
            .copied()
            .filter(|s| s.pauses_clock())
            .collect();
        assert_eq!(
            pausing,
            vec![
                GameState::FirstChorus,
                GameState::Response1,
                GameState::Response2,
                GameState::Response3
            ]
        );
        assert!(entry_actions(GameState::Ending).contains(&EntryAction::RevealEnding));
    }

    #[test]
    fn each_new_label_advances_one_step() {
        let mut p = Progression::new(3.0);
        p.start_run();
        for (i, label) in ORDER.iter().enumerate() {
            p.marker_reached(label, i as Cu * 10);
            assert_eq!(p.state(), GameState::ALL[i + 1]);
        }
        // Nothing past the ending.
        p.marker_reached("Encore", 999);
        assert_eq!(p.state(), GameState::Ending);
    }

    #[test]
    fn duplicate_label_is_ignored() {
        let mut p = Progression::new(3.0);
        p.marker_reached("Intro", 0);
        p.marker_reached("Tutorial", 100);
        p.marker_reached("Loop1", 200);
        assert_eq!(p.state(), GameState::FirstChorus);

        let cmds = p.marker_reached("Loop1", 200);
        assert!(cmds.is_empty());
        assert_eq!(p.state(), GameState::FirstChorus);

        // A late copy of an older marker leaves the rewind point alone.
        assert!(p.marker_reached("Intro", 0).is_empty());
        assert_eq!(p.rewind_position(), 200);
        assert_eq!(p.last_marker().map(|m| m.label.as_str()), Some("Loop1"));
    }

    #[test]
    fn tutorial_entry_commands() {
        let mut p = Progression::new(3.0);
        p.marker_reached("Intro", 0);
        let cmds = p.marker_reached("Tutorial", 480);
        assert_eq!(
            cmds.as_slice(),
            &[
                Command::SetClockParameter(FAIL_COUNT_PARAMETER, 0.0),
                Command::StartDialogue("Tutorial"),
                Command::StartSection {
                    chart: 0,
                    origin: 480
                },
            ]
        );
    }

    #[test]
    fn first_failure_strikes_and_replays_same_state() {
        let mut p = Progression::new(3.0);
        advance_to(&mut p, GameState::Level1);
        let rewind = p.rewind_position();
        assert_eq!(rewind, 4000);

        let cmds = p.section_failed();
        assert_eq!(p.fail_count(), 1);
        assert_eq!(p.state(), GameState::Level1);
        assert_eq!(
            cmds.as_slice(),
            &[
                Command::StartDialogue("Strike1"),
                Command::DiscardInFlight,
                Command::FailureFeedback,
                Command::SetClockParameter(FAIL_COUNT_PARAMETER, 1.0),
                Command::SeekClock(4000),
                Command::StartSection {
                    chart: 1,
                    origin: 4000
                },
            ]
        );
        assert!(!p.is_game_over());
    }

    #[test]
    fn fail_count_resets_on_progress_only() {
        let mut p = Progression::new(3.0);
        advance_to(&mut p, GameState::Tutorial);
        p.section_failed();
        p.section_failed();
        assert_eq!(p.fail_count(), 2);
        // The looping timeline crossing the same marker is not progress.
        p.marker_reached("Tutorial", 2000);
        assert_eq!(p.fail_count(), 2);
        p.marker_reached("Loop1", 3000);
        assert_eq!(p.fail_count(), 0);
    }

    #[test]
    fn third_strike_requests_reload_once() {
        let mut p = Progression::new(3.0);
        advance_to(&mut p, GameState::Level2);
        p.section_failed();
        p.section_failed();
        let cmds = p.section_failed();
        assert!(cmds.contains(&Command::StartDialogue("Strike3")));
        assert!(cmds.contains(&Command::ShowGameOver));
        // Still replays the section while the countdown runs.
        assert!(cmds.contains(&Command::StartSection {
            chart: 2,
            origin: 6000
        }));
        assert!(p.is_game_over());

        assert!(p.update(1.0).is_empty());
        // A fourth failure during the countdown neither strikes nor restarts it.
        let cmds = p.section_failed();
        assert!(!cmds.contains(&Command::ShowGameOver));
        assert!(!cmds.iter().any(|c| matches!(c, Command::StartDialogue(n) if n.starts_with("Strike"))));
        assert!(p.update(1.5).is_empty());
        assert_eq!(p.update(0.6).as_slice(), &[Command::RequestFullReload]);
        assert!(p.update(10.0).is_empty());
        assert!(p.is_reload_requested());

        // Terminal: nothing is acted on any more.
        assert!(p.marker_reached("Post2", 7000).is_empty());
        assert!(p.section_failed().is_empty());
        assert_eq!(p.state(), GameState::Level2);
    }

    #[test]
    fn game_over_applies_in_any_section() {
        for target in [GameState::Tutorial, GameState::Level1, GameState::Level3] {
            let mut p = Progression::new(0.0);
            advance_to(&mut p, target);
            for _ in 0..GAME_OVER_STRIKES {
                p.section_failed();
            }
            let reloads = (0..5)
                .flat_map(|_| p.update(0.016))
                .filter(|c| *c == Command::RequestFullReload)
                .count();
            assert_eq!(reloads, 1, "{target:?}");
        }
    }

    #[test]
    fn retry_without_marker_rewinds_to_start() {
        let p = Progression::new(3.0);
        assert_eq!(p.rewind_position(), 0);
    }

    #[test]
    fn dialogue_end_resumes_only_pausing_states() {
        let mut p = Progression::new(3.0);
        advance_to(&mut p, GameState::FirstChorus);
        assert!(p.dialogue_finished("Strike1").is_empty());
        assert_eq!(
            p.dialogue_finished("Loop1").as_slice(),
            &[Command::ResumeClock]
        );
        p.marker_reached("Level1", 5000);
        assert!(p.dialogue_finished("Loop1").is_empty());
    }

    #[test]
    fn start_run_clears_labels() {
        let mut p = Progression::new(3.0);
        advance_to(&mut p, GameState::Level1);
        p.section_failed();
        let cmds = p.start_run();
        assert!(cmds.contains(&Command::SeekClock(0)));
        assert_eq!(p.state(), GameState::None);
        assert!(p.labels_passed().is_empty());
        assert_eq!(p.fail_count(), 0);
        p.marker_reached("Intro", 0);
        assert_eq!(p.state(), GameState::Intro);
    }
}

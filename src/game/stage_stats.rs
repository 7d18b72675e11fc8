use serde::{Deserialize, Serialize};

use crate::game::progression::GameState;

/// Per-section counters. Reset at every section start, including retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    pub hit_count: u32,
    /// Notes allowed to pass unhit.
    pub missed_count: u32,
    /// Presses with no note in the window.
    pub miss_hit_count: u32,
    pub health: i32,
    pub max_health: i32,
    pub failed: bool,
}

impl SectionStats {
    pub fn fresh(max_health: i32) -> Self {
        let max_health = max_health.max(1);
        Self {
            hit_count: 0,
            missed_count: 0,
            miss_hit_count: 0,
            health: max_health,
            max_health,
            failed: false,
        }
    }

    /// Health can run negative when several misses land before the next
    /// failure check; the extra deficit has no further effect.
    #[inline(always)]
    pub fn lose_health(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount);
    }

    #[inline(always)]
    pub const fn is_exhausted(&self) -> bool {
        self.health <= 0
    }

    #[inline(always)]
    pub const fn judged(&self) -> u32 {
        self.hit_count + self.missed_count
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionOutcome {
    Cleared,
    Failed,
    /// The run reloaded or a new section started before this one finished.
    Abandoned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    pub state: GameState,
    pub chart_index: usize,
    pub chart_name: String,
    /// 1-based: 1 for the first play, 2 for the first retry, ...
    pub attempt: u32,
    pub outcome: SectionOutcome,
    pub stats: SectionStats,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub final_state: Option<GameState>,
    pub total_failures: u32,
    pub reload_requested: bool,
    /// Timeline beats crossed during the run, replays included.
    pub beats_played: u64,
    pub sections: Vec<SectionReport>,
}

impl RunSummary {
    pub fn total_hits(&self) -> u32 {
        self.sections.iter().map(|s| s.stats.hit_count).sum()
    }

    pub fn total_misses(&self) -> u32 {
        self.sections
            .iter()
            .map(|s| s.stats.missed_count + s.stats.miss_hit_count)
            .sum()
    }
}

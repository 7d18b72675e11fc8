pub mod chart;
pub mod gameplay;
pub mod judgment;
pub mod life;
pub mod note;
pub mod progression;
pub mod session;
pub mod stage_stats;
pub mod timing_windows;
pub mod track;

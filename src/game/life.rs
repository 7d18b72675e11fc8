// Health lost per judgment. Hits never restore health within a section; a
// section starts at the configured maximum and fails the first time health
// reaches zero.

pub const HEALTH_MISS_HIT: i32 = 1;
pub const HEALTH_NOTE_MISSED: i32 = 1;

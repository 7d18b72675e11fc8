use crate::error::CoreError;
use crate::game::gameplay::EngineSettings;
use crate::game::timing_windows::{TimingWindows, beats_to_cu};
use ini::Ini;
use log::{info, warn};
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "backbeat.ini";
// Upper bound for any beat-denominated window or lead.
const MAX_BEATS: f32 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Conductor units per beat; every beat-denominated value below is scaled by it.
    pub units_per_beat: u32,
    /// Only used by the headless driver to advance the clock.
    pub bpm: f32,
    pub early_window_beats: f32,
    pub late_window_beats: f32,
    pub spawn_lead_beats: f32,
    pub lanes: usize,
    pub max_health_per_section: i32,
    pub game_over_delay_seconds: f32,
    pub marker_queue_capacity: usize,
    /// Headless autoplay skips every Nth note; 0 never skips.
    pub autoplay_miss_every: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            units_per_beat: 480,
            bpm: 120.0,
            early_window_beats: 0.25,
            late_window_beats: 0.125,
            spawn_lead_beats: 4.0,
            lanes: 4,
            max_health_per_section: 5,
            game_over_delay_seconds: 3.0,
            marker_queue_capacity: 64,
            autoplay_miss_every: 0,
        }
    }
}

impl Config {
    pub fn timing_windows(&self) -> TimingWindows {
        TimingWindows::from_beats(
            self.early_window_beats,
            self.late_window_beats,
            self.units_per_beat,
        )
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            windows: self.timing_windows(),
            max_health: self.max_health_per_section,
            num_lanes: self.lanes,
            spawn_lead: beats_to_cu(self.spawn_lead_beats, self.units_per_beat),
        }
    }

    /// Conductor units that elapse per second of music.
    pub fn units_per_second(&self) -> f64 {
        f64::from(self.units_per_beat) * f64::from(self.bpm) / 60.0
    }

    /// Reads every known key, keeping the default for anything missing or
    /// invalid.
    pub fn from_ini(conf: &Ini) -> Self {
        let default = Self::default();
        let get = |section: &str, key: &str| conf.get_from(Some(section), key).map(str::trim);

        let log_level = get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(v).ok())
            .unwrap_or(default.log_level);
        let units_per_beat = parse_or(
            get("Timing", "UnitsPerBeat"),
            "UnitsPerBeat",
            default.units_per_beat,
            |v| *v > 0,
        );
        let bpm = parse_or(
            get("Timing", "Bpm"),
            "Bpm",
            default.bpm,
            |v| v.is_finite() && *v > 0.0,
        );
        let early_window_beats = parse_or(
            get("Timing", "EarlyWindowBeats"),
            "EarlyWindowBeats",
            default.early_window_beats,
            |v| (0.0..=MAX_BEATS).contains(v),
        );
        let late_window_beats = parse_or(
            get("Timing", "LateWindowBeats"),
            "LateWindowBeats",
            default.late_window_beats,
            |v| (0.0..=MAX_BEATS).contains(v),
        );
        let spawn_lead_beats = parse_or(
            get("Timing", "SpawnLeadBeats"),
            "SpawnLeadBeats",
            default.spawn_lead_beats,
            |v| (0.0..=MAX_BEATS).contains(v),
        );
        let lanes = parse_or(
            get("Gameplay", "Lanes"),
            "Lanes",
            default.lanes,
            |v| *v > 0,
        );
        let max_health_per_section = parse_or(
            get("Gameplay", "MaxHealthPerSection"),
            "MaxHealthPerSection",
            default.max_health_per_section,
            |v| *v > 0,
        );
        let game_over_delay_seconds = parse_or(
            get("Progression", "GameOverDelaySeconds"),
            "GameOverDelaySeconds",
            default.game_over_delay_seconds,
            |v| v.is_finite() && *v >= 0.0,
        );
        let marker_queue_capacity = parse_or(
            get("Progression", "MarkerQueueCapacity"),
            "MarkerQueueCapacity",
            default.marker_queue_capacity,
            |v| *v > 0,
        );
        let autoplay_miss_every = parse_or(
            get("Autoplay", "MissEvery"),
            "MissEvery",
            default.autoplay_miss_every,
            |_| true,
        );

        Self {
            log_level,
            units_per_beat,
            bpm,
            early_window_beats,
            late_window_beats,
            spawn_lead_beats,
            lanes,
            max_health_per_section,
            game_over_delay_seconds,
            marker_queue_capacity,
            autoplay_miss_every,
        }
    }

    pub fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        conf.with_section(Some("Options"))
            .set("LogLevel", self.log_level.as_str());
        conf.with_section(Some("Timing"))
            .set("UnitsPerBeat", self.units_per_beat.to_string())
            .set("Bpm", self.bpm.to_string())
            .set("EarlyWindowBeats", self.early_window_beats.to_string())
            .set("LateWindowBeats", self.late_window_beats.to_string())
            .set("SpawnLeadBeats", self.spawn_lead_beats.to_string());
        conf.with_section(Some("Gameplay"))
            .set("Lanes", self.lanes.to_string())
            .set("MaxHealthPerSection", self.max_health_per_section.to_string());
        conf.with_section(Some("Progression"))
            .set("GameOverDelaySeconds", self.game_over_delay_seconds.to_string())
            .set("MarkerQueueCapacity", self.marker_queue_capacity.to_string());
        conf.with_section(Some("Autoplay"))
            .set("MissEvery", self.autoplay_miss_every.to_string());
        conf
    }
}

fn parse_or<T: FromStr + Copy>(
    raw: Option<&str>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            warn!("Invalid value '{raw}' for {key}; using default.");
            default
        }
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

fn create_default_config_file() -> Result<(), CoreError> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    Config::default().to_ini().write_to_file(CONFIG_PATH)?;
    Ok(())
}

pub fn load() {
    if !std::path::Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    match Ini::load_from_file(CONFIG_PATH) {
        Ok(conf) => {
            let cfg = Config::from_ini(&conf);
            info!("Configuration loaded from '{CONFIG_PATH}'.");
            set(cfg);
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    match CONFIG.lock() {
        Ok(cfg) => *cfg,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

pub fn set(cfg: Config) {
    match CONFIG.lock() {
        Ok(mut guard) => *guard = cfg,
        Err(poisoned) => *poisoned.into_inner() = cfg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let conf = Ini::load_from_str("[Timing]\nBpm=90\n").unwrap();
        let cfg = Config::from_ini(&conf);
        assert_eq!(cfg.bpm, 90.0);
        assert_eq!(cfg.lanes, Config::default().lanes);
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn invalid_values_fall_back() {
        let src = "[Gameplay]\nLanes=0\nMaxHealthPerSection=-2\n\
                   [Timing]\nEarlyWindowBeats=-0.5\nLateWindowBeats=abc\n\
                   [Options]\nLogLevel=loud\n";
        let cfg = Config::from_ini(&Ini::load_from_str(src).unwrap());
        let default = Config::default();
        assert_eq!(cfg.lanes, default.lanes);
        assert_eq!(cfg.max_health_per_section, default.max_health_per_section);
        assert_eq!(cfg.early_window_beats, default.early_window_beats);
        assert_eq!(cfg.late_window_beats, default.late_window_beats);
        assert_eq!(cfg.log_level, default.log_level);
    }

    #[test]
    fn windows_convert_to_conductor_units() {
        let src = "[Timing]\nUnitsPerBeat=1000\nEarlyWindowBeats=0.2\nLateWindowBeats=0.05\nSpawnLeadBeats=2\n\
                   [Gameplay]\nLanes=6\nMaxHealthPerSection=3\n";
        let cfg = Config::from_ini(&Ini::load_from_str(src).unwrap());
        let s = cfg.engine_settings();
        assert_eq!(s.windows, TimingWindows::new(200, 50));
        assert_eq!(s.spawn_lead, 2000);
        assert_eq!(s.num_lanes, 6);
        assert_eq!(s.max_health, 3);
    }

    #[test]
    fn written_file_reads_back() {
        let mut cfg = Config::default();
        cfg.log_level = LogLevel::Debug;
        cfg.autoplay_miss_every = 7;
        cfg.game_over_delay_seconds = 1.5;
        let mut buf = Vec::new();
        cfg.to_ini().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let back = Config::from_ini(&Ini::load_from_str(&text).unwrap());
        assert_eq!(back, cfg);
    }

    #[test]
    fn huge_beat_values_fall_back() {
        let src = "[Timing]\nSpawnLeadBeats=1e30\nLateWindowBeats=inf\nEarlyWindowBeats=2048\n";
        let cfg = Config::from_ini(&Ini::load_from_str(src).unwrap());
        let default = Config::default();
        assert_eq!(cfg.spawn_lead_beats, default.spawn_lead_beats);
        assert_eq!(cfg.late_window_beats, default.late_window_beats);
        assert_eq!(cfg.early_window_beats, default.early_window_beats);
        assert_eq!(cfg.engine_settings().spawn_lead, 4 * 480);
    }

    #[test]
    fn units_per_second_follow_bpm() {
        let cfg = Config {
            units_per_beat: 480,
            bpm: 150.0,
            ..Config::default()
        };
        assert_eq!(cfg.units_per_second(), 1200.0);
    }
}

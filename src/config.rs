/*
 *  config.rs
 *
 *  departure-board - live departures on small matrix displays
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered YAML and command line configuration
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::{AnimationProfiles, BoardMode, BoardSettings, RotationSettings};
use crate::feed::{OperatingHours, PollerSettings};

pub const DEFAULT_TARGET_FPS: u32 = 70;
pub const DEFAULT_FPS_LOG_SECS: u64 = 180;
pub const DEFAULT_SPLASH_FRAMES: u32 = 140;
pub const DEFAULT_REFRESH_SECS: u64 = 180;
pub const DEFAULT_STATUS_POLL_SECS: u64 = 180;
pub const DEFAULT_RESHOW_SECS: u64 = 60;
pub const DEFAULT_ANNOUNCE_SECS: u64 = 360;
pub const DEFAULT_ALTERNATING_ROW_SECS: u64 = 7;
pub const DEFAULT_PBM_PATH: &str = "departure-board.pbm";
pub const DEFAULT_SECOND_PBM_PATH: &str = "departure-board-2.pbm";
pub const DEFAULT_PBM_EVERY: u64 = 35;
pub const DEFAULT_TEXT_CACHE_CAPACITY: u64 = 512;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so files and
/// command line flags can be layered; accessors fill in the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub display: Option<DisplayConfig>,
    pub board: Option<BoardConfig>,
    pub animation: Option<AnimationProfiles>,
    pub status: Option<StatusConfig>,
    pub feed: Option<FeedConfig>,
    pub text_cache_capacity: Option<u64>,
    /// drive a second board from `screen2`
    pub dual_screen: Option<bool>,
    pub screen2: Option<ScreenConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Pbm,
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub target_fps: Option<u32>,
    pub fps_log_interval_secs: Option<u64>,
    pub splash_frames: Option<u32>,
    pub sink: Option<SinkKind>,
    pub pbm_path: Option<PathBuf>,
    pub pbm_every_frames: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BoardConfig {
    pub station_name: Option<String>,
    pub mode: Option<BoardMode>,
    pub first_departure_bold: Option<bool>,
    pub show_departure_numbers: Option<bool>,
    pub show_platform: Option<bool>,
    pub out_of_hours_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusConfig {
    pub enabled: Option<bool>,
    pub poll_interval_secs: Option<u64>,
    pub reshow_interval_secs: Option<u64>,
    pub announce_interval_secs: Option<u64>,
    pub announcements: Option<bool>,
    pub alternating_row_interval_secs: Option<u64>,
    pub alternate_rows: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedConfig {
    /// YAML file with the station's departures
    pub source: Option<PathBuf>,
    pub refresh_interval_secs: Option<u64>,
    /// e.g. "6-23"; departures are only shown inside this window
    pub operating_hours: Option<OperatingHours>,
}

/// The second board. Anything not set here follows the first board.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScreenConfig {
    pub station_name: Option<String>,
    pub mode: Option<BoardMode>,
    pub show_platform: Option<bool>,
    pub out_of_hours_name: Option<String>,
    /// departures file for this board
    pub feed: Option<PathBuf>,
    pub pbm_path: Option<PathBuf>,
}

/// Everything one physical board needs, defaults filled in.
#[derive(Debug, Clone)]
pub struct Screen {
    pub name: &'static str,
    pub station_name: String,
    pub board: BoardSettings,
    pub poller: PollerSettings,
    pub feed_source: Option<PathBuf>,
    pub sink: SinkKind,
    pub pbm_path: PathBuf,
    pub pbm_every_frames: u64,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "departure-board", about = "Live departure board for small matrix displays", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// debug logging
    #[arg(long, short = 'd', action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub station: Option<String>,
    #[arg(long, value_enum)]
    pub mode: Option<CliMode>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    #[arg(long)]
    pub fps: Option<u32>,
    #[arg(long, action = ArgAction::Set)]
    pub show_platform: Option<bool>,
    #[arg(long, action = ArgAction::Set)]
    pub status: Option<bool>,
    /// departures file to poll
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub feed: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub pbm_path: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMode {
    Rail,
    Tfl,
}

impl From<CliMode> for BoardMode {
    fn from(m: CliMode) -> Self {
        match m {
            CliMode::Rail => BoardMode::Rail,
            CliMode::Tfl => BoardMode::Tfl,
        }
    }
}

/// Read YAML (explicit path or search), layer CLI overrides, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults
    let mut cfg = Config::default();

    // 2) YAML file
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective config
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/departure-board/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/departure-board.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["departure-board.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse(&s)
}

pub fn parse(yaml: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
}

macro_rules! take {
    ($dst:expr, $src:expr, $($field:ident),+) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    take!(dst, src, log_level, animation, text_cache_capacity, dual_screen);
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => {
            take!(d, s, width, height, target_fps, fps_log_interval_secs, splash_frames, sink, pbm_path, pbm_every_frames);
        }
        _ => {}
    }
    match (&mut dst.board, src.board) {
        (None, Some(c)) => dst.board = Some(c),
        (Some(d), Some(s)) => {
            take!(
                d, s, station_name, mode, first_departure_bold, show_departure_numbers, show_platform,
                out_of_hours_name
            );
        }
        _ => {}
    }
    match (&mut dst.status, src.status) {
        (None, Some(c)) => dst.status = Some(c),
        (Some(d), Some(s)) => {
            take!(
                d, s, enabled, poll_interval_secs, reshow_interval_secs, announce_interval_secs,
                announcements, alternating_row_interval_secs, alternate_rows
            );
        }
        _ => {}
    }
    match (&mut dst.feed, src.feed) {
        (None, Some(c)) => dst.feed = Some(c),
        (Some(d), Some(s)) => {
            take!(d, s, source, refresh_interval_secs, operating_hours);
        }
        _ => {}
    }
    match (&mut dst.screen2, src.screen2) {
        (None, Some(c)) => dst.screen2 = Some(c),
        (Some(d), Some(s)) => {
            take!(d, s, station_name, mode, show_platform, out_of_hours_name, feed, pbm_path);
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }

    let display = cfg.display.get_or_insert_with(DisplayConfig::default);
    if cli.width.is_some()    { display.width = cli.width; }
    if cli.height.is_some()   { display.height = cli.height; }
    if cli.fps.is_some()      { display.target_fps = cli.fps; }
    if cli.sink.is_some()     { display.sink = cli.sink; }
    if cli.pbm_path.is_some() { display.pbm_path = cli.pbm_path.clone(); }

    let board = cfg.board.get_or_insert_with(BoardConfig::default);
    if cli.station.is_some()       { board.station_name = cli.station.clone(); }
    if let Some(mode) = cli.mode   { board.mode = Some(mode.into()); }
    if cli.show_platform.is_some() { board.show_platform = cli.show_platform; }

    if cli.status.is_some() {
        cfg.status.get_or_insert_with(StatusConfig::default).enabled = cli.status;
    }
    if cli.feed.is_some() {
        cfg.feed.get_or_insert_with(FeedConfig::default).source = cli.feed.clone();
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    cfg.board_settings()
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    if cfg.display.as_ref().and_then(|d| d.target_fps) == Some(0) {
        return Err(ConfigError::Validation("display target_fps must be >= 1".into()));
    }
    if cfg.display.as_ref().and_then(|d| d.pbm_every_frames) == Some(0) {
        return Err(ConfigError::Validation("display pbm_every_frames must be >= 1".into()));
    }
    let intervals = [
        ("display fps_log_interval_secs", cfg.display.as_ref().and_then(|d| d.fps_log_interval_secs)),
        ("status poll_interval_secs", cfg.status.as_ref().and_then(|s| s.poll_interval_secs)),
        ("status reshow_interval_secs", cfg.status.as_ref().and_then(|s| s.reshow_interval_secs)),
        ("status announce_interval_secs", cfg.status.as_ref().and_then(|s| s.announce_interval_secs)),
        ("status alternating_row_interval_secs", cfg.status.as_ref().and_then(|s| s.alternating_row_interval_secs)),
        ("feed refresh_interval_secs", cfg.feed.as_ref().and_then(|f| f.refresh_interval_secs)),
    ];
    for (name, value) in intervals {
        if value == Some(0) {
            return Err(ConfigError::Validation(format!("{name} must be > 0")));
        }
    }
    if cfg.dual_screen == Some(true) && cfg.screen2.is_none() {
        return Err(ConfigError::Validation("dual_screen needs a screen2 section".into()));
    }
    let screens = cfg.screens();
    for screen in &screens {
        screen
            .board
            .validate()
            .map_err(|e| ConfigError::Validation(format!("{}: {e}", screen.name)))?;
    }
    if let [first, second] = screens.as_slice() {
        if first.sink == SinkKind::Pbm && first.pbm_path == second.pbm_path {
            return Err(ConfigError::Validation(format!(
                "both screens write {}",
                first.pbm_path.display()
            )));
        }
    }
    Ok(())
}

impl Config {
    fn display_cfg(&self) -> DisplayConfig { self.display.clone().unwrap_or_default() }
    fn board_cfg(&self) -> BoardConfig { self.board.clone().unwrap_or_default() }
    fn status_cfg(&self) -> StatusConfig { self.status.clone().unwrap_or_default() }
    fn feed_cfg(&self) -> FeedConfig { self.feed.clone().unwrap_or_default() }

    pub fn station_name(&self) -> String {
        self.board_cfg().station_name.unwrap_or_default()
    }

    pub fn target_fps(&self) -> u32 {
        self.display_cfg().target_fps.unwrap_or(DEFAULT_TARGET_FPS)
    }

    pub fn fps_log_interval(&self) -> Duration {
        Duration::from_secs(self.display_cfg().fps_log_interval_secs.unwrap_or(DEFAULT_FPS_LOG_SECS))
    }

    pub fn splash_frames(&self) -> u32 {
        self.display_cfg().splash_frames.unwrap_or(DEFAULT_SPLASH_FRAMES)
    }

    pub fn sink(&self) -> SinkKind {
        self.display_cfg().sink.unwrap_or(SinkKind::Pbm)
    }

    pub fn pbm_path(&self) -> PathBuf {
        self.display_cfg().pbm_path.unwrap_or_else(|| PathBuf::from(DEFAULT_PBM_PATH))
    }

    pub fn pbm_every_frames(&self) -> u64 {
        self.display_cfg().pbm_every_frames.unwrap_or(DEFAULT_PBM_EVERY)
    }

    pub fn feed_source(&self) -> Option<PathBuf> {
        self.feed_cfg().source
    }

    /// Settings for the render core, defaults filled in.
    pub fn board_settings(&self) -> BoardSettings {
        let display = self.display_cfg();
        let board = self.board_cfg();
        let status = self.status_cfg();
        let defaults = BoardSettings::default();
        BoardSettings {
            width: display.width.unwrap_or(defaults.width),
            height: display.height.unwrap_or(defaults.height),
            mode: board.mode.unwrap_or(defaults.mode),
            first_departure_bold: board.first_departure_bold.unwrap_or(defaults.first_departure_bold),
            show_departure_numbers: board.show_departure_numbers.unwrap_or(defaults.show_departure_numbers),
            show_platform: board.show_platform.unwrap_or(defaults.show_platform),
            profiles: self.animation.unwrap_or_default(),
            rotation: RotationSettings {
                status_enabled: status.enabled.unwrap_or(false),
                reshow_interval: Duration::from_secs(status.reshow_interval_secs.unwrap_or(DEFAULT_RESHOW_SECS)),
                alternation_enabled: status.alternate_rows.unwrap_or(true),
                alternation_interval: Duration::from_secs(
                    status.alternating_row_interval_secs.unwrap_or(DEFAULT_ALTERNATING_ROW_SECS),
                ),
            },
            text_cache_capacity: self.text_cache_capacity.unwrap_or(DEFAULT_TEXT_CACHE_CAPACITY),
        }
    }

    /// The boards to drive: the first always, the second with `dual_screen`.
    pub fn screens(&self) -> Vec<Screen> {
        let first = Screen {
            name: "screen1",
            station_name: self.station_name(),
            board: self.board_settings(),
            poller: self.poller_settings(),
            feed_source: self.feed_source(),
            sink: self.sink(),
            pbm_path: self.pbm_path(),
            pbm_every_frames: self.pbm_every_frames(),
        };
        let second = match (&self.screen2, self.dual_screen) {
            (Some(screen2), Some(true)) => screen2.clone(),
            _ => return vec![first],
        };

        let mut board = first.board.clone();
        board.mode = second.mode.unwrap_or(board.mode);
        board.show_platform = second.show_platform.unwrap_or(board.show_platform);
        let poller = PollerSettings {
            out_of_hours_name: second.out_of_hours_name.unwrap_or_default(),
            ..first.poller.clone()
        };
        let screen2 = Screen {
            name: "screen2",
            station_name: second.station_name.unwrap_or_default(),
            board,
            poller,
            feed_source: second.feed,
            sink: first.sink,
            pbm_path: second.pbm_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SECOND_PBM_PATH)),
            pbm_every_frames: first.pbm_every_frames,
        };
        vec![first, screen2]
    }

    /// Settings for the background feed poller, defaults filled in.
    pub fn poller_settings(&self) -> PollerSettings {
        let status = self.status_cfg();
        PollerSettings {
            refresh_interval: Duration::from_secs(self.feed_cfg().refresh_interval_secs.unwrap_or(DEFAULT_REFRESH_SECS)),
            status_enabled: status.enabled.unwrap_or(false),
            status_interval: Duration::from_secs(status.poll_interval_secs.unwrap_or(DEFAULT_STATUS_POLL_SECS)),
            announcements: status.announcements.unwrap_or(false),
            announce_interval: Duration::from_secs(status.announce_interval_secs.unwrap_or(DEFAULT_ANNOUNCE_SECS)),
            operating_hours: self.feed_cfg().operating_hours,
            out_of_hours_name: self.board_cfg().out_of_hours_name.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::CellProfile;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(validate(&cfg).is_ok());
        let b = cfg.board_settings();
        assert_eq!((b.width, b.height), (256, 64));
        assert_eq!(b.mode, BoardMode::Rail);
        assert!(b.first_departure_bold);
        assert!(!b.rotation.status_enabled);
        assert_eq!(b.rotation.alternation_interval, Duration::from_secs(7));
        assert_eq!(cfg.target_fps(), 70);
        assert_eq!(cfg.fps_log_interval(), Duration::from_secs(180));
        assert_eq!(cfg.poller_settings().announce_interval, Duration::from_secs(360));
    }

    #[test]
    fn test_yaml_sections() {
        let cfg = parse(
            r#"
display:
  target_fps: 50
  sink: "null"
board:
  station_name: Reading
  mode: tfl
  show_platform: false
animation:
  status_banner:
    roll_step: 1
    rollup_pause_frames: 20
    end_pause_frames: 8
    scroll_speed: 3
status:
  enabled: true
  reshow_interval_secs: 90
"#,
        )
        .unwrap();
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.target_fps(), 50);
        assert_eq!(cfg.sink(), SinkKind::Null);
        assert_eq!(cfg.station_name(), "Reading");
        let b = cfg.board_settings();
        assert_eq!(b.mode, BoardMode::Tfl);
        assert!(!b.show_platform);
        assert_eq!(b.profiles.status_banner.scroll_speed, 3);
        // untouched profiles keep their defaults
        assert_eq!(b.profiles.alternating_row, CellProfile::ALTERNATING_ROW);
        assert!(b.rotation.status_enabled);
        assert_eq!(b.rotation.reshow_interval, Duration::from_secs(90));
        assert!(cfg.poller_settings().status_enabled);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base = parse("board:\n  station_name: Reading\n  show_platform: false\n").unwrap();
        let over = parse("board:\n  station_name: Slough\n").unwrap();
        merge(&mut base, over);
        assert_eq!(base.station_name(), "Slough");
        assert!(!base.board_settings().show_platform);
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse("display:\n  target_fps: 50\nboard:\n  mode: rail\n").unwrap();
        let cli = Cli::try_parse_from([
            "departure-board", "--fps", "30", "--mode", "tfl", "--station", "Stratford", "--status", "true",
        ])
        .unwrap();
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.target_fps(), 30);
        assert_eq!(cfg.board_settings().mode, BoardMode::Tfl);
        assert_eq!(cfg.station_name(), "Stratford");
        assert!(cfg.board_settings().rotation.status_enabled);
    }

    #[test]
    fn test_validation_errors() {
        for yaml in [
            "display:\n  width: 0\n",
            "display:\n  height: 32\n",
            "display:\n  target_fps: 0\n",
            "status:\n  poll_interval_secs: 0\n",
            "text_cache_capacity: 0\n",
            "animation:\n  calling_points:\n    roll_step: 0\n    rollup_pause_frames: 20\n    end_pause_frames: 8\n    scroll_speed: 1\n",
            "animation:\n  status_banner:\n    roll_step: 1\n    rollup_pause_frames: 20\n    end_pause_frames: 8\n    scroll_speed: 4294967295\n",
            "dual_screen: true\n",
        ] {
            let cfg = parse(yaml).unwrap();
            assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))), "{yaml}");
        }
    }

    #[test]
    fn test_operating_hours_section() {
        let cfg = parse(
            "board:\n  station_name: Ealing Broadway\n  out_of_hours_name: London Paddington\nfeed:\n  operating_hours: \"6-23\"\n",
        )
        .unwrap();
        let poller = cfg.poller_settings();
        assert_eq!(poller.operating_hours, Some(OperatingHours::new(6, 23).unwrap()));
        assert_eq!(poller.out_of_hours_name, "London Paddington");
        assert!(matches!(parse("feed:\n  operating_hours: \"6-25\"\n"), Err(ConfigError::Yaml(_))));
        assert_eq!(Config::default().poller_settings().operating_hours, None);
    }

    #[test]
    fn test_single_screen_by_default() {
        let cfg = parse("screen2:\n  station_name: Northfields\n").unwrap();
        let screens = cfg.screens();
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].name, "screen1");
    }

    #[test]
    fn test_dual_screen() {
        let cfg = parse(
            r#"
dual_screen: true
board:
  station_name: Ealing Broadway
  out_of_hours_name: London Paddington
feed:
  source: ealing.yaml
status:
  enabled: true
screen2:
  station_name: Northfields
  mode: tfl
  out_of_hours_name: Northfields
  feed: northfields.yaml
"#,
        )
        .unwrap();
        assert!(validate(&cfg).is_ok());
        let screens = cfg.screens();
        assert_eq!(screens.len(), 2);
        let (first, second) = (&screens[0], &screens[1]);
        assert_eq!(first.board.mode, BoardMode::Rail);
        assert_eq!(first.poller.out_of_hours_name, "London Paddington");
        assert_eq!(second.station_name, "Northfields");
        assert_eq!(second.board.mode, BoardMode::Tfl);
        assert_eq!(second.feed_source, Some(PathBuf::from("northfields.yaml")));
        assert_eq!(second.poller.out_of_hours_name, "Northfields");
        assert_eq!(second.pbm_path, PathBuf::from(DEFAULT_SECOND_PBM_PATH));
        // shared sections carry over
        assert!(second.board.rotation.status_enabled);
        assert!(second.poller.status_enabled);
    }

    #[test]
    fn test_dual_screen_validation() {
        let missing = parse("dual_screen: true\n").unwrap();
        assert!(matches!(validate(&missing), Err(ConfigError::Validation(_))));
        let clash = parse("dual_screen: true\nscreen2:\n  pbm_path: departure-board.pbm\n").unwrap();
        assert!(matches!(validate(&clash), Err(ConfigError::Validation(_))));
        let quiet = parse("dual_screen: true\ndisplay:\n  sink: \"null\"\nscreen2:\n  pbm_path: departure-board.pbm\n").unwrap();
        assert!(validate(&quiet).is_ok());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(parse("display: [1, 2"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/departure-board.yaml")), ..Cli::default() };
        assert!(matches!(load(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse("board:\n  station_name: Reading\n").unwrap();
        let text = dump(&cfg).unwrap();
        assert_eq!(parse(&text).unwrap().station_name(), "Reading");
    }
}

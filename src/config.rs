/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub physics: PhysicsConfig,
    pub gamepad: GamepadConfig,
    /// Map to load instead of the embedded tower, if it exists.
    pub map_file: Option<PathBuf>,
    pub cheats: bool,
    pub log_file: String,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub min_loading_ticks: u32,
}

/// Movement tuning. Speeds are world units per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub climb_speed: f64,
    pub jump_speed: f64,
    pub fall_speed: f64,
    pub slip_speed: f64,
    pub slip_edge_speed: f64,  // slip start/end
    pub min_jump_dist: f64,
    pub max_jump_dist: f64,
    pub water_speed: f64,
    pub water_recede_factor: f64,
    pub shake_magnitude: f64,
    pub shake_duration: u32,
    pub shake_period: f64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_min_loading")]
    min_loading_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_climb")]
    climb_speed: f64,
    #[serde(default = "default_jump")]
    jump_speed: f64,
    #[serde(default = "default_fall")]
    fall_speed: f64,
    #[serde(default = "default_slip")]
    slip_speed: f64,
    #[serde(default = "default_slip_edge")]
    slip_edge_speed: f64,
    #[serde(default = "default_min_jump")]
    min_jump_dist: f64,
    #[serde(default = "default_max_jump")]
    max_jump_dist: f64,
    #[serde(default = "default_water_speed")]
    water_speed: f64,
    #[serde(default = "default_water_recede")]
    water_recede_factor: f64,
    #[serde(default = "default_shake_magnitude")]
    shake_magnitude: f64,
    #[serde(default = "default_shake_duration")]
    shake_duration: u32,
    #[serde(default = "default_shake_period")]
    shake_period: f64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump_buttons")]
    jump: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    map_file: String,
    #[serde(default)]
    cheats: bool,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_min_loading() -> u32 { 120 }  // ~2s of loading screen

fn default_climb() -> f64 { 1.2 }
fn default_jump() -> f64 { 4.0 }
fn default_fall() -> f64 { 6.0 }
fn default_slip() -> f64 { 2.0 }
fn default_slip_edge() -> f64 { 0.5 }
fn default_min_jump() -> f64 { 28.0 }
fn default_max_jump() -> f64 { 44.0 }
fn default_water_speed() -> f64 { 0.35 }
fn default_water_recede() -> f64 { 3.0 }
fn default_shake_magnitude() -> f64 { 10.0 }
fn default_shake_duration() -> u32 { 40 }
fn default_shake_period() -> f64 { 10.0 }

fn default_jump_buttons() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_log_file() -> String { "nanoclimb.log".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            min_loading_ticks: default_min_loading(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            climb_speed: default_climb(),
            jump_speed: default_jump(),
            fall_speed: default_fall(),
            slip_speed: default_slip(),
            slip_edge_speed: default_slip_edge(),
            min_jump_dist: default_min_jump(),
            max_jump_dist: default_max_jump(),
            water_speed: default_water_speed(),
            water_recede_factor: default_water_recede(),
            shake_magnitude: default_shake_magnitude(),
            shake_duration: default_shake_duration(),
            shake_period: default_shake_period(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump_buttons(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            map_file: String::new(),
            cheats: false,
            log_file: default_log_file(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        let g = TomlGamepad::default();
        GamepadConfig { jump: g.jump, confirm: g.confirm, cancel: g.cancel, pause: g.pause }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        TomlPhysics::default().into()
    }
}

impl From<TomlPhysics> for PhysicsConfig {
    fn from(p: TomlPhysics) -> Self {
        PhysicsConfig {
            climb_speed: p.climb_speed,
            jump_speed: p.jump_speed,
            fall_speed: p.fall_speed,
            slip_speed: p.slip_speed,
            slip_edge_speed: p.slip_edge_speed,
            min_jump_dist: p.min_jump_dist,
            max_jump_dist: p.max_jump_dist,
            water_speed: p.water_speed,
            water_recede_factor: p.water_recede_factor,
            shake_magnitude: p.shake_magnitude,
            shake_duration: p.shake_duration,
            shake_period: p.shake_period.max(1.0),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, current working directory, data dirs.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve the map override against the search dirs
        let map_str = toml_cfg.general.map_file.trim();
        let map_file = if map_str.is_empty() {
            None
        } else if PathBuf::from(map_str).is_absolute() {
            Some(PathBuf::from(map_str))
        } else {
            search_dirs.iter()
                .map(|d| d.join(map_str))
                .find(|p| p.is_file())
                .or_else(|| Some(PathBuf::from(map_str)))
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
                min_loading_ticks: toml_cfg.speed.min_loading_ticks,
            },
            physics: toml_cfg.physics.into(),
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                pause: toml_cfg.gamepad.pause,
            },
            map_file,
            cheats: toml_cfg.general.cheats,
            log_file: toml_cfg.general.log_file,
        }
    }

    /// Parse a config document; on a syntax error the defaults are used.
    pub fn parse(text: &str) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config.toml parse error, using defaults: {e}");
                TomlConfig::default()
            }
        };
        GameConfig::from_toml(toml_cfg, &[])
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/nanoclimb)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/nanoclimb");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/nanoclimb");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        log::info!("config loaded from {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("{} parse error, using defaults: {e}", path.display());
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let c = GameConfig::parse("");
        assert_eq!(c.speed.tick_rate_ms, 16);
        assert_eq!(c.speed.min_loading_ticks, 120);
        assert_eq!(c.physics, PhysicsConfig::default());
        assert_eq!(c.physics.max_jump_dist, 44.0);
        assert_eq!(c.physics.water_speed, 0.35);
        assert!(!c.cheats);
        assert!(c.map_file.is_none());
        assert_eq!(c.log_file, "nanoclimb.log");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = GameConfig::parse(
            "[physics]\njump_speed = 5.0\n\n[general]\ncheats = true\nmap_file = \"maps/other.toml\"\n",
        );
        assert_eq!(c.physics.jump_speed, 5.0);
        assert_eq!(c.physics.fall_speed, 6.0);
        assert!(c.cheats);
        assert_eq!(c.map_file, Some(PathBuf::from("maps/other.toml")));
        assert_eq!(c.gamepad.jump, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn malformed_document_falls_back() {
        let c = GameConfig::parse("[speed\ntick_rate_ms = ");
        assert_eq!(c.speed.tick_rate_ms, 16);
    }
}

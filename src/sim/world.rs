/// WorldState: the complete snapshot of a running game.
///
/// ## Static vs. per-attempt data
///
///   - `space`, `level`, sprite sheets: built once by the loader, never
///     mutated while playing.
///   - `player`, `water`, `hints`, `fade`: reset in place by
///     `restart_level` at the start of every attempt.
///
/// ## Scenes
///
/// `phase` is the active scene. Data shared between scenes (camera, stats,
/// round timing) lives in the explicit `Session`; see `sim::scene` for the
/// enter/exit hooks.

use crate::assets::AssetStore;
use crate::config::{GameConfig, PhysicsConfig};
use crate::domain::anim::SpriteSheet;
use crate::domain::entity::{AnimTable, Player};
use crate::domain::hint::ControlHint;
use crate::domain::space::SpatialIndex;
use crate::domain::water::Water;
use super::camera::{Camera, Shaker};
use super::level::Level;
use super::save::Stats;
use super::scene::Menu;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Start,
    Running,
    Paused,
    Over,
    Won,
}

/// Linear fade to black, 0..=255 over `FADE_TICKS`.
pub const FADE_TICKS: u32 = 360;

#[derive(Clone, Debug, Default)]
pub struct Fade {
    ticks: u32,
}

impl Fade {
    /// Advance one tick and return the new alpha.
    pub fn update(&mut self) -> u8 {
        self.ticks = (self.ticks + 1).min(FADE_TICKS);
        self.alpha()
    }

    pub fn alpha(&self) -> u8 {
        (255 * self.ticks / FADE_TICKS) as u8
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}

/// Context shared by all scenes.
#[derive(Clone, Debug)]
pub struct Session {
    pub camera: Camera,
    pub stats: Stats,
    /// Player y at the start line; heights are measured from here.
    pub start_y: f64,
    /// Ticks spent climbing this attempt.
    pub round_ticks: u64,
    /// Finish time of the last completed attempt.
    pub last_round_ticks: u64,
    /// Best height of the current (or last) attempt, in metres.
    pub last_highest: u32,
    /// The next time Running is entered a fresh attempt starts.
    pub reset_needed: bool,
}

pub struct WorldState {
    // ── Static level data ──
    pub space: SpatialIndex,
    pub level: Level,
    pub anims: AnimTable,
    pub player_sheet: SpriteSheet,
    pub controls: SpriteSheet,
    pub physics: PhysicsConfig,

    // ── Per-attempt state ──
    pub player: Player,
    pub water: Water,
    pub hints: Vec<ControlHint>,
    pub fade: Fade,
    /// Zoom target of the win sequence.
    pub min_scale: f64,

    // ── Scenes ──
    pub phase: Phase,
    pub menu: Menu,
    pub session: Session,

    // ── Meta ──
    pub tick: u64,
    pub message: String,
    pub message_timer: u32,
    pub cheats: bool,
    pub debug: bool,
}

// ── Construction ──

impl WorldState {
    pub fn new(store: AssetStore, config: &GameConfig, stats: Stats) -> Self {
        let AssetStore { level, space, player_sheet, controls, anims, hints, .. } = store;
        let physics = config.physics.clone();
        let shaker = Shaker::new(physics.shake_magnitude, physics.shake_duration, physics.shake_period);
        let water = Water::new(level.height, physics.water_speed, physics.water_recede_factor);
        let player = Player::new(level.start);

        let mut camera = Camera::new(shaker);
        camera.follow(level.start, level.size());

        WorldState {
            session: Session {
                camera,
                stats,
                start_y: level.start.y,
                round_ticks: 0,
                last_round_ticks: 0,
                last_highest: 0,
                reset_needed: true,
            },
            space,
            level,
            anims,
            player_sheet,
            controls,
            physics,
            player,
            water,
            hints,
            fade: Fade::default(),
            min_scale: 1.0,
            phase: Phase::Start,
            menu: Menu::for_phase(Phase::Start),
            tick: 0,
            message: String::new(),
            message_timer: 0,
            cheats: config.cheats,
            debug: false,
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Cheat: freeze or release the water.
    pub fn toggle_water(&mut self) {
        if !self.cheats { return; }
        let paused = self.water.toggle_pause();
        log::info!("cheat: water {}", if paused { "paused" } else { "released" });
        self.set_message(if paused { "WATER PAUSED" } else { "WATER RELEASED" }, 90);
    }
}

/// Entry point and game loop.

mod assets;
mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::time::{Duration, Instant};

use config::GameConfig;
use domain::entity::Intent;
use sim::event::GameEvent;
use sim::loader::Loader;
use sim::save;
use sim::scene::{self, MenuNav, SceneCommand};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::{merge_intent, merge_nav, GamepadState};
use ui::input::{InputState, PendingPress, KEY_CHEAT_WATER, KEY_DEBUG};
use ui::renderer::{format_time, Renderer};
use ui::sound::{Sfx, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    log::info!("nanoclimb {} starting", env!("CARGO_PKG_VERSION"));

    let mut renderer = Renderer::new(config.speed.tick_rate_ms);
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut input = InputState::new();
    input.honor_release = renderer.keyboard_enhanced();
    let (mut world, sound) = match loading_screen(&mut renderer, &mut input, &config) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => {
            let _ = renderer.cleanup();
            return;
        }
        Err(e) => {
            log::error!("{e}");
            let _ = renderer.cleanup();
            eprintln!("Failed to start: {e}");
            std::process::exit(1);
        }
    };

    let result = game_loop(&mut world, &mut renderer, &mut input, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        log::error!("game loop stopped: {e}");
        eprintln!("Game error: {e}");
    }

    let stats = &world.session.stats;
    println!();
    println!("Thanks for playing Nano Climb!");
    println!("Best height: {} m", stats.highest_point);
    if stats.fastest_ticks > 0 {
        println!("Fastest climb: {}", format_time(stats.fastest_ticks, config.speed.tick_rate_ms));
    }
}

/// Log to a file next to the stats; the terminal belongs to the game.
fn init_logging(config: &GameConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let path = save::data_dir().join(&config.log_file);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            // Nowhere to write: stay quiet rather than scribble over the screen
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

/// Show the loading screen until the asset store arrives.
/// `Ok(None)` means the player quit while waiting.
fn loading_screen(
    renderer: &mut Renderer,
    input: &mut InputState,
    config: &GameConfig,
) -> Result<Option<(WorldState, Option<SoundEngine>)>, Box<dyn std::error::Error>> {
    let mut loader = Loader::spawn(config.map_file.clone());
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        input.drain_events();
        if input.ctrl_c_pressed() {
            return Ok(None);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            if let Some(result) = loader.poll(config.speed.min_loading_ticks) {
                let store = result?;
                log::info!(
                    "loaded map '{}' ({} obstacles) in {} ticks",
                    store.level.name, store.space.len(), loader.ticks,
                );
                let sound = SoundEngine::new(store.sounds.clone());
                let world = WorldState::new(store, config, save::load_stats());
                return Ok(Some((world, sound)));
            }
        }

        let label = assets::stage_label(loader.progress.counter());
        renderer.render_loading(label, loader.ticks)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    kb: &mut InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gp = GamepadState::new(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);

    let mut pending = PendingPress::default();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if kb.was_pressed(KEY_DEBUG) {
            world.debug = !world.debug;
        }
        if world.phase == Phase::Running && kb.was_pressed(KEY_CHEAT_WATER) {
            world.toggle_water();
        }

        let nav = merge_nav(kb.menu_nav(), gp.menu_nav());
        let pause = kb.pause_pressed() || gp.pause_pressed();
        let in_menu = world.phase != Phase::Running;
        if scene::update(world, nav, pause) == SceneCommand::Quit {
            break;
        }
        if in_menu && nav != MenuNav::None {
            play(sound, Sfx::Blip);
        }

        // The key that left a menu must not also jump
        let climbing = !in_menu && world.phase == Phase::Running;
        if climbing {
            pending.latch(merge_intent(kb.intent(), gp.intent()));
        } else {
            pending.clear();
        }

        if last_tick.elapsed() >= tick_rate {
            let intent = if climbing {
                pending.take(merge_intent(kb.intent(), gp.intent()))
            } else {
                Intent::default()
            };
            let events = step::step(world, intent);
            process_events(world, sound, &events);
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn play(sound: Option<&SoundEngine>, sfx: Sfx) {
    if let Some(s) = sound {
        s.play(sfx);
    }
}

fn process_events(world: &WorldState, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::JumpStarted => play(sound, Sfx::Jump),
            GameEvent::CameraShake { .. } => play(sound, Sfx::Thud),
            GameEvent::FallStarted => play(sound, Sfx::Fall),
            GameEvent::SlipStarted => play(sound, Sfx::Slip),
            GameEvent::Landed => play(sound, Sfx::Land),
            GameEvent::Drowned { falling } => {
                play(sound, if *falling { Sfx::Splash } else { Sfx::Submerge });
            }
            GameEvent::Finished { .. } | GameEvent::Won => play(sound, Sfx::Win),
            GameEvent::Died => {}
            GameEvent::NewRecord => {
                if let Err(e) = save::save_stats(&world.session.stats) {
                    log::warn!("could not save stats: {e}");
                }
            }
        }
    }
}

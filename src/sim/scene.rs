/// Scenes: start screen, play, pause, game over, victory.
///
/// `WorldState::phase` is the active scene. Every change goes through
/// `switch_phase`, which runs the exit hook of the old scene and the enter
/// hook of the new one. Data that outlives a scene sits in `Session`.

use super::step::restart_level;
use super::world::{Phase, WorldState};

/// Menu navigation for one tick, already decoded from keys and buttons.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum MenuNav {
    #[default]
    None,
    Up,
    Down,
    Confirm,
    Back,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SceneCommand {
    Stay,
    Quit,
}

/// Vertical list of choices. Navigation wraps at both ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Menu {
    pub items: &'static [&'static str],
    pub active: usize,
}

impl Menu {
    pub fn for_phase(phase: Phase) -> Menu {
        Menu { items: menu_items(phase), active: 0 }
    }

    pub fn up(&mut self) {
        if self.items.is_empty() { return; }
        self.active = (self.active + self.items.len() - 1) % self.items.len();
    }

    pub fn down(&mut self) {
        if self.items.is_empty() { return; }
        self.active = (self.active + 1) % self.items.len();
    }

    pub fn selected(&self) -> Option<&'static str> {
        self.items.get(self.active).copied()
    }
}

pub fn menu_items(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Start => &["Play", "Quit"],
        Phase::Running => &[],
        Phase::Paused => &["Continue", "Restart", "Quit"],
        Phase::Over => &["Try again", "Quit"],
        Phase::Won => &["Play again", "Quit"],
    }
}

// ── Transitions ──

pub fn switch_phase(world: &mut WorldState, to: Phase) {
    let from = world.phase;
    on_exit(world, from);
    world.phase = to;
    on_enter(world, to);
    log::info!("scene {:?} -> {:?}", from, to);
}

fn on_exit(world: &mut WorldState, from: Phase) {
    match from {
        Phase::Start | Phase::Over | Phase::Won => world.session.reset_needed = true,
        Phase::Running | Phase::Paused => {}
    }
}

fn on_enter(world: &mut WorldState, to: Phase) {
    world.menu = Menu::for_phase(to);
    if to == Phase::Running && world.session.reset_needed {
        restart_level(world);
    }
}

/// Menu handling for every scene except Running, plus the pause key.
pub fn update(world: &mut WorldState, nav: MenuNav, pause_pressed: bool) -> SceneCommand {
    match world.phase {
        Phase::Running => {
            if pause_pressed {
                switch_phase(world, Phase::Paused);
            }
            return SceneCommand::Stay;
        }
        Phase::Paused if pause_pressed || nav == MenuNav::Back => {
            switch_phase(world, Phase::Running);
            return SceneCommand::Stay;
        }
        _ => {}
    }

    match nav {
        MenuNav::Up => world.menu.up(),
        MenuNav::Down => world.menu.down(),
        MenuNav::Confirm => return confirm(world),
        MenuNav::Back | MenuNav::None => {}
    }
    SceneCommand::Stay
}

fn confirm(world: &mut WorldState) -> SceneCommand {
    match world.menu.selected() {
        Some("Quit") => return SceneCommand::Quit,
        Some("Restart") => {
            world.session.reset_needed = true;
            switch_phase(world, Phase::Running);
        }
        Some(_) => switch_phase(world, Phase::Running),
        None => {}
    }
    SceneCommand::Stay
}

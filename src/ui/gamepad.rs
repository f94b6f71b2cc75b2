/// Gamepad input via gilrs, folded into the same intent as the keyboard.
///
/// Button roles come from `[gamepad]` in config.toml; the D-pad and the
/// left stick always steer. Compiled without the "gamepad" feature this
/// tracker never reports anything.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::Intent;
use crate::sim::scene::MenuNav;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Face and shoulder buttons that can be bound to an action.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Held (continuous) and just_pressed (edge) for one input.
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Steering indices into the D-pad and stick arrays.
const UP: usize = 0;
const LEFT: usize = 1;
const DOWN: usize = 2;
const RIGHT: usize = 3;

struct ActionMap {
    jump: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    pause: Vec<Btn>,
}

impl ActionMap {
    fn from_config(cfg: &GamepadConfig) -> ActionMap {
        fn parse_list(names: &[String], fallback: &[Btn]) -> Vec<Btn> {
            let list: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if list.is_empty() { fallback.to_vec() } else { list }
        }
        ActionMap {
            jump: parse_list(&cfg.jump, &[Btn::A, Btn::B]),
            confirm: parse_list(&cfg.confirm, &[Btn::A, Btn::Start]),
            cancel: parse_list(&cfg.cancel, &[Btn::B]),
            pause: parse_list(&cfg.pause, &[Btn::Start]),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::from_config(cfg),
            connected,
        }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.derive_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dir = match gilrs_btn {
            Button::DPadUp => Some(UP),
            Button::DPadLeft => Some(LEFT),
            Button::DPadDown => Some(DOWN),
            Button::DPadRight => Some(RIGHT),
            _ => None,
        };
        if let Some(d) = dir {
            self.dpad[d].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    /// Digital directions from the analog stick (y axis points up).
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn derive_stick(&mut self) {
        self.stick[UP].set(self.stick_y > STICK_DEADZONE);
        self.stick[DOWN].set(self.stick_y < -STICK_DEADZONE);
        self.stick[LEFT].set(self.stick_x < -STICK_DEADZONE);
        self.stick[RIGHT].set(self.stick_x > STICK_DEADZONE);
    }

    // ── Action queries (config-driven) ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    fn dir_held(&self, d: usize) -> bool {
        self.dpad[d].held || self.stick[d].held
    }

    fn dir_pressed(&self, d: usize) -> bool {
        self.dpad[d].just_pressed || self.stick[d].just_pressed
    }

    pub fn intent(&self) -> Intent {
        Intent {
            up: self.dir_held(UP),
            left: self.dir_held(LEFT),
            down: self.dir_held(DOWN),
            right: self.dir_held(RIGHT),
            jump_held: self.any_held(&self.action_map.jump),
            jump_pressed: self.any_just_pressed(&self.action_map.jump),
        }
    }

    pub fn menu_nav(&self) -> MenuNav {
        if self.dir_pressed(UP) {
            MenuNav::Up
        } else if self.dir_pressed(DOWN) {
            MenuNav::Down
        } else if self.any_just_pressed(&self.action_map.confirm) {
            MenuNav::Confirm
        } else if self.any_just_pressed(&self.action_map.cancel) {
            MenuNav::Back
        } else {
            MenuNav::None
        }
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.pause)
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

/// Keyboard and gamepad combined: either device can act on any tick.
pub fn merge_intent(a: Intent, b: Intent) -> Intent {
    Intent {
        up: a.up || b.up,
        left: a.left || b.left,
        down: a.down || b.down,
        right: a.right || b.right,
        jump_held: a.jump_held || b.jump_held,
        jump_pressed: a.jump_pressed || b.jump_pressed,
    }
}

pub fn merge_nav(a: MenuNav, b: MenuNav) -> MenuNav {
    if a != MenuNav::None { a } else { b }
}

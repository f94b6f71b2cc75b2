/// Keyboard input: key state tracking and the climbing key map.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous climbing while a direction is held
///   - Edge-triggered jump, pause and menu keys (fire on the initial press)
///   - Jump distance control from how long the jump key stays held
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Intent;
use crate::sim::scene::MenuNav;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key map ──

pub const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('z'), KeyCode::Char('Z')];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('p'), KeyCode::Char('P')];
pub const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
pub const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc, KeyCode::Backspace];
pub const KEY_CHEAT_WATER: KeyCode = KeyCode::Char('m');
pub const KEY_DEBUG: KeyCode = KeyCode::F(3);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key);
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn record(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // rely on timeout-based expiry instead
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .is_some_and(|t| self.honor_release || t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Actions ──

    /// Climbing intent for this tick.
    pub fn intent(&self) -> Intent {
        Intent {
            up: self.any_held(KEYS_UP),
            left: self.any_held(KEYS_LEFT),
            down: self.any_held(KEYS_DOWN),
            right: self.any_held(KEYS_RIGHT),
            jump_held: self.any_held(KEYS_JUMP),
            jump_pressed: self.any_pressed(KEYS_JUMP),
        }
    }

    pub fn menu_nav(&self) -> MenuNav {
        if self.any_pressed(KEYS_UP) {
            MenuNav::Up
        } else if self.any_pressed(KEYS_DOWN) {
            MenuNav::Down
        } else if self.any_pressed(KEYS_CONFIRM) {
            MenuNav::Confirm
        } else if self.any_pressed(KEYS_BACK) {
            MenuNav::Back
        } else {
            MenuNav::None
        }
    }

    pub fn pause_pressed(&self) -> bool {
        self.any_pressed(KEYS_PAUSE)
    }
}

// ── One-shot latch ──

/// Edge presses seen on any frame, kept until the next simulation tick.
/// Frames run faster than ticks, so a press would otherwise be cleared by
/// the following `drain_events` before `step` ever saw it.
#[derive(Clone, Copy, Debug, Default)]
pub struct PendingPress {
    jump: bool,
}

impl PendingPress {
    pub fn latch(&mut self, intent: Intent) {
        self.jump |= intent.jump_pressed;
    }

    pub fn clear(&mut self) {
        self.jump = false;
    }

    /// Fold the latched presses into this tick's intent and reset.
    pub fn take(&mut self, mut intent: Intent) -> Intent {
        intent.jump_pressed |= std::mem::take(&mut self.jump);
        intent
    }
}

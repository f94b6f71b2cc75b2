/// Camera: follow, zoom and screen shake.
///
/// The camera stores the world point at the centre of the view, so zooming
/// keeps the climber in the middle. `(view_w, view_h)` are world units at
/// scale 1 and are set by the renderer from the terminal size.

use crate::domain::geom::Vec2;

/// Never zoom out further than this, whatever the tower height.
pub const MIN_SCALE_FLOOR: f64 = 0.18;

#[derive(Clone, Debug)]
pub struct Shaker {
    pub magnitude: f64,
    pub duration: u32,
    pub period: f64,
    elapsed: u32,
    active: bool,
}

impl Shaker {
    pub fn new(magnitude: f64, duration: u32, period: f64) -> Self {
        Shaker { magnitude, duration, period, elapsed: 0, active: false }
    }

    /// (Re)start the shake from full strength.
    pub fn start(&mut self, magnitude: f64, duration: u32) {
        self.magnitude = magnitude;
        self.duration = duration.max(1);
        self.elapsed = 0;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn update(&mut self) {
        if !self.active { return; }
        self.elapsed += 1;
        if self.elapsed >= self.duration {
            self.active = false;
        }
    }

    /// Exponential ease-out from `magnitude` to zero.
    pub fn current_magnitude(&self) -> f64 {
        if !self.active { return 0.0; }
        let t = self.elapsed as f64 / self.duration as f64;
        self.magnitude * 2f64.powf(-10.0 * t) * (1.0 - t)
    }

    /// Horizontal jitter in world units.
    pub fn offset(&self) -> Vec2 {
        let mag = self.current_magnitude();
        if mag == 0.0 { return Vec2::ZERO; }
        let phase = self.elapsed as f64 * std::f64::consts::TAU / self.period;
        Vec2::new(phase.sin() * mag / 2.0, 0.0)
    }
}

fn clamp_axis(target: f64, half: f64, extent: f64) -> f64 {
    if extent <= half * 2.0 {
        extent / 2.0
    } else {
        target.clamp(half, extent - half)
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    /// World point at the centre of the view
    pub x: f64,
    pub y: f64,
    pub view_w: f64,
    pub view_h: f64,
    pub scale: f64,
    pub shaker: Shaker,
}

impl Camera {
    pub fn new(shaker: Shaker) -> Self {
        Camera { x: 0.0, y: 0.0, view_w: 0.0, view_h: 0.0, scale: 1.0, shaker }
    }

    /// Centre on the target, clamped so the view never leaves the level.
    /// An axis that fits the view entirely stays centred on the level.
    pub fn follow(&mut self, target: Vec2, level: Vec2) {
        let half_w = self.view_w / self.scale / 2.0;
        let half_h = self.view_h / self.scale / 2.0;
        self.x = clamp_axis(target.x, half_w, level.x);
        self.y = clamp_axis(target.y, half_h, level.y);
    }

    pub fn zoom(&mut self, factor: f64, min_scale: f64) {
        self.scale = (self.scale * factor).max(min_scale);
    }

    pub fn reset_zoom(&mut self) {
        self.scale = 1.0;
    }

    /// Scale at which the whole tower fits the view.
    pub fn min_scale(&self, level_height: f64) -> f64 {
        if level_height <= 0.0 || self.view_h <= 0.0 {
            return 1.0;
        }
        (self.view_h / level_height).clamp(MIN_SCALE_FLOOR, 1.0)
    }

    /// Back to scale 1 with no shake, for a new attempt.
    pub fn reset(&mut self) {
        self.reset_zoom();
        self.shaker.stop();
    }

    pub fn shake(&mut self, magnitude: f64, duration: u32) {
        self.shaker.start(magnitude, duration);
    }

    pub fn update(&mut self) {
        self.shaker.update();
    }

    /// Top-left world corner of the view, shake included.
    pub fn origin(&self) -> Vec2 {
        let off = self.shaker.offset();
        Vec2::new(
            self.x - self.view_w / self.scale / 2.0 + off.x,
            self.y - self.view_h / self.scale / 2.0 + off.y,
        )
    }

    /// World point to fractional view units (0..view_w, 0..view_h).
    /// Returns None outside the visible area.
    pub fn world_to_view(&self, p: Vec2) -> Option<Vec2> {
        let o = self.origin();
        let v = Vec2::new((p.x - o.x) * self.scale, (p.y - o.y) * self.scale);
        if v.x >= 0.0 && v.x < self.view_w && v.y >= 0.0 && v.y < self.view_h {
            Some(v)
        } else {
            None
        }
    }

    /// Inverse of `world_to_view`, without bounds checks.
    pub fn view_to_world(&self, v: Vec2) -> Vec2 {
        let o = self.origin();
        Vec2::new(o.x + v.x / self.scale, o.y + v.y / self.scale)
    }
}

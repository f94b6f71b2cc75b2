/// Rising water under the tower.
///
/// The level is a world y coordinate; rising means it gets smaller.

use super::entity::{Player, PLAYER_SIZE};

/// Water starts this many player heights below the bottom of the map.
pub const START_DEPTH: f64 = 4.0;

#[derive(Clone, Debug)]
pub struct Water {
    pub level: f64,
    pub paused: bool,
    pub speed: f64,
    /// Multiplier applied to `speed` while the water drains away.
    pub recede: f64,
}

impl Water {
    pub fn new(level_height: f64, speed: f64, recede: f64) -> Self {
        Water {
            level: level_height + START_DEPTH * PLAYER_SIZE.y,
            paused: false,
            speed,
            recede,
        }
    }

    /// One tick. `rising == false` during the win sequence.
    pub fn update(&mut self, rising: bool) {
        if self.paused { return; }
        if rising {
            self.level -= self.speed;
        } else {
            self.level += self.speed * self.recede;
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// The water has reached the upper quarter of the sprite.
    pub fn covers(&self, player: &Player) -> bool {
        self.level < player.pos.y - PLAYER_SIZE.y / 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::Vec2;

    #[test]
    fn starts_below_the_map_and_rises() {
        let mut w = Water::new(960.0, 0.35, 3.0);
        assert_eq!(w.level, 960.0 + 64.0);
        for _ in 0..100 { w.update(true); }
        assert!((w.level - (1024.0 - 35.0)).abs() < 1e-6);
    }

    #[test]
    fn paused_water_holds() {
        let mut w = Water::new(100.0, 0.35, 3.0);
        assert!(w.toggle_pause());
        w.update(true);
        w.update(false);
        assert_eq!(w.level, 164.0);
        assert!(!w.toggle_pause());
    }

    #[test]
    fn recedes_faster_than_it_rises() {
        let mut w = Water::new(100.0, 0.5, 3.0);
        w.update(false);
        assert!((w.level - 165.5).abs() < 1e-9);
    }

    #[test]
    fn covers_once_past_a_quarter_height() {
        let p = Player::new(Vec2::new(0.0, 100.0));
        let mut w = Water::new(0.0, 0.0, 3.0);
        w.level = 96.0;
        assert!(!w.covers(&p));
        w.level = 95.9;
        assert!(w.covers(&p));
    }
}

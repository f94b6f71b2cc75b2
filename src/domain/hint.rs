/// Tutorial overlays that show up while the climber passes their band.

use super::anim::{SpriteAnimation, SpriteSheet};
use super::geom::Vec2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HintState {
    Hidden,
    Visible,
    Fading,
    /// Passed for good this attempt.
    Faded,
}

const FADE_STEP: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct ControlHint {
    pub pos: Vec2,
    /// Tag index in the controls sheet.
    pub tag: usize,
    /// Bottom of the band: shown once the climber is at or above it.
    pub from: f64,
    /// Top of the band: passing it fades the hint out.
    pub to: f64,
    pub state: HintState,
    pub alpha: f64,
    pub anim: SpriteAnimation,
}

impl ControlHint {
    /// `y`/`height` are the map entity's box.
    pub fn new(pos: Vec2, height: f64, tag: usize) -> Self {
        ControlHint {
            pos,
            tag,
            from: pos.y + height,
            to: pos.y,
            state: HintState::Hidden,
            alpha: 1.0,
            anim: SpriteAnimation::default(),
        }
    }

    pub fn reset(&mut self) {
        self.state = HintState::Hidden;
        self.alpha = 1.0;
        self.anim = SpriteAnimation::default();
    }

    pub fn is_drawn(&self) -> bool {
        matches!(self.state, HintState::Visible | HintState::Fading)
    }

    pub fn update(&mut self, player_y: f64, sheet: &SpriteSheet) {
        match self.state {
            HintState::Hidden => {
                if player_y <= self.from {
                    self.state = HintState::Visible;
                    self.alpha = 1.0;
                }
            }
            HintState::Visible => {
                if player_y < self.to || player_y > self.from {
                    self.state = HintState::Fading;
                }
            }
            HintState::Fading => {
                self.alpha -= FADE_STEP;
                if self.alpha <= 0.0 {
                    self.alpha = 0.0;
                    // fell back below the band: it may show again
                    self.state = if player_y > self.from { HintState::Hidden } else { HintState::Faded };
                }
            }
            HintState::Faded => {}
        }
        if self.is_drawn() {
            self.anim.update(sheet, self.tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SpriteSheet {
        SpriteSheet::from_json(
            "Controls",
            r#"{"frames": [{"glyph": "^"}, {"glyph": "v"}],
                "meta": {"frameTags": [{"name": "Arrows", "from": 0, "to": 1}]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn shows_inside_the_band_then_fades_out_above() {
        let s = sheet();
        let mut h = ControlHint::new(Vec2::new(16.0, 100.0), 50.0, 0);
        assert_eq!(h.from, 150.0);
        assert_eq!(h.to, 100.0);

        h.update(200.0, &s);
        assert_eq!(h.state, HintState::Hidden);
        h.update(150.0, &s);
        assert_eq!(h.state, HintState::Visible);
        h.update(120.0, &s);
        assert_eq!(h.state, HintState::Visible);
        h.update(99.0, &s);
        assert_eq!(h.state, HintState::Fading);

        for _ in 0..12 { h.update(90.0, &s); }
        assert_eq!(h.state, HintState::Faded);
        h.update(120.0, &s);
        assert_eq!(h.state, HintState::Faded);
    }

    #[test]
    fn dropping_below_the_band_lets_it_return() {
        let s = sheet();
        let mut h = ControlHint::new(Vec2::new(0.0, 100.0), 50.0, 0);
        h.update(140.0, &s);
        h.update(151.0, &s);
        assert_eq!(h.state, HintState::Fading);
        for _ in 0..12 { h.update(300.0, &s); }
        assert_eq!(h.state, HintState::Hidden);
        h.update(149.0, &s);
        assert_eq!(h.state, HintState::Visible);
        assert_eq!(h.alpha, 1.0);
    }
}

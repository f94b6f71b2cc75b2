/// The climber: facing, input intent, locomotion state and its animation.
///
/// Locomotion is one sum type; each variant carries only the animation
/// phases that are valid for it, so the animation tag is a pure function
/// of the state and the two can never disagree.

use super::anim::{FrameTag, SpriteSheet};
use super::geom::{Shape, Vec2};
use crate::error::LoadError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Clockwise quarter turns from "up", used for sprite rotation.
    pub fn quarter_turns(self) -> u8 {
        self as u8
    }

    /// Unit step along the facing axis.
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
        }
    }
}

/// Per-tick input snapshot. Directions are level-triggered,
/// `jump_pressed` is edge-triggered (true only on the tick of the press).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
    pub jump_held: bool,
    pub jump_pressed: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpPhase { Start, Loop, EndWall, EndFloor, EndMantle }

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FallPhase { Start, Loop, EndWall, EndFloor }

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlipPhase { Start, Loop, End }

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Locomotion {
    Idle,
    Climbing,
    /// Recovering after hitting a wall; input or the end of the
    /// stand animation returns to idle.
    Standing,
    Jumping(JumpPhase),
    Falling(FallPhase),
    Slipping(SlipPhase),
    Dying,
    Dead,
    Winning,
    Won,
}

/// One entry per frame tag of the player sprite sheet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PlayerAnim {
    Idle,
    ClimbUp,
    JumpStart,
    JumpLoop,
    JumpEndWall,
    JumpEndFloor,
    JumpEndMantle,
    FallStart,
    FallLoop,
    FallEndWall,
    FallEndFloor,
    SlipStart,
    SlipLoop,
    SlipEnd,
    Stand,
    SwitchToTopView,
}

impl PlayerAnim {
    pub const ALL: [PlayerAnim; 16] = [
        PlayerAnim::Idle,
        PlayerAnim::ClimbUp,
        PlayerAnim::JumpStart,
        PlayerAnim::JumpLoop,
        PlayerAnim::JumpEndWall,
        PlayerAnim::JumpEndFloor,
        PlayerAnim::JumpEndMantle,
        PlayerAnim::FallStart,
        PlayerAnim::FallLoop,
        PlayerAnim::FallEndWall,
        PlayerAnim::FallEndFloor,
        PlayerAnim::SlipStart,
        PlayerAnim::SlipLoop,
        PlayerAnim::SlipEnd,
        PlayerAnim::Stand,
        PlayerAnim::SwitchToTopView,
    ];

    /// Frame tag name in the sprite sheet.
    pub fn tag_name(self) -> &'static str {
        match self {
            PlayerAnim::Idle => "Idle",
            PlayerAnim::ClimbUp => "Climbup",
            PlayerAnim::JumpStart => "Jumpstart",
            PlayerAnim::JumpLoop => "Jumploop",
            PlayerAnim::JumpEndWall => "Jumpendwall",
            PlayerAnim::JumpEndFloor => "Jumpendfloor",
            PlayerAnim::JumpEndMantle => "Jumpendmantle",
            PlayerAnim::FallStart => "Fallstart",
            PlayerAnim::FallLoop => "Fallloop",
            PlayerAnim::FallEndWall => "Fallendwall",
            PlayerAnim::FallEndFloor => "Fallendfloor",
            PlayerAnim::SlipStart => "Slipstart",
            PlayerAnim::SlipLoop => "Sliploop",
            PlayerAnim::SlipEnd => "Slipend",
            PlayerAnim::Stand => "Stand",
            PlayerAnim::SwitchToTopView => "Switchtotopview",
        }
    }
}

/// How worried the status light should look.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Danger {
    Good,
    Warn,
    Bad,
}

impl Locomotion {
    pub fn anim(self) -> PlayerAnim {
        match self {
            Locomotion::Idle => PlayerAnim::Idle,
            Locomotion::Climbing => PlayerAnim::ClimbUp,
            Locomotion::Standing => PlayerAnim::Stand,
            Locomotion::Jumping(p) => match p {
                JumpPhase::Start => PlayerAnim::JumpStart,
                JumpPhase::Loop => PlayerAnim::JumpLoop,
                JumpPhase::EndWall => PlayerAnim::JumpEndWall,
                JumpPhase::EndFloor => PlayerAnim::JumpEndFloor,
                JumpPhase::EndMantle => PlayerAnim::JumpEndMantle,
            },
            Locomotion::Falling(p) => match p {
                FallPhase::Start => PlayerAnim::FallStart,
                FallPhase::Loop => PlayerAnim::FallLoop,
                FallPhase::EndWall => PlayerAnim::FallEndWall,
                FallPhase::EndFloor => PlayerAnim::FallEndFloor,
            },
            Locomotion::Slipping(p) => match p {
                SlipPhase::Start => PlayerAnim::SlipStart,
                SlipPhase::Loop => PlayerAnim::SlipLoop,
                SlipPhase::End => PlayerAnim::SlipEnd,
            },
            Locomotion::Dying | Locomotion::Dead => PlayerAnim::FallLoop,
            Locomotion::Winning | Locomotion::Won => PlayerAnim::SwitchToTopView,
        }
    }

    pub fn is_jumping(self) -> bool { matches!(self, Locomotion::Jumping(_)) }
    pub fn is_falling(self) -> bool { matches!(self, Locomotion::Falling(_)) }
    pub fn is_slipping(self) -> bool { matches!(self, Locomotion::Slipping(_)) }

    /// Clinging to the surface and steering by input.
    pub fn is_grounded(self) -> bool {
        matches!(self, Locomotion::Idle | Locomotion::Climbing | Locomotion::Standing)
    }

    /// Taken over by the scene: water or finish line.
    pub fn is_scripted(self) -> bool {
        matches!(self, Locomotion::Dying | Locomotion::Dead | Locomotion::Winning | Locomotion::Won)
    }

    pub fn danger(self) -> Danger {
        match self.anim() {
            PlayerAnim::FallStart
            | PlayerAnim::FallLoop
            | PlayerAnim::FallEndWall
            | PlayerAnim::FallEndFloor
            | PlayerAnim::JumpEndWall => Danger::Bad,
            PlayerAnim::SlipStart | PlayerAnim::SlipLoop | PlayerAnim::SlipEnd => Danger::Warn,
            _ => Danger::Good,
        }
    }

    /// State reached when the current animation plays its last frame.
    pub fn after_animation(self) -> Locomotion {
        match self {
            Locomotion::Jumping(JumpPhase::Start) => Locomotion::Jumping(JumpPhase::Loop),
            Locomotion::Jumping(JumpPhase::EndWall) => Locomotion::Standing,
            Locomotion::Jumping(JumpPhase::EndFloor | JumpPhase::EndMantle) => Locomotion::Idle,
            Locomotion::Falling(FallPhase::Start) => Locomotion::Falling(FallPhase::Loop),
            Locomotion::Falling(FallPhase::EndWall) => Locomotion::Standing,
            Locomotion::Falling(FallPhase::EndFloor) => Locomotion::Idle,
            Locomotion::Slipping(SlipPhase::Start) => Locomotion::Slipping(SlipPhase::Loop),
            Locomotion::Slipping(SlipPhase::End) => Locomotion::Idle,
            Locomotion::Standing => Locomotion::Idle,
            other => other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Locomotion::Idle => "idle",
            Locomotion::Climbing => "climbing",
            Locomotion::Standing => "standing",
            Locomotion::Jumping(_) => "jumping",
            Locomotion::Falling(_) => "falling",
            Locomotion::Slipping(_) => "slipping",
            Locomotion::Dying => "dying",
            Locomotion::Dead => "dead",
            Locomotion::Winning => "winning",
            Locomotion::Won => "won",
        }
    }
}

/// Frame ranges for every `PlayerAnim`, resolved once at load time.
#[derive(Clone, Debug)]
pub struct AnimTable {
    tags: Vec<FrameTag>,
}

impl AnimTable {
    /// Fails if any animation state has no frame tag in the sheet.
    pub fn from_sheet(sheet: &SpriteSheet) -> Result<AnimTable, LoadError> {
        let tags = PlayerAnim::ALL
            .iter()
            .map(|a| sheet.tag_index(a.tag_name()).map(|i| sheet.tag(i).clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AnimTable { tags })
    }

    pub fn get(&self, anim: PlayerAnim) -> &FrameTag {
        &self.tags[anim as usize]
    }
}

/// Visual box of the sprite.
pub const PLAYER_SIZE: Vec2 = Vec2::new(16.0, 16.0);
/// Collision box, anchored at the object origin.
pub const PLAYER_SHAPE: Vec2 = Vec2::new(8.0, 8.0);

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Vec2,
    pub facing: Direction,
    pub locomotion: Locomotion,
    pub speed: Vec2,
    pub jump_from: Vec2,
    pub frame: usize,
    pub tick: u32,
    /// Animation currently on screen; differs from `locomotion.anim()`
    /// for the rest of the tick in which the state changed.
    pub shown: PlayerAnim,
    pub rotation: f64,
    pub on_tile: Option<super::tile::Terrain>,
}

impl Player {
    pub fn new(start: Vec2) -> Self {
        Player {
            pos: start,
            facing: Direction::Up,
            locomotion: Locomotion::Idle,
            speed: Vec2::ZERO,
            jump_from: start,
            frame: 0,
            tick: 0,
            shown: PlayerAnim::Idle,
            rotation: 0.0,
            on_tile: None,
        }
    }

    /// New attempt: back to the start, idle, at rest.
    pub fn reset(&mut self, start: Vec2) {
        *self = Player::new(start);
    }

    pub fn shape(&self) -> Shape {
        Shape::rect(self.pos.x, self.pos.y, PLAYER_SHAPE.x, PLAYER_SHAPE.y)
    }

    pub fn anim(&self) -> PlayerAnim {
        self.locomotion.anim()
    }

    pub fn jump_distance(&self) -> f64 {
        (self.pos - self.jump_from).length()
    }
}

/// The step function: advances the world by one tick.
///
/// Processing order for the climber (`update_player`):
///   1. Tile-at-rest detection
///   2. Hazard trigger (chasm → fall, slippery → slip)
///   3. State-derived velocity, including the jump distance gate
///   4. Jump trigger (edge-triggered)
///   5. Climb input (grounded states only)
///   6. Horizontal axis resolution
///   7. Vertical axis resolution
///   8. Animation, and the state changes tied to animation completion
///
/// Then, for the world (`step`): camera shake, hints, height tracking,
/// finish line, camera follow/zoom, water, and the drown/win endings.
///
/// Collision queries use the spatial index with a terrain filter.
/// Terrain = what the obstacle IS.  Locomotion = how the climber reacts.

use crate::config::PhysicsConfig;
use crate::domain::anim::advance;
use crate::domain::entity::{
    AnimTable, Direction, FallPhase, Intent, JumpPhase, Locomotion, Player, SlipPhase, PLAYER_SHAPE,
};
use crate::domain::geom::{Contact, Vec2};
use crate::domain::space::{Obstacle, SpatialIndex};
use crate::domain::tile::{TagSet, Terrain};
use crate::domain::water::Water;
use super::event::GameEvent;
use super::save::{score_from_y, MAX_SCORE};
use super::scene::switch_phase;
use super::world::{Phase, WorldState};

/// Fade alpha at which the drowning sequence hands over to the game over screen.
const DEATH_FADE: u8 = 128;
/// Fade alpha at which the victory sequence hands over to the won screen.
const WIN_FADE: u8 = 200;
/// Sinking speed while drowning, world units per tick.
const SINK_SPEED: f64 = 0.5;
const SINK_SPIN: f64 = 0.05;
/// Per-tick zoom factor of the victory fly-out.
const WIN_ZOOM: f64 = 0.99;
/// How far ahead a finished jump looks for a wall to mantle against.
const MANTLE_PROBE: f64 = 1.0;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, intent: Intent) -> Vec<GameEvent> {
    if world.phase != Phase::Running { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    resolve_player(world, intent, &mut events);
    resolve_camera_events(world, &events);
    resolve_hints(world);
    resolve_height(world);
    resolve_finish(world, &mut events);
    resolve_camera(world);

    let rising = !matches!(world.player.locomotion, Locomotion::Winning | Locomotion::Won);
    world.water.update(rising);

    resolve_endings(world, &mut events);
    events
}

fn resolve_player(world: &mut WorldState, intent: Intent, events: &mut Vec<GameEvent>) {
    let p = &mut world.player;
    match p.locomotion {
        Locomotion::Dying => {
            p.pos.y += SINK_SPEED;
            p.rotation += SINK_SPIN;
            p.tick = p.tick.wrapping_add(1);
            animate(p, &world.anims);
        }
        Locomotion::Winning => {
            p.tick = p.tick.wrapping_add(1);
            animate(p, &world.anims);
        }
        Locomotion::Dead | Locomotion::Won => {}
        _ => {
            world.session.round_ticks += 1;
            update_player(p, &world.space, intent, &world.physics, &world.anims, events);
        }
    }
}

fn resolve_camera_events(world: &mut WorldState, events: &[GameEvent]) {
    for ev in events {
        if let GameEvent::CameraShake { magnitude, duration } = *ev {
            world.session.camera.shake(magnitude, duration);
        }
    }
}

fn resolve_hints(world: &mut WorldState) {
    let y = world.player.pos.y;
    for hint in world.hints.iter_mut() {
        hint.update(y, &world.controls);
    }
}

fn resolve_height(world: &mut WorldState) {
    if world.player.locomotion.is_scripted() { return; }
    let metres = score_from_y(world.player.pos.y, world.session.start_y);
    world.session.last_highest = world.session.last_highest.max(metres);
}

fn resolve_finish(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player.locomotion.is_scripted() { return; }
    let finish = TagSet::of(&[Terrain::Finish]);
    if world.space.query(&world.player.shape(), 0.0, 0.0, finish).is_empty() { return; }

    world.player.locomotion = Locomotion::Winning;
    let ticks = world.session.round_ticks;
    world.session.last_round_ticks = ticks;
    events.push(GameEvent::Finished { ticks });
    if world.session.stats.offer_time(ticks) {
        events.push(GameEvent::NewRecord);
    }
    world.min_scale = world.session.camera.min_scale(world.level.height);
    log::info!("finished in {} ticks", ticks);
}

fn resolve_camera(world: &mut WorldState) {
    let cam = &mut world.session.camera;
    let centre = world.player.pos + Vec2::new(PLAYER_SHAPE.x / 2.0, PLAYER_SHAPE.y / 2.0);
    if world.player.locomotion == Locomotion::Winning && cam.scale > world.min_scale {
        cam.zoom(WIN_ZOOM, world.min_scale);
    }
    cam.follow(centre, world.level.size());
    cam.update();
}

fn resolve_endings(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    match world.player.locomotion {
        Locomotion::Dying => {
            if world.fade.update() >= DEATH_FADE {
                world.player.locomotion = Locomotion::Dead;
                events.push(GameEvent::Died);
                switch_phase(world, Phase::Over);
            }
        }
        Locomotion::Winning => {
            if world.session.camera.scale > world.min_scale { return; }
            if world.fade.update() >= WIN_FADE {
                world.player.locomotion = Locomotion::Won;
                world.session.last_highest = MAX_SCORE;
                if world.session.stats.offer_height(MAX_SCORE) {
                    events.push(GameEvent::NewRecord);
                }
                events.push(GameEvent::Won);
                switch_phase(world, Phase::Won);
            }
        }
        Locomotion::Dead | Locomotion::Won => {}
        loco => {
            if !world.water.covers(&world.player) { return; }
            world.player.locomotion = Locomotion::Dying;
            events.push(GameEvent::Drowned { falling: loco.is_falling() });
            if world.session.stats.offer_height(world.session.last_highest) {
                events.push(GameEvent::NewRecord);
            }
            log::info!("drowned at {} m", world.session.last_highest);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Climber: one tick of the movement state machine
// ══════════════════════════════════════════════════════════════

pub fn update_player(
    p: &mut Player,
    space: &SpatialIndex,
    intent: Intent,
    tune: &PhysicsConfig,
    anims: &AnimTable,
    events: &mut Vec<GameEvent>,
) {
    p.tick = p.tick.wrapping_add(1);
    p.on_tile = detect_tile(p, space);
    check_hazards(p, space, events);

    let mut d = state_velocity(p, space, intent, tune);
    if try_jump(p, intent, events) {
        d = Vec2::ZERO;
    } else if p.locomotion.is_grounded() {
        d = climb_velocity(p, intent, tune);
    }
    p.speed = d;

    move_horizontal(p, space, d.x, tune, events);
    move_vertical(p, space, d.y, tune, events);
    animate(p, anims);
}

/// First non-decoration terrain under the climber.
fn detect_tile(p: &Player, space: &SpatialIndex) -> Option<Terrain> {
    space.query(&p.shape(), 0.0, 0.0, TagSet::EMPTY)
        .into_iter()
        .filter_map(|(o, _)| o.primary())
        .find(|t| !t.is_decoration())
}

/// Chasm starts a fall, slippery starts a slide. Chasm wins when both touch.
/// A jump in flight passes over both; a grounded jump phase still drops
/// into a chasm but never starts a slide.
fn check_hazards(p: &mut Player, space: &SpatialIndex, events: &mut Vec<GameEvent>) {
    let loco = p.locomotion;
    if loco.is_falling() || loco.is_slipping() || loco.is_scripted() { return; }
    if loco == Locomotion::Jumping(JumpPhase::Loop) { return; }

    let shape = p.shape();
    let filter = TagSet::of(&[Terrain::Chasm, Terrain::Slippery]);
    let mut found: Option<Terrain> = None;
    for o in space.candidates(&shape, 0.0, 0.0, filter) {
        if shape.intersect(0.0, 0.0, &o.shape).is_none() && !shape.inside_of(&o.shape) {
            continue;
        }
        if o.has(Terrain::Chasm) {
            found = Some(Terrain::Chasm);
            break;
        }
        if !loco.is_jumping() {
            found = Some(Terrain::Slippery);
        }
    }

    match found {
        Some(Terrain::Chasm) => {
            p.locomotion = Locomotion::Falling(FallPhase::Start);
            p.facing = Direction::Up;
            events.push(GameEvent::FallStarted);
        }
        Some(_) => {
            p.locomotion = Locomotion::Slipping(SlipPhase::Start);
            p.facing = Direction::Up;
            events.push(GameEvent::SlipStarted);
        }
        None => {}
    }
}

/// Velocity owed to the current state. Also runs the jump distance gate:
/// the loop continues while (held or short of the minimum) and not past
/// the maximum, measured as a straight line from the jump origin.
fn state_velocity(p: &mut Player, space: &SpatialIndex, intent: Intent, tune: &PhysicsConfig) -> Vec2 {
    match p.locomotion {
        Locomotion::Jumping(JumpPhase::Loop) => {
            let dist = p.jump_distance();
            let keep = (intent.jump_held || dist < tune.min_jump_dist) && dist < tune.max_jump_dist;
            if !keep {
                p.locomotion = if against_wall(p, space) {
                    Locomotion::Jumping(JumpPhase::EndMantle)
                } else {
                    Locomotion::Jumping(JumpPhase::EndFloor)
                };
                return Vec2::ZERO;
            }
            let u = p.facing.unit();
            Vec2::new(u.x * tune.jump_speed, u.y * tune.jump_speed)
        }
        Locomotion::Falling(FallPhase::Loop) => Vec2::new(0.0, tune.fall_speed),
        Locomotion::Slipping(SlipPhase::Loop) => Vec2::new(0.0, tune.slip_speed),
        Locomotion::Slipping(_) => Vec2::new(0.0, tune.slip_edge_speed),
        _ => Vec2::ZERO,
    }
}

fn against_wall(p: &Player, space: &SpatialIndex) -> bool {
    let u = p.facing.unit();
    let walls = TagSet::of(&[Terrain::Wall]);
    !space.query(&p.shape(), u.x * MANTLE_PROBE, u.y * MANTLE_PROBE, walls).is_empty()
}

/// Start a jump on a fresh press. Allowed from any state except a fall,
/// and mid-jump only once the previous one is landing.
fn try_jump(p: &mut Player, intent: Intent, events: &mut Vec<GameEvent>) -> bool {
    if !intent.jump_pressed { return false; }
    let loco = p.locomotion;
    if loco.is_falling() || loco.is_scripted() { return false; }
    if loco.is_jumping() && loco != Locomotion::Jumping(JumpPhase::EndFloor) { return false; }

    p.locomotion = Locomotion::Jumping(JumpPhase::Start);
    p.jump_from = p.pos;
    events.push(GameEvent::JumpStarted);
    true
}

/// Directional input for grounded states. Diagonals are not combined:
/// directions are checked up, left, down, right and the last pressed wins.
fn climb_velocity(p: &mut Player, intent: Intent, tune: &PhysicsConfig) -> Vec2 {
    let mut pick: Option<Direction> = None;
    for (pressed, dir) in [
        (intent.up, Direction::Up),
        (intent.left, Direction::Left),
        (intent.down, Direction::Down),
        (intent.right, Direction::Right),
    ] {
        if pressed { pick = Some(dir); }
    }

    match pick {
        Some(dir) => {
            p.facing = dir;
            p.locomotion = Locomotion::Climbing;
            let u = dir.unit();
            Vec2::new(u.x * tune.climb_speed, u.y * tune.climb_speed)
        }
        None => {
            if p.locomotion != Locomotion::Standing {
                p.locomotion = Locomotion::Idle;
            }
            Vec2::ZERO
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Axis resolution
// ══════════════════════════════════════════════════════════════

fn wall_hit(p: &mut Player, tune: &PhysicsConfig, events: &mut Vec<GameEvent>) {
    p.locomotion = Locomotion::Jumping(JumpPhase::EndWall);
    events.push(GameEvent::CameraShake {
        magnitude: tune.shake_magnitude,
        duration: tune.shake_duration,
    });
}

fn move_horizontal(p: &mut Player, space: &SpatialIndex, dx: f64, tune: &PhysicsConfig, events: &mut Vec<GameEvent>) {
    if dx == 0.0 { return; }
    let mut filter = TagSet::of(&[Terrain::Wall]);
    if p.locomotion.is_grounded() {
        filter = filter.with(Terrain::Chasm);
    }

    let hits = space.query(&p.shape(), dx, 0.0, filter);
    if hits.is_empty() {
        p.pos.x += dx;
        return;
    }

    let jumping = p.locomotion == Locomotion::Jumping(JumpPhase::Loop);
    let walls: Vec<&Obstacle> = hits.iter()
        .map(|(o, _)| *o)
        .filter(|o| o.has(Terrain::Wall))
        .collect();
    if jumping && !walls.is_empty() {
        p.pos.x = flush_x(p, dx, &walls);
        wall_hit(p, tune, events);
    }
}

fn move_vertical(p: &mut Player, space: &SpatialIndex, dy: f64, tune: &PhysicsConfig, events: &mut Vec<GameEvent>) {
    if dy == 0.0 { return; }
    let filter = TagSet::of(&[Terrain::Wall, Terrain::Climbable, Terrain::Chasm]);
    let hits = space.query(&p.shape(), 0.0, dy, filter);

    let walls: Vec<&Obstacle> = hits.iter()
        .map(|(o, _)| *o)
        .filter(|o| o.has(Terrain::Wall))
        .collect();
    if !walls.is_empty() {
        match p.locomotion {
            Locomotion::Falling(FallPhase::Loop) => {
                p.locomotion = Locomotion::Falling(FallPhase::EndWall);
            }
            Locomotion::Slipping(_) => p.locomotion = Locomotion::Slipping(SlipPhase::End),
            Locomotion::Jumping(JumpPhase::Loop) => {
                p.pos.y = flush_y(p, dy, &walls);
                wall_hit(p, tune, events);
            }
            _ => {}
        }
        return;
    }

    let grounded = p.locomotion.is_grounded();
    if grounded && dy < 0.0 && hits.iter().any(|(o, _)| o.has(Terrain::Chasm)) {
        return;
    }

    let landing_state = match p.locomotion {
        Locomotion::Falling(FallPhase::Loop) => Some(Locomotion::Falling(FallPhase::EndFloor)),
        Locomotion::Slipping(SlipPhase::Loop) => Some(Locomotion::Slipping(SlipPhase::End)),
        _ => None,
    };
    if let Some(next) = landing_state {
        if let Some(y) = landing(p, space, dy, &hits) {
            p.pos.y = y;
            p.locomotion = next;
            events.push(GameEvent::Landed);
            return;
        }
    }
    p.pos.y += dy;
}

/// Climbable obstacles below a descending climber that catch it this tick.
///
/// A catch needs an upward MTV or the climber's bottom crossing the tile's
/// top edge this tick, and at least half the climber over the tile.
/// The climber is moved fully into the catching tile; the catch is refused
/// if that spot still touches a hazard or a wall.
fn landing(p: &Player, space: &SpatialIndex, dy: f64, hits: &[(&Obstacle, Contact)]) -> Option<f64> {
    if dy <= 0.0 { return None; }
    let me = p.shape().bounds();
    let bottom = me.bottom();

    let top = hits.iter()
        .filter(|(o, _)| o.has(Terrain::Climbable))
        .filter(|(o, c)| {
            let b = o.shape.bounds();
            let overlap = me.right().min(b.right()) - me.x.max(b.x);
            let crossing = bottom <= b.y && bottom + dy > b.y;
            overlap >= me.w / 2.0 && (c.mtv.y < 0.0 || crossing)
        })
        .map(|(o, _)| o.shape.bounds().y)
        .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.min(y))))?;

    let snap = top - p.pos.y;
    let blockers = TagSet::of(&[Terrain::Chasm, Terrain::Slippery, Terrain::Wall]);
    if space.query(&p.shape(), 0.0, snap, blockers).is_empty() {
        Some(top)
    } else {
        None
    }
}

/// x that leaves the climber touching the nearest wall in the direction of
/// travel, never behind the start or beyond the full step.
fn flush_x(p: &Player, dx: f64, walls: &[&Obstacle]) -> f64 {
    let w = PLAYER_SHAPE.x;
    let x = p.pos.x;
    if dx > 0.0 {
        let stop = walls.iter().map(|o| o.shape.bounds().x - w).fold(x + dx, f64::min);
        stop.clamp(x, x + dx)
    } else {
        let stop = walls.iter().map(|o| o.shape.bounds().right()).fold(x + dx, f64::max);
        stop.clamp(x + dx, x)
    }
}

fn flush_y(p: &Player, dy: f64, walls: &[&Obstacle]) -> f64 {
    let h = PLAYER_SHAPE.y;
    let y = p.pos.y;
    if dy > 0.0 {
        let stop = walls.iter().map(|o| o.shape.bounds().y - h).fold(y + dy, f64::min);
        stop.clamp(y, y + dy)
    } else {
        let stop = walls.iter().map(|o| o.shape.bounds().bottom()).fold(y + dy, f64::max);
        stop.clamp(y + dy, y)
    }
}

// ══════════════════════════════════════════════════════════════
// Animation
// ══════════════════════════════════════════════════════════════

/// Advance the frame cursor. A state whose animation showed its last frame
/// moves on first; a new animation starts at its first frame this tick.
fn animate(p: &mut Player, anims: &AnimTable) {
    let current = p.locomotion.anim();
    if p.shown == current && p.frame == anims.get(current).to {
        p.locomotion = p.locomotion.after_animation();
    }

    let anim = p.locomotion.anim();
    let tag = anims.get(anim);
    if anim != p.shown {
        p.shown = anim;
        p.frame = tag.from;
        return;
    }
    // the top view holds on its last frame
    if p.locomotion == Locomotion::Winning && p.frame == tag.to {
        return;
    }
    p.frame = advance(p.frame, p.tick, tag);
}

// ══════════════════════════════════════════════════════════════
// Restart
// ══════════════════════════════════════════════════════════════

pub fn restart_level(world: &mut WorldState) {
    let start = world.level.start;
    world.player.reset(start);
    world.water = Water::new(world.level.height, world.physics.water_speed, world.physics.water_recede_factor);
    for hint in world.hints.iter_mut() {
        hint.reset();
    }
    world.fade.reset();
    world.min_scale = 1.0;

    let s = &mut world.session;
    s.round_ticks = 0;
    s.last_highest = 0;
    s.reset_needed = false;
    s.camera.reset();
    s.camera.follow(start, world.level.size());

    world.message.clear();
    world.message_timer = 0;
    log::info!("attempt started on {}", world.level.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::config::GameConfig;
    use crate::domain::anim::SpriteSheet;
    use crate::domain::entity::PlayerAnim;
    use crate::domain::geom::Shape;
    use crate::domain::space::Layer;
    use crate::sim::save::Stats;

    const TILE: f64 = 16.0;

    /// Helper: build a spatial index from a string diagram, one char per tile.
    /// Legend:  '.'=Climbable  '#'=Wall  'v'=Chasm  '~'=Slippery  'F'=Finish
    fn space_from(rows: &[&str]) -> SpatialIndex {
        let mut space = SpatialIndex::new(TILE);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let t = match ch {
                    '.' => Terrain::Climbable,
                    '#' => Terrain::Wall,
                    'v' => Terrain::Chasm,
                    '~' => Terrain::Slippery,
                    'F' => Terrain::Finish,
                    _ => continue,
                };
                let layer = match t {
                    Terrain::Wall => Layer::Walls,
                    Terrain::Finish => Layer::Entities,
                    _ => Layer::Floor,
                };
                space.insert(
                    Shape::rect(x as f64 * TILE, y as f64 * TILE, TILE, TILE),
                    TagSet::of(&[t]),
                    layer,
                );
            }
        }
        space
    }

    fn anims() -> AnimTable {
        let sheet = SpriteSheet::from_json("Nanobot", include_str!("../../assets/nanobot.json")).unwrap();
        AnimTable::from_sheet(&sheet).unwrap()
    }

    struct Rig {
        space: SpatialIndex,
        anims: AnimTable,
        tune: PhysicsConfig,
        player: Player,
    }

    impl Rig {
        fn new(rows: &[&str], x: f64, y: f64) -> Rig {
            Rig {
                space: space_from(rows),
                anims: anims(),
                tune: PhysicsConfig::default(),
                player: Player::new(Vec2::new(x, y)),
            }
        }

        fn set(&mut self, loco: Locomotion) {
            self.player.locomotion = loco;
            self.player.shown = loco.anim();
            self.player.frame = self.anims.get(loco.anim()).from;
        }

        fn tick(&mut self, intent: Intent) -> Vec<GameEvent> {
            let mut events = vec![];
            update_player(&mut self.player, &self.space, intent, &self.tune, &self.anims, &mut events);
            events
        }

        fn touches_wall(&self) -> bool {
            !self.space.query(&self.player.shape(), 0.0, 0.0, TagSet::of(&[Terrain::Wall])).is_empty()
        }
    }

    const OPEN: &[&str] = &[
        "##########",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "#........#",
        "##########",
    ];

    const HELD: Intent = Intent { up: false, left: false, down: false, right: false, jump_held: true, jump_pressed: false };

    // ── Hazards ──

    #[test]
    fn standing_on_a_chasm_starts_a_fall() {
        let mut r = Rig::new(&["#####", "#.v.#", "#####"], 36.0, 20.0);
        r.player.facing = Direction::Left;
        let events = r.tick(Intent::default());
        assert_eq!(r.player.locomotion, Locomotion::Falling(FallPhase::Start));
        assert_eq!(r.player.shown, PlayerAnim::FallStart);
        assert_eq!(r.player.facing, Direction::Up);
        assert_eq!(events, vec![GameEvent::FallStarted]);
        assert_eq!(r.player.on_tile, Some(Terrain::Chasm));
    }

    #[test]
    fn chasm_wins_over_slippery() {
        let mut r = Rig::new(&["#####", "#~v.#", "#####"], 28.0, 20.0);
        r.tick(Intent::default());
        assert_eq!(r.player.locomotion, Locomotion::Falling(FallPhase::Start));
    }

    #[test]
    fn slippery_starts_a_slide_but_not_mid_jump() {
        let mut r = Rig::new(&["#####", "#.~.#", "#####"], 36.0, 20.0);
        r.set(Locomotion::Jumping(JumpPhase::Start));
        r.tick(HELD);
        assert!(r.player.locomotion.is_jumping());

        r.set(Locomotion::Idle);
        let events = r.tick(Intent::default());
        assert_eq!(r.player.locomotion, Locomotion::Slipping(SlipPhase::Start));
        assert_eq!(events, vec![GameEvent::SlipStarted]);
    }

    #[test]
    fn a_jump_in_flight_passes_over_a_chasm() {
        let mut r = Rig::new(&["#####", "#.v.#", "#####"], 34.0, 20.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.facing = Direction::Right;
        r.tick(HELD);
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::Loop));
        assert_eq!(r.player.pos.x, 38.0);
    }

    // ── Jumping ──

    #[test]
    fn jump_starts_on_a_fresh_press_only() {
        let mut r = Rig::new(OPEN, 64.0, 96.0);
        r.tick(HELD);
        assert_eq!(r.player.locomotion, Locomotion::Idle);

        let events = r.tick(Intent { jump_pressed: true, jump_held: true, ..Intent::default() });
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::Start));
        assert_eq!(r.player.jump_from, Vec2::new(64.0, 96.0));
        assert_eq!(events, vec![GameEvent::JumpStarted]);
    }

    #[test]
    fn landing_jump_can_chain_into_the_next() {
        let mut r = Rig::new(OPEN, 64.0, 96.0);
        r.set(Locomotion::Jumping(JumpPhase::EndFloor));
        r.player.jump_from = Vec2::new(64.0, 140.0);

        let events = r.tick(Intent { jump_pressed: true, jump_held: true, ..Intent::default() });
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::Start));
        assert_eq!(r.player.jump_from, Vec2::new(64.0, 96.0));
        assert_eq!(events, vec![GameEvent::JumpStarted]);
    }

    #[test]
    fn no_second_jump_before_the_floor_landing() {
        let press = Intent { jump_pressed: true, jump_held: true, ..Intent::default() };
        for phase in [JumpPhase::Start, JumpPhase::Loop, JumpPhase::EndWall, JumpPhase::EndMantle] {
            let mut r = Rig::new(OPEN, 64.0, 96.0);
            r.set(Locomotion::Jumping(phase));
            let origin = Vec2::new(64.0, 100.0);
            r.player.jump_from = origin;

            let events = r.tick(press);
            assert!(!events.contains(&GameEvent::JumpStarted), "{phase:?}");
            assert_eq!(r.player.jump_from, origin, "{phase:?}");
        }
    }

    #[test]
    fn no_jump_while_falling() {
        let mut r = Rig::new(OPEN, 64.0, 96.0);
        r.set(Locomotion::Falling(FallPhase::Loop));
        r.tick(Intent { jump_pressed: true, ..Intent::default() });
        assert!(r.player.locomotion.is_falling());
    }

    #[test]
    fn max_distance_ends_the_jump_even_when_held() {
        let mut r = Rig::new(OPEN, 64.0, 60.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.jump_from = Vec2::new(64.0, 104.0); // 44 below
        r.tick(HELD);
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::EndFloor));
        assert_eq!(r.player.shown, PlayerAnim::JumpEndFloor);
        assert_eq!(r.player.pos.y, 60.0);
    }

    #[test]
    fn a_tap_still_covers_the_minimum_distance() {
        let mut r = Rig::new(OPEN, 64.0, 120.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.jump_from = r.player.pos;
        let mut ticks = 0;
        while r.player.locomotion == Locomotion::Jumping(JumpPhase::Loop) {
            r.tick(Intent::default());
            ticks += 1;
            assert!(ticks < 50);
        }
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::EndFloor));
        assert!(r.player.jump_distance() >= 28.0);
        assert!(r.player.jump_distance() < 44.0);
    }

    #[test]
    fn held_jump_goes_further_than_a_tap() {
        let run = |intent: Intent| {
            let mut r = Rig::new(OPEN, 64.0, 140.0);
            r.set(Locomotion::Jumping(JumpPhase::Loop));
            r.player.jump_from = r.player.pos;
            for _ in 0..30 { r.tick(intent); }
            r.player.jump_distance()
        };
        assert!(run(HELD) > run(Intent::default()));
        assert!(run(HELD) < 48.0);
    }

    #[test]
    fn jumping_into_a_wall_shakes_once() {
        let mut r = Rig::new(OPEN, 64.0, 18.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.jump_from = Vec2::new(64.0, 30.0);

        let mut shakes = 0;
        for _ in 0..40 {
            let events = r.tick(HELD);
            shakes += events.iter().filter(|e| matches!(e, GameEvent::CameraShake { .. })).count();
            assert!(!r.touches_wall());
        }
        assert_eq!(shakes, 1);
        assert_eq!(r.player.pos.y, 16.0); // flush under the top wall
        assert!(!r.player.locomotion.is_jumping());
    }

    #[test]
    fn horizontal_wall_ends_the_jump_flush() {
        let mut r = Rig::new(OPEN, 134.0, 80.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.facing = Direction::Right;
        let events = r.tick(HELD);
        assert_eq!(r.player.pos.x, 136.0);
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::EndWall));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn finished_jump_flush_against_a_wall_mantles() {
        let mut r = Rig::new(OPEN, 136.0, 80.0);
        r.set(Locomotion::Jumping(JumpPhase::Loop));
        r.player.facing = Direction::Right;
        r.player.jump_from = Vec2::new(90.0, 80.0);
        r.tick(HELD);
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::EndMantle));
    }

    #[test]
    fn jump_animation_chain_returns_to_idle() {
        let mut r = Rig::new(OPEN, 64.0, 120.0);
        r.tick(Intent { jump_pressed: true, ..Intent::default() });
        let mut seen = vec![r.player.locomotion];
        for _ in 0..200 {
            r.tick(Intent::default());
            if seen.last() != Some(&r.player.locomotion) {
                seen.push(r.player.locomotion);
            }
        }
        assert_eq!(seen, vec![
            Locomotion::Jumping(JumpPhase::Start),
            Locomotion::Jumping(JumpPhase::Loop),
            Locomotion::Jumping(JumpPhase::EndFloor),
            Locomotion::Idle,
        ]);
    }

    // ── Climbing ──

    #[test]
    fn last_pressed_direction_wins() {
        let mut r = Rig::new(OPEN, 64.0, 64.0);
        r.tick(Intent { up: true, right: true, ..Intent::default() });
        assert_eq!(r.player.facing, Direction::Right);
        assert_eq!(r.player.locomotion, Locomotion::Climbing);
        assert!((r.player.pos.x - 65.2).abs() < 1e-9);
        assert_eq!(r.player.pos.y, 64.0);

        r.tick(Intent::default());
        assert_eq!(r.player.locomotion, Locomotion::Idle);
    }

    #[test]
    fn climbing_never_enters_a_chasm_sideways_or_upwards() {
        let rows = &["#####", "#.v.#", "#...#", "#####"];
        let mut r = Rig::new(rows, 24.0, 20.0);
        let right = Intent { right: true, ..Intent::default() };
        for _ in 0..10 { r.tick(right); }
        assert_eq!(r.player.pos.x, 24.0);

        let mut r = Rig::new(rows, 36.0, 32.0);
        let up = Intent { up: true, ..Intent::default() };
        for _ in 0..10 { r.tick(up); }
        assert_eq!(r.player.pos.y, 32.0);
        assert!(!r.player.locomotion.is_falling());
    }

    #[test]
    fn climbing_into_a_wall_stops() {
        let mut r = Rig::new(OPEN, 18.0, 64.0);
        let left = Intent { left: true, ..Intent::default() };
        for _ in 0..10 { r.tick(left); }
        assert!(r.player.pos.x >= 16.0);
        assert!(!r.touches_wall());
    }

    // ── Falling and slipping ──

    #[test]
    fn fall_through_a_chasm_lands_on_the_first_row_below() {
        let rows = &["#####", "#...#", "#vvv#", "#vvv#", "#...#", "#...#", "#####"];
        let mut r = Rig::new(rows, 24.0, 36.0);
        let mut landed = 0;
        for _ in 0..200 {
            landed += r.tick(Intent::default()).iter().filter(|e| **e == GameEvent::Landed).count();
        }
        assert_eq!(landed, 1);
        assert_eq!(r.player.locomotion, Locomotion::Idle);
        assert_eq!(r.player.pos.y, 64.0);
        assert_eq!(r.player.on_tile, Some(Terrain::Climbable));
    }

    #[test]
    fn falling_onto_a_wall_ends_standing() {
        let rows = &["#####", "#vvv#", "#vvv#", "#####"];
        let mut r = Rig::new(rows, 24.0, 38.0);
        r.set(Locomotion::Falling(FallPhase::Loop));
        r.tick(Intent::default());
        assert_eq!(r.player.locomotion, Locomotion::Falling(FallPhase::EndWall));
        assert!(!r.touches_wall());
    }

    #[test]
    fn slide_ends_on_climbable_ground() {
        let rows = &["#####", "#...#", "#~~~#", "#~~~#", "#...#", "#...#", "#...#", "#####"];
        let mut r = Rig::new(rows, 24.0, 36.0);
        let mut seen = vec![];
        for _ in 0..300 {
            r.tick(Intent::default());
            if seen.last() != Some(&r.player.locomotion) {
                seen.push(r.player.locomotion);
            }
        }
        assert_eq!(seen, vec![
            Locomotion::Slipping(SlipPhase::Start),
            Locomotion::Slipping(SlipPhase::Loop),
            Locomotion::Slipping(SlipPhase::End),
            Locomotion::Idle,
        ]);
        assert!(r.player.pos.y >= 64.0);
        assert_eq!(r.player.on_tile, Some(Terrain::Climbable));
    }

    #[test]
    fn jumping_off_a_slide_cancels_it() {
        let rows = &["#####", "#...#", "#...#", "#...#", "#~~~#", "#~~~#", "#####"];
        let mut r = Rig::new(rows, 24.0, 68.0);
        r.set(Locomotion::Slipping(SlipPhase::Loop));
        r.tick(Intent { jump_pressed: true, jump_held: true, ..Intent::default() });
        assert_eq!(r.player.locomotion, Locomotion::Jumping(JumpPhase::Start));
        for _ in 0..40 { r.tick(HELD); }
        assert!(r.player.pos.y < 64.0);
    }

    // ── Invariants ──

    #[test]
    fn random_input_never_ends_inside_a_wall() {
        let rows = &[
            "##########",
            "#..#.....#",
            "#..#.vv..#",
            "#.....~~.#",
            "#.vv..~~.#",
            "#.vv.##..#",
            "#....#...#",
            "#~~......#",
            "#~~..vv..#",
            "#........#",
            "##########",
        ];
        let mut rng = fastrand::Rng::with_seed(7);
        for run in 0..20 {
            let mut r = Rig::new(rows, 72.0, 148.0);
            for _ in 0..600 {
                let intent = Intent {
                    up: rng.bool(),
                    left: rng.u8(..4) == 0,
                    down: rng.u8(..4) == 0,
                    right: rng.u8(..4) == 0,
                    jump_held: rng.bool(),
                    jump_pressed: rng.u8(..10) == 0,
                };
                r.tick(intent);
                assert!(!r.touches_wall(), "run {run}: inside a wall at {:?}", r.player.pos);
                let loco = r.player.locomotion;
                assert_eq!(r.player.shown, loco.anim(), "run {run}: animation out of sync");
            }
        }
    }

    // ── World ──

    fn running_world() -> WorldState {
        let store = AssetStore::embedded().unwrap();
        let mut w = WorldState::new(store, &GameConfig::default(), Stats::default());
        switch_phase(&mut w, Phase::Running);
        w
    }

    #[test]
    fn step_does_nothing_outside_running() {
        let store = AssetStore::embedded().unwrap();
        let mut w = WorldState::new(store, &GameConfig::default(), Stats::default());
        let level = w.water.level;
        assert!(step(&mut w, Intent::default()).is_empty());
        assert_eq!(w.water.level, level);
        assert_eq!(w.tick, 0);
    }

    #[test]
    fn water_rises_each_tick() {
        let mut w = running_world();
        let start = w.water.level;
        for _ in 0..10 { step(&mut w, Intent::default()); }
        assert!((w.water.level - (start - 10.0 * w.physics.water_speed)).abs() < 1e-9);
        assert_eq!(w.session.round_ticks, 10);
    }

    #[test]
    fn drowning_leads_to_game_over() {
        let mut w = running_world();
        w.session.last_highest = 120;
        w.water.level = w.player.pos.y - 10.0;
        let events = step(&mut w, Intent::default());
        assert_eq!(w.player.locomotion, Locomotion::Dying);
        assert!(events.contains(&GameEvent::Drowned { falling: false }));
        assert!(events.contains(&GameEvent::NewRecord));
        assert_eq!(w.session.stats.highest_point, 120);

        let y = w.player.pos.y;
        let mut died = false;
        for _ in 0..400 {
            if step(&mut w, Intent::default()).contains(&GameEvent::Died) {
                died = true;
            }
        }
        assert!(died);
        assert_eq!(w.phase, Phase::Over);
        assert_eq!(w.player.locomotion, Locomotion::Dead);
        assert!(w.player.pos.y > y);
    }

    #[test]
    fn reaching_the_finish_wins() {
        let mut w = running_world();
        w.session.round_ticks = 500;
        w.player.pos = Vec2::new(96.0, 8.0);
        let events = step(&mut w, Intent::default());
        assert_eq!(w.player.locomotion, Locomotion::Winning);
        assert!(events.contains(&GameEvent::Finished { ticks: 501 }));
        assert!(events.contains(&GameEvent::NewRecord));
        assert_eq!(w.session.stats.fastest_ticks, 501);

        let level = w.water.level;
        let mut won = false;
        for _ in 0..600 {
            if step(&mut w, Intent::default()).contains(&GameEvent::Won) {
                won = true;
            }
        }
        assert!(won);
        assert_eq!(w.phase, Phase::Won);
        assert_eq!(w.session.stats.highest_point, MAX_SCORE);
        assert!(w.water.level > level, "water drains during the win");
    }

    #[test]
    fn height_is_tracked_while_climbing() {
        let mut w = running_world();
        w.player.pos.y = w.session.start_y / 2.0;
        step(&mut w, Intent::default());
        assert!(w.session.last_highest >= 499 && w.session.last_highest <= 500);
        w.player.pos.y = w.session.start_y;
        step(&mut w, Intent::default());
        assert!(w.session.last_highest >= 499);
    }

    #[test]
    fn restart_restores_the_start() {
        let mut w = running_world();
        for _ in 0..30 { step(&mut w, Intent { up: true, ..Intent::default() }); }
        w.water.level = 10.0;
        w.session.camera.shake(10.0, 40);
        w.fade.update();

        restart_level(&mut w);
        assert_eq!(w.player.pos, w.level.start);
        assert_eq!(w.player.locomotion, Locomotion::Idle);
        assert!(w.water.level > w.level.height);
        assert_eq!(w.session.round_ticks, 0);
        assert_eq!(w.fade.alpha(), 0);
        assert!(!w.session.camera.shaker.is_active());
    }

    #[test]
    fn wall_shake_reaches_the_camera() {
        let mut w = running_world();
        // jump left at the outer wall from the start row
        let from = Vec2::new(24.0, w.level.start.y);
        w.player.pos = from;
        w.player.jump_from = from;
        w.player.facing = Direction::Left;
        w.player.locomotion = Locomotion::Jumping(JumpPhase::Loop);
        w.player.shown = PlayerAnim::JumpLoop;
        w.player.frame = w.anims.get(PlayerAnim::JumpLoop).from;

        let mut shaken = false;
        for _ in 0..5 {
            let events = step(&mut w, HELD);
            if events.iter().any(|e| matches!(e, GameEvent::CameraShake { .. })) {
                shaken = true;
                break;
            }
        }
        assert!(shaken);
        assert!(w.session.camera.shaker.is_active());
        assert_eq!(w.player.pos.x, 16.0);
    }
}

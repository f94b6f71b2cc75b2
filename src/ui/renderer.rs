/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The tower is sampled through the camera: every map cell is `CELL_W`
/// terminal columns wide and stands for a `CELL_PX` square of world units
/// at scale 1, so zooming out simply samples sparser points.

use std::io::{self, BufWriter, Write};
use std::time::Instant;

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Danger, Direction, PLAYER_SHAPE};
use crate::domain::geom::Vec2;
use crate::domain::space::SpatialIndex;
use crate::domain::tile::{TagSet, Terrain};
use crate::sim::save::{score_from_y, y_from_score, Stats};
use crate::sim::scene::Menu;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// On VTE-based terminals the inter-row gap pixels use the background
    /// colour of the last Clear. Using the same explicit RGB for the Clear
    /// and for every cell keeps those gaps invisible.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// `put_str` centred on the row.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        self.put_str(self.width.saturating_sub(len) / 2, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Terminal columns per map cell; two columns make a roughly square cell.
const CELL_W: usize = 2;
/// World units covered by one map cell at scale 1.
const CELL_PX: f64 = 8.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 1;
/// Message bar and help line under the map.
const FOOTER_ROWS: usize = 2;
/// Whole-tower gauge in the rightmost column.
const GAUGE_W: usize = 1;

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const HI: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const CYAN: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const GREY: Color = Color::Rgb { r: 180, g: 180, b: 180 };
const DIM: Color = Color::Rgb { r: 40, g: 40, b: 40 };
const WATER_BG: Color = Color::Rgb { r: 20, g: 60, b: 140 };
const WATER_FG: Color = Color::Rgb { r: 120, g: 180, b: 255 };
const GAUGE_BG: Color = Color::Rgb { r: 28, g: 28, b: 34 };

const TITLE_ART: [&str; 5] = [
    "╔╗╔╔═╗╔╗╔╔═╗  ╔═╗╦  ╦╔╦╗╔╗ ",
    "║║║╠═╣║║║║ ║  ║  ║  ║║║║╠╩╗",
    "╝╚╝╩ ╩╝╚╝╚═╝  ╚═╝╩═╝╩╩ ╩╚═╝",
    "",
    "climb the tower before the water gets you",
];

const HELP: &str = " ←↑↓→/WASD: climb  SPACE/Z: jump (hold = far)  ESC/P: pause  F3: debug";

/// Glyph pair and colours for one map cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Style {
    left: char,
    right: char,
    fg: Color,
    bg: Color,
}

impl Style {
    const fn new(left: char, right: char, fg: Color, bg: Color) -> Style {
        Style { left, right, fg, bg }
    }

    const VOID: Style = Style::new(' ', ' ', Color::White, Cell::BASE_BG);
}

/// Union of the tags of every obstacle under `p`.
fn tags_at(space: &SpatialIndex, p: Vec2) -> TagSet {
    space.obstacles_at(p).fold(TagSet::EMPTY, |acc, o| {
        o.tags.iter().fold(acc, |s, t| s.with(t))
    })
}

/// Map cell look for a tag set. The strongest terrain wins; decoration
/// only adds a glyph on top of whatever it sits on.
fn terrain_style(tags: TagSet, checker: bool) -> Style {
    let deco = tags.contains(Terrain::Decoration);
    if tags.contains(Terrain::Wall) {
        Style::new('█', '█', Color::Rgb { r: 120, g: 120, b: 130 }, Color::Rgb { r: 70, g: 70, b: 80 })
    } else if tags.contains(Terrain::Finish) {
        let (a, b) = if checker { ('▚', '▚') } else { ('▞', '▞') };
        Style::new(a, b, Color::White, Color::Rgb { r: 30, g: 120, b: 40 })
    } else if tags.contains(Terrain::Chasm) {
        Style::new(' ', ' ', Color::White, Color::Rgb { r: 8, g: 8, b: 12 })
    } else if tags.contains(Terrain::Slippery) {
        Style::new('≈', '≈', Color::Rgb { r: 190, g: 230, b: 255 }, Color::Rgb { r: 70, g: 90, b: 110 })
    } else if tags.contains(Terrain::Climbable) {
        let bg = if checker {
            Color::Rgb { r: 64, g: 54, b: 46 }
        } else {
            Color::Rgb { r: 58, g: 50, b: 43 }
        };
        if deco {
            Style::new('·', '°', Color::Rgb { r: 140, g: 170, b: 90 }, bg)
        } else {
            Style::new(' ', ' ', Color::White, bg)
        }
    } else if deco {
        Style::new('·', ' ', Color::Rgb { r: 140, g: 170, b: 90 }, Cell::BASE_BG)
    } else {
        Style::VOID
    }
}

/// Darken a colour by `alpha` (0 = untouched, 255 = black).
fn shade(c: Color, alpha: u8) -> Color {
    if alpha == 0 { return c; }
    let keep = 255 - alpha as u32;
    let dim = |v: u8| (v as u32 * keep / 255) as u8;
    match c {
        Color::Rgb { r, g, b } => Color::Rgb { r: dim(r), g: dim(g), b: dim(b) },
        Color::Reset => shade(Cell::BASE_BG, alpha),
        _ if alpha >= 128 => Color::Black,
        other => other,
    }
}

/// Facing marker drawn next to the climber; `rotation` (radians) adds
/// the spin of the sinking animation.
fn facing_arrow(facing: Direction, rotation: f64) -> char {
    const ARROWS: [char; 4] = ['▴', '▸', '▾', '◂'];
    let spin = (rotation / std::f64::consts::FRAC_PI_2).round() as i64;
    let turns = (facing.quarter_turns() as i64 + spin).rem_euclid(4);
    ARROWS[turns as usize]
}

fn danger_color(d: Danger) -> Color {
    match d {
        Danger::Good => HI,
        Danger::Warn => GOLD,
        Danger::Bad => RED,
    }
}

/// Ticks as `m:ss.t`.
pub fn format_time(ticks: u64, tick_ms: u64) -> String {
    let tenths = ticks * tick_ms / 100;
    format!("{}:{:02}.{}", tenths / 600, tenths / 10 % 60, tenths % 10)
}

fn menu_line(item: &str, active: bool) -> String {
    if active { format!("» {item} «") } else { format!("  {item}  ") }
}

fn best_time(stats: &Stats, tick_ms: u64) -> String {
    if stats.fastest_ticks == 0 {
        "--:--.-".to_string()
    } else {
        format_time(stats.fastest_ticks, tick_ms)
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    /// `None` while the loading screen is up.
    last_phase: Option<Phase>,
    tick_ms: u64,
    /// Simulation ticks per second, measured over roughly one second.
    tps: f64,
    tps_mark: (Instant, u64),
    /// The terminal reports key releases; see `keyboard_enhanced`.
    enhanced: bool,
}

impl Renderer {
    pub fn new(tick_ms: u64) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            tick_ms,
            tps: 0.0,
            tps_mark: (Instant::now(), 0),
            enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        // Release events make a held jump key readable without autorepeat
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            self.enhanced = execute!(
                self.writer,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .is_ok();
        }
        log::info!("keyboard release events: {}", self.enhanced);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Whether key Release events can be trusted for held keys.
    pub fn keyboard_enhanced(&self) -> bool {
        self.enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.enhanced = false;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Detect a terminal resize and invalidate everything if it happened.
    fn sync_size(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }
        Ok(())
    }

    fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    fn present(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    pub fn render_loading(&mut self, label: &str, ticks: u32) -> io::Result<()> {
        self.sync_size()?;
        if self.last_phase.is_some() {
            self.last_phase = None;
            self.invalidate()?;
        }
        self.front.clear();
        self.compose_loading(label, ticks);
        self.present()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        self.sync_size()?;

        // Phase change → clear for a clean transition
        if self.last_phase != Some(world.phase) {
            self.invalidate()?;
            self.last_phase = Some(world.phase);
        }

        self.fit_camera(world);
        self.measure_tps(world.tick);

        self.front.clear();
        match world.phase {
            Phase::Start => self.compose_start(world),
            Phase::Running => self.compose_game(world),
            Phase::Paused => {
                self.compose_game(world);
                self.compose_pause_overlay(world);
            }
            Phase::Over => {
                self.compose_game(world);
                self.compose_over(world);
            }
            Phase::Won => {
                self.compose_game(world);
                self.compose_won(world);
            }
        }

        self.present()
    }

    fn measure_tps(&mut self, tick: u64) {
        let (since, start_tick) = self.tps_mark;
        let elapsed = since.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.tps = tick.saturating_sub(start_tick) as f64 / elapsed;
            self.tps_mark = (Instant::now(), tick);
        }
    }

    fn map_rows(&self) -> usize {
        self.front.height.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1)
    }

    fn map_cols(&self) -> usize {
        (self.front.width.saturating_sub(GAUGE_W) / CELL_W).max(1)
    }

    /// Size the camera view from the terminal and re-centre it.
    fn fit_camera(&self, world: &mut WorldState) {
        let cam = &mut world.session.camera;
        cam.view_w = self.map_cols() as f64 * CELL_PX;
        cam.view_h = self.map_rows() as f64 * CELL_PX;
        let centre = world.player.pos + Vec2::new(PLAYER_SHAPE.x / 2.0, PLAYER_SHAPE.y / 2.0);
        cam.follow(centre, world.level.size());
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the
        // terminal default and bring back the row gaps.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════════
    // Compose: build front buffer content
    // ══════════════════════════════════════════════════════════════

    fn compose_loading(&mut self, label: &str, ticks: u32) {
        let mid = self.front.height / 2;
        for (i, line) in TITLE_ART.iter().take(3).enumerate() {
            self.front.put_centered((mid + i).saturating_sub(5), line, GOLD, Color::Reset);
        }
        let dots = ".".repeat((ticks as usize / 10) % 4);
        let text = format!("loading {label}{dots:<3}");
        self.front.put_centered(mid + 1, &text, GREY, Color::Reset);
    }

    fn compose_start(&mut self, w: &WorldState) {
        let top = self.front.height.saturating_sub(16) / 2;
        for (i, line) in TITLE_ART.iter().enumerate() {
            let fg = if i < 3 { GOLD } else { GREY };
            self.front.put_centered(top + i, line, fg, Color::Reset);
        }

        self.draw_menu(&w.menu, top + 7, Color::Reset);

        let stats = &w.session.stats;
        let best = format!(
            "best height {} m   fastest climb {}",
            stats.highest_point,
            best_time(stats, self.tick_ms),
        );
        self.front.put_centered(top + 11, &best, CYAN, Color::Reset);
        let help_row = self.front.height.saturating_sub(1);
        self.front.put_centered(help_row, HELP.trim(), Color::DarkGrey, Color::Reset);
    }

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);
        self.compose_map(w);
        self.compose_gauge(w);
        self.compose_hints(w);
        self.compose_player(w);

        // ── Message bar ──
        let msg_row = MAP_ROW + self.map_rows();
        if !w.message.is_empty() && msg_row < self.front.height {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        } else if w.debug && msg_row < self.front.height {
            let p = &w.player;
            let tile = p.on_tile.map_or("none", Terrain::name);
            let cam = &w.session.camera;
            let dbg = format!(
                " {} ({} #{}) on {}  pos {:.1},{:.1}  water {:.1}  scale {:.2}{}  {:.0} tps",
                p.locomotion.label(), p.shown.tag_name(), p.frame, tile, p.pos.x, p.pos.y,
                w.water.level, cam.scale,
                if cam.shaker.is_active() { "  shaking" } else { "" },
                self.tps,
            );
            self.front.put_str(0, msg_row, &dbg, CYAN, Color::Reset);
        }

        // ── Help bar ──
        let help_row = msg_row + 1;
        if help_row < self.front.height {
            self.front.put_str(0, help_row, HELP, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let height = score_from_y(w.player.pos.y, w.session.start_y);
        let stats = &w.session.stats;
        let water = if w.water.paused { "  WATER PAUSED" } else { "" };
        let hud = format!(
            " {}  Height:{:>4} m  Best:{:>4} m  Time: {}  Record: {}{} ",
            w.level.name.to_uppercase(),
            height,
            stats.highest_point,
            format_time(w.session.round_ticks, self.tick_ms),
            best_time(stats, self.tick_ms),
            water,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Tower and water, sampled at the centre of every map cell.
    fn compose_map(&mut self, w: &WorldState) {
        let cam = &w.session.camera;
        let alpha = w.fade.alpha();
        let rows = self.map_rows();
        let cols = self.map_cols();
        let surface_band = CELL_PX / cam.scale;

        for row in 0..rows {
            for c in 0..cols {
                let v = Vec2::new((c as f64 + 0.5) * CELL_PX, (row as f64 + 0.5) * CELL_PX);
                let p = cam.view_to_world(v);
                let inside = p.x >= 0.0 && p.y >= 0.0 && p.x < w.level.width && p.y < w.level.height;

                let mut style = if inside {
                    let checker = ((p.x / w.level.grid_size) as i64 + (p.y / w.level.grid_size) as i64) % 2 == 0;
                    terrain_style(tags_at(&w.space, p), checker)
                } else {
                    Style::VOID
                };

                if p.y > w.water.level {
                    let surface = p.y - surface_band <= w.water.level;
                    let wave = if (c + w.tick as usize / 8) % 2 == 0 { '~' } else { '≈' };
                    style = if surface {
                        Style::new(wave, wave, WATER_FG, WATER_BG)
                    } else {
                        Style::new(' ', ' ', WATER_FG, WATER_BG)
                    };
                }

                let fg = shade(style.fg, alpha);
                let bg = shade(style.bg, alpha);
                let col = c * CELL_W;
                self.front.set(col, MAP_ROW + row, Cell::from_char(style.left, fg, bg));
                self.front.set(col + 1, MAP_ROW + row, Cell::from_char(style.right, fg, bg));
            }
        }
    }

    /// The whole tower squeezed into one column: water, best height, climber.
    fn compose_gauge(&mut self, w: &WorldState) {
        let col = self.map_cols() * CELL_W;
        if col >= self.front.width {
            return;
        }
        let rows = self.map_rows();
        let per_row = w.level.height / rows as f64;
        let row_of = |y: f64| ((y / per_row).max(0.0) as usize).min(rows - 1);

        let player = row_of(w.player.pos.y + PLAYER_SHAPE.y / 2.0);
        let best = (w.session.stats.highest_point > 0)
            .then(|| row_of(y_from_score(w.session.stats.highest_point, w.session.start_y)));

        for row in 0..rows {
            let bottom = (row + 1) as f64 * per_row;
            let flooded = w.water.level < bottom;
            let surface = flooded && w.water.level >= bottom - per_row;
            let bg = if flooded { WATER_BG } else { GAUGE_BG };
            let cell = if row == player {
                Cell::from_char('◆', danger_color(w.player.locomotion.danger()), bg)
            } else if Some(row) == best {
                Cell::from_char('─', RED, bg)
            } else if surface {
                Cell::from_char('≈', WATER_FG, bg)
            } else {
                Cell::from_char('│', DIM, bg)
            };
            self.front.set(col, MAP_ROW + row, cell);
        }
    }

    /// Map cell under a world point, as (column, row) in the terminal.
    fn screen_pos(&self, w: &WorldState, p: Vec2) -> Option<(usize, usize)> {
        let v = w.session.camera.world_to_view(p)?;
        let c = (v.x / CELL_PX) as usize;
        let row = (v.y / CELL_PX) as usize;
        if c >= self.map_cols() || row >= self.map_rows() {
            return None;
        }
        Some((c * CELL_W, MAP_ROW + row))
    }

    /// Overlay a glyph pair on a map cell, keeping the cell's background.
    fn overlay(&mut self, col: usize, row: usize, glyphs: (char, char), fg: Color) {
        let bg = self.front.get(col, row).bg;
        self.front.set(col, row, Cell::from_char(glyphs.0, fg, bg));
        self.front.set(col + 1, row, Cell::from_char(glyphs.1, fg, bg));
    }

    fn compose_player(&mut self, w: &WorldState) {
        let p = &w.player;
        let centre = p.pos + Vec2::new(PLAYER_SHAPE.x / 2.0, PLAYER_SHAPE.y / 2.0);
        let Some((col, row)) = self.screen_pos(w, centre) else { return };
        let glyph = w.player_sheet.glyph(p.frame);
        let fg = shade(danger_color(p.locomotion.danger()), w.fade.alpha());
        self.overlay(col, row, (glyph, facing_arrow(p.facing, p.rotation)), fg);
    }

    fn compose_hints(&mut self, w: &WorldState) {
        for hint in w.hints.iter().filter(|h| h.is_drawn()) {
            let Some((col, row)) = self.screen_pos(w, hint.pos) else { continue };
            let fade = ((1.0 - hint.alpha.clamp(0.0, 1.0)) * 255.0) as u8;
            let fg = shade(shade(Color::White, fade), w.fade.alpha());
            self.overlay(col, row, (w.controls.glyph(hint.anim.frame), ' '), fg);
        }
    }

    /// Centered menu, one item per row starting at `y`.
    fn draw_menu(&mut self, menu: &Menu, y: usize, bg: Color) {
        for (i, item) in menu.items.iter().enumerate() {
            let active = i == menu.active;
            let fg = if active { HI } else { Color::White };
            self.front.put_centered(y + i, &menu_line(item, active), fg, bg);
        }
    }

    /// Dark box centered on the map, returns its top row.
    fn draw_box(&mut self, box_w: usize, box_h: usize) -> usize {
        let box_w = box_w.min(self.front.width);
        let box_h = box_h.min(self.map_rows());
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + self.map_rows().saturating_sub(box_h) / 2;
        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, DIM));
            }
        }
        box_y
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let y = self.draw_box(32, 9);
        let blink = (w.tick / 8) % 2 == 0;
        let label = if blink { "║  ▶  PAUSED  ◀  ║" } else { "║     PAUSED      ║" };
        self.front.put_centered(y, "╔═════════════════╗", GOLD, DIM);
        self.front.put_centered(y + 1, label, GOLD, DIM);
        self.front.put_centered(y + 2, "╚═════════════════╝", GOLD, DIM);
        self.draw_menu(&w.menu, y + 4, DIM);
    }

    fn compose_over(&mut self, w: &WorldState) {
        let y = self.draw_box(40, 10);
        self.front.put_centered(y + 1, "SHORT CIRCUIT", RED, DIM);
        let reached = format!("you reached {} m", w.session.last_highest);
        self.front.put_centered(y + 3, &reached, Color::White, DIM);
        let best = format!("best {} m", w.session.stats.highest_point);
        self.front.put_centered(y + 4, &best, CYAN, DIM);
        self.draw_menu(&w.menu, y + 6, DIM);
    }

    fn compose_won(&mut self, w: &WorldState) {
        let y = self.draw_box(40, 10);
        self.front.put_centered(y + 1, "TOP OF THE TOWER", GOLD, DIM);
        let time = format!("time {}", format_time(w.session.last_round_ticks, self.tick_ms));
        self.front.put_centered(y + 3, &time, Color::White, DIM);
        let best = format!("record {}", best_time(&w.session.stats, self.tick_ms));
        self.front.put_centered(y + 4, &best, CYAN, DIM);
        self.draw_menu(&w.menu, y + 6, DIM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::config::GameConfig;
    use crate::sim::scene::{self, MenuNav};

    fn world() -> WorldState {
        let store = AssetStore::embedded().unwrap();
        WorldState::new(store, &GameConfig::default(), Stats::default())
    }

    /// Renderer drawing into an off-screen buffer of the given size.
    fn offscreen(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new(16);
        r.front.resize(w, h);
        r.back.resize(w, h);
        r
    }

    fn row_text(r: &Renderer, y: usize) -> String {
        (0..r.front.width).map(|x| r.front.get(x, y).as_str().to_string()).collect()
    }

    fn screen_text(r: &Renderer) -> String {
        (0..r.front.height).map(|y| row_text(r, y)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn time_format() {
        assert_eq!(format_time(0, 16), "0:00.0");
        // 3750 ticks * 16 ms = 60 s
        assert_eq!(format_time(3750, 16), "1:00.0");
        assert_eq!(format_time(100, 16), "0:01.6");
    }

    #[test]
    fn strongest_terrain_wins() {
        let wall = TagSet::of(&[Terrain::Climbable, Terrain::Wall]);
        assert_eq!(terrain_style(wall, true).left, '█');
        let chasm = TagSet::of(&[Terrain::Climbable, Terrain::Chasm]);
        assert_eq!(terrain_style(chasm, true).bg, Color::Rgb { r: 8, g: 8, b: 12 });
        let deco = TagSet::of(&[Terrain::Climbable, Terrain::Decoration]);
        assert_eq!(terrain_style(deco, false).left, '·');
        assert_eq!(terrain_style(TagSet::EMPTY, false), Style::VOID);
    }

    #[test]
    fn facing_arrow_turns_with_the_sinking_spin() {
        assert_eq!(facing_arrow(Direction::Up, 0.0), '▴');
        assert_eq!(facing_arrow(Direction::Left, 0.0), '◂');
        assert_eq!(facing_arrow(Direction::Up, std::f64::consts::PI), '▾');
        assert_eq!(facing_arrow(Direction::Left, std::f64::consts::FRAC_PI_2), '▴');
    }

    #[test]
    fn shade_darkens_towards_black() {
        let c = Color::Rgb { r: 200, g: 100, b: 50 };
        assert_eq!(shade(c, 0), c);
        assert_eq!(shade(c, 255), Color::Rgb { r: 0, g: 0, b: 0 });
        assert_eq!(shade(Color::Rgb { r: 255, g: 255, b: 255 }, 128), Color::Rgb { r: 127, g: 127, b: 127 });
    }

    #[test]
    fn camera_view_follows_the_terminal_size() {
        let mut w = world();
        let r = offscreen(80, 30);
        r.fit_camera(&mut w);
        let cam = &w.session.camera;
        // one column goes to the gauge
        assert_eq!(cam.view_w, 39.0 * CELL_PX);
        assert_eq!(cam.view_h, 27.0 * CELL_PX);
        // the tower is narrower than the view, so it stays centred
        assert_eq!(cam.x, w.level.width / 2.0);
    }

    #[test]
    fn player_is_drawn_at_the_view_centre() {
        let mut w = world();
        scene::update(&mut w, MenuNav::Confirm, false);
        let mut r = offscreen(120, 40);
        r.fit_camera(&mut w);
        r.compose_game(&w);

        let glyph = w.player_sheet.glyph(w.player.frame).to_string();
        let centre = w.player.pos + Vec2::new(PLAYER_SHAPE.x / 2.0, PLAYER_SHAPE.y / 2.0);
        let (col, row) = r.screen_pos(&w, centre).unwrap();
        assert_eq!(r.front.get(col, row).as_str(), glyph);
        assert_eq!(r.front.get(col, row).fg, HI);
        assert!(row_text(&r, HUD_ROW).contains("Height:   0 m"));
    }

    #[test]
    fn debug_line_replaces_the_empty_message_bar() {
        let mut w = world();
        scene::update(&mut w, MenuNav::Confirm, false);
        w.debug = true;
        let mut r = offscreen(120, 30);
        r.fit_camera(&mut w);
        r.compose_game(&w);
        let msg_row = MAP_ROW + r.map_rows();
        assert!(row_text(&r, msg_row).contains("idle (Idle #"));

        w.set_message("WATER PAUSED", 10);
        r.front.clear();
        r.compose_game(&w);
        assert!(row_text(&r, msg_row).contains("WATER PAUSED"));
    }

    #[test]
    fn gauge_marks_climber_record_and_water() {
        let mut w = world();
        scene::update(&mut w, MenuNav::Confirm, false);
        w.session.stats.highest_point = 500;
        w.water.level = w.level.height * 0.9;
        let mut r = offscreen(80, 30);
        r.fit_camera(&mut w);
        r.compose_game(&w);

        let col = r.map_cols() * CELL_W;
        let rows = r.map_rows();
        let gauge: Vec<Cell> = (0..rows).map(|row| r.front.get(col, MAP_ROW + row)).collect();
        assert_eq!(gauge.iter().filter(|c| c.as_str() == "◆").count(), 1);
        assert_eq!(gauge.iter().filter(|c| c.as_str() == "─").count(), 1);
        assert_eq!(gauge[rows - 1].bg, WATER_BG);
        assert_eq!(gauge[0].bg, GAUGE_BG);

        // the record sits above the climber standing at the start
        let pos = |g: &str| gauge.iter().position(|c| c.as_str() == g);
        assert!(pos("─") < pos("◆"));
    }

    #[test]
    fn start_screen_lists_the_menu() {
        let mut w = world();
        let mut r = offscreen(100, 30);
        r.fit_camera(&mut w);
        r.compose_start(&w);
        let text = screen_text(&r);
        assert!(text.contains("» Play «"));
        assert!(text.contains("  Quit  "));
    }

    #[test]
    fn pause_overlay_shows_the_pause_menu() {
        let mut w = world();
        scene::update(&mut w, MenuNav::Confirm, false);
        scene::update(&mut w, MenuNav::None, true);
        let mut r = offscreen(100, 30);
        r.fit_camera(&mut w);
        r.compose_game(&w);
        r.compose_pause_overlay(&w);
        let text = screen_text(&r);
        assert!(text.contains("PAUSED"));
        assert!(text.contains("» Continue «"));
        assert!(text.contains("Restart"));
    }

    #[test]
    fn water_fills_the_bottom_rows() {
        let mut w = world();
        scene::update(&mut w, MenuNav::Confirm, false);
        w.water.level = w.player.pos.y;
        let mut r = offscreen(80, 30);
        r.fit_camera(&mut w);
        r.compose_map(&w);
        let last_map_row = MAP_ROW + r.map_rows() - 1;
        assert_eq!(r.front.get(0, last_map_row).bg, WATER_BG);
        assert_ne!(r.front.get(0, MAP_ROW).bg, WATER_BG);
    }
}

/// Animation driver: frame tags, sprite sheets and the frame cursor.
///
/// Sheets use the Aseprite JSON export layout (`frames` + `meta.frameTags`)
/// with one extra per-frame field, `glyph`, which is what the terminal
/// renderer draws for that frame.

use serde::Deserialize;

use crate::error::LoadError;

/// Frames advance once every this many ticks.
pub const ANIMATION_SKIP_TICKS: u32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Playback {
    #[default]
    Forward,
    Reverse,
    Pingpong,
}

/// A named `[from, to]` frame range.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct FrameTag {
    pub name: String,
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub direction: Playback,
}

/// Next frame for a cursor at `frame` on `tick`.
///
/// A frame before `from` or at/after `to` restarts the range at once.
/// Inside the range the frame moves forward on every
/// `ANIMATION_SKIP_TICKS`-th tick and holds otherwise. Callers detect
/// completion by comparing with `tag.to` *before* calling this.
pub fn advance(frame: usize, tick: u32, tag: &FrameTag) -> usize {
    if frame < tag.from || frame >= tag.to {
        return tag.from;
    }
    if tick % ANIMATION_SKIP_TICKS != 0 {
        return frame;
    }
    frame + 1
}

// ── Sprite sheet ──

#[derive(Clone, Debug, Deserialize)]
pub struct SpriteFrame {
    #[serde(default)]
    pub filename: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_glyph")]
    pub glyph: char,
}

fn default_duration() -> u32 { 100 }
fn default_glyph() -> char { '?' }

#[derive(Deserialize)]
struct SheetFile {
    frames: Vec<SpriteFrame>,
    meta: SheetMeta,
}

#[derive(Deserialize)]
struct SheetMeta {
    #[serde(rename = "frameTags", default)]
    frame_tags: Vec<FrameTag>,
}

#[derive(Clone, Debug)]
pub struct SpriteSheet {
    pub name: String,
    pub frames: Vec<SpriteFrame>,
    pub tags: Vec<FrameTag>,
}

impl SpriteSheet {
    /// Parse and validate a sheet. Every tag must lie inside the frame list.
    pub fn from_json(name: &str, text: &str) -> Result<SpriteSheet, LoadError> {
        let file: SheetFile = serde_json::from_str(text).map_err(|source| LoadError::SpriteSyntax {
            sheet: name.to_string(),
            source,
        })?;

        for tag in &file.meta.frame_tags {
            if tag.from > tag.to || tag.to >= file.frames.len() {
                return Err(LoadError::BadFrameRange {
                    sheet: name.to_string(),
                    tag: tag.name.clone(),
                    from: tag.from,
                    to: tag.to,
                    frames: file.frames.len(),
                });
            }
        }

        Ok(SpriteSheet {
            name: name.to_string(),
            frames: file.frames,
            tags: file.meta.frame_tags,
        })
    }

    pub fn tag_index(&self, tag: &str) -> Result<usize, LoadError> {
        self.tags.iter().position(|t| t.name == tag).ok_or_else(|| LoadError::MissingFrameTag {
            sheet: self.name.clone(),
            tag: tag.to_string(),
        })
    }

    pub fn tag(&self, index: usize) -> &FrameTag {
        &self.tags[index]
    }

    pub fn glyph(&self, frame: usize) -> char {
        self.frames.get(frame).map_or('?', |f| f.glyph)
    }
}

/// Self-contained cursor for UI sprites (hints, menu decorations).
#[derive(Clone, Debug, Default)]
pub struct SpriteAnimation {
    pub tag: usize,
    pub frame: usize,
    tick: u32,
}

impl SpriteAnimation {
    /// Step once on `tag`. Switching tags restarts from the first frame.
    /// Returns true when the end frame of the tag has been reached.
    pub fn update(&mut self, sheet: &SpriteSheet, tag: usize) -> bool {
        let ft = sheet.tag(tag);
        if self.tag != tag {
            self.tag = tag;
            self.frame = ft.from;
            self.tick = 0;
        }
        self.tick += 1;
        if self.frame < ft.from || self.frame > ft.to {
            self.frame = ft.from;
        }
        if self.tick % ANIMATION_SKIP_TICKS == 0 && self.frame < ft.to {
            self.frame += 1;
        } else if self.tick % ANIMATION_SKIP_TICKS == 0 {
            self.frame = ft.from;
        }
        self.frame == ft.to
    }
}

/// Asset store: everything the game needs, parsed and validated once.
///
/// Built by the background loader and handed to `WorldState::new`.
/// The map, the two sprite sheets and the sound buffers are embedded in
/// the binary; `general.map_file` in the config swaps in another map.

use std::path::Path;

use crate::domain::anim::SpriteSheet;
use crate::domain::entity::AnimTable;
use crate::domain::hint::ControlHint;
use crate::domain::space::SpatialIndex;
use crate::error::LoadError;
use crate::sim::level::{self, Level, EMBEDDED_MAP};
use crate::ui::sound::SoundBank;

const PLAYER_SHEET: &str = include_str!("../assets/nanobot.json");
const CONTROLS_SHEET: &str = include_str!("../assets/controls.json");

pub struct AssetStore {
    pub level: Level,
    pub space: SpatialIndex,
    pub player_sheet: SpriteSheet,
    pub controls: SpriteSheet,
    pub anims: AnimTable,
    pub hints: Vec<ControlHint>,
    pub sounds: SoundBank,
}

/// Loading stages, in order. The loader bumps its counter before each.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    Map = 1,
    Sprites,
    Sounds,
    Entities,
    Done,
}

/// Label shown on the loading screen for a counter value.
pub fn stage_label(counter: usize) -> &'static str {
    const LABELS: [&str; 6] = ["", "map", "sprites", "sounds", "entities", "done"];
    LABELS.get(counter).copied().unwrap_or("")
}

/// Read the map override, if any.
pub fn map_source(map_file: Option<&Path>) -> Result<(String, String), LoadError> {
    match map_file {
        None => Ok(("tower".to_string(), EMBEDDED_MAP.to_string())),
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let name = path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "map".to_string());
            Ok((name, text))
        }
    }
}

impl AssetStore {
    /// Build the store, reporting each stage through `progress`.
    pub fn load(
        map_file: Option<&Path>,
        mut progress: impl FnMut(Stage),
    ) -> Result<AssetStore, LoadError> {
        progress(Stage::Map);
        let (name, text) = map_source(map_file)?;
        let (level, space) = level::load_map(&name, &text)?;

        progress(Stage::Sprites);
        let player_sheet = SpriteSheet::from_json("Nanobot", PLAYER_SHEET)?;
        let anims = AnimTable::from_sheet(&player_sheet)?;
        let controls = SpriteSheet::from_json("Controls", CONTROLS_SHEET)?;

        progress(Stage::Sounds);
        let sounds = SoundBank::generate();

        progress(Stage::Entities);
        let hints = level.hints.iter()
            .map(|h| Ok(ControlHint::new(h.pos, h.height, controls.tag_index(&h.tag)?)))
            .collect::<Result<Vec<_>, LoadError>>()?;

        progress(Stage::Done);
        Ok(AssetStore { level, space, player_sheet, controls, anims, hints, sounds })
    }

    /// Embedded assets only, no progress reporting.
    pub fn embedded() -> Result<AssetStore, LoadError> {
        AssetStore::load(None, |_| {})
    }
}

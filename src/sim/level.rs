/// Map loader.
///
/// ## Map format (TOML):
///   ```toml
///   name = "Tower"
///   grid_size = 16
///
///   [[layers]]
///   identifier = "Floor"      # Floor | Walls | Invisible | Decoration
///   offset_x = 0
///   offset_y = 0
///   tiles = """
///   1000001
///   1005001
///   """
///
///   [[entities]]
///   identifier = "Player_start"   # Player_start | Finish | Hint
///   x = 48
///   y = 944
///   width = 16
///   height = 16
///   tag = "Arrows"                # Hint only: frame tag of the controls sheet
///   ```
///
/// ## Tile ids:
///   One base-36 digit per cell, see `Terrain::from_tile_id`.
///   '.' or ' ' = no tile.
///
/// Floor, Walls and Invisible tiles become obstacles; Decoration tiles are
/// stored tagged decoration and only the renderer looks at them.

use serde::Deserialize;

use crate::domain::geom::{Rect, Shape, Vec2};
use crate::domain::space::{Layer, SpatialIndex};
use crate::domain::tile::{TagSet, Terrain};
use crate::error::LoadError;

pub const EMBEDDED_MAP: &str = include_str!("../../maps/tower.toml");

/// A `Hint` entity before its tag is resolved against the controls sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct HintDef {
    pub pos: Vec2,
    pub height: f64,
    pub tag: String,
}

/// Everything about a map except the obstacles themselves.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub grid_size: f64,
    /// World size in map pixels
    pub width: f64,
    pub height: f64,
    /// Player origin at the start of every attempt.
    pub start: Vec2,
    pub finish: Rect,
    pub hints: Vec<HintDef>,
}

impl Level {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

// ── TOML Schema ──

#[derive(Deserialize, Debug)]
struct MapFile {
    #[serde(default)]
    name: String,
    #[serde(default = "default_grid")]
    grid_size: u32,
    #[serde(default)]
    layers: Vec<MapLayer>,
    #[serde(default)]
    entities: Vec<MapEntity>,
}

#[derive(Deserialize, Debug)]
struct MapLayer {
    identifier: String,
    #[serde(default)]
    offset_x: f64,
    #[serde(default)]
    offset_y: f64,
    #[serde(default)]
    tiles: String,
}

#[derive(Deserialize, Debug)]
struct MapEntity {
    identifier: String,
    x: f64,
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    tag: String,
}

fn default_grid() -> u32 { 16 }

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse a map document and build its spatial index.
pub fn load_map(name: &str, text: &str) -> Result<(Level, SpatialIndex), LoadError> {
    let map: MapFile = toml::from_str(text).map_err(|source| LoadError::MapSyntax {
        name: name.to_string(),
        source,
    })?;
    if map.grid_size == 0 {
        return Err(LoadError::BadGridSize(map.grid_size));
    }
    let grid = map.grid_size as f64;
    let mut space = SpatialIndex::new(grid);
    let (mut width, mut height) = (0.0f64, 0.0f64);

    for required in ["Floor", "Walls"] {
        if !map.layers.iter().any(|l| l.identifier == required) {
            return Err(LoadError::MissingLayer(required.to_string()));
        }
    }

    for layer in &map.layers {
        let kind = layer_kind(&layer.identifier)?;
        let (w, h) = ingest_layer(&mut space, layer, kind, grid)?;
        width = width.max(w);
        height = height.max(h);
    }

    let start = entity(&map, "Player_start")?;
    let start = start.center();
    let finish = entity(&map, "Finish")?;
    space.insert(Shape::Rect(finish), TagSet::of(&[Terrain::Finish]), Layer::Entities);

    let hints = map.entities.iter()
        .filter(|e| e.identifier == "Hint")
        .map(|e| HintDef { pos: Vec2::new(e.x, e.y), height: e.height, tag: e.tag.clone() })
        .collect();

    for e in &map.entities {
        if !matches!(e.identifier.as_str(), "Player_start" | "Finish" | "Hint") {
            log::debug!("map '{name}': ignoring entity '{}'", e.identifier);
        }
    }

    let level = Level {
        name: if map.name.is_empty() { name.to_string() } else { map.name },
        grid_size: grid,
        width,
        height,
        start,
        finish,
        hints,
    };
    log::info!(
        "map '{}' loaded: {}x{} px, {} obstacles",
        level.name, level.width, level.height, space.len()
    );
    Ok((level, space))
}

// ══════════════════════════════════════════════════════════════
// Layers and entities
// ══════════════════════════════════════════════════════════════

fn layer_kind(identifier: &str) -> Result<Layer, LoadError> {
    match identifier {
        "Floor" => Ok(Layer::Floor),
        "Walls" => Ok(Layer::Walls),
        "Invisible" => Ok(Layer::Invisible),
        "Decoration" => Ok(Layer::Decoration),
        other => Err(LoadError::UnknownLayer(other.to_string())),
    }
}

/// Insert one obstacle per tile. Returns the layer extent in pixels.
fn ingest_layer(
    space: &mut SpatialIndex,
    layer: &MapLayer,
    kind: Layer,
    grid: f64,
) -> Result<(f64, f64), LoadError> {
    let mut cols = 0usize;
    let rows: Vec<&str> = layer.tiles.lines().collect();

    for (row, line) in rows.iter().enumerate() {
        cols = cols.max(line.chars().count());
        for (col, glyph) in line.chars().enumerate() {
            if glyph == '.' || glyph == ' ' { continue; }
            let terrain = glyph.to_digit(36)
                .and_then(Terrain::from_tile_id)
                .ok_or_else(|| LoadError::UnknownTile {
                    layer: layer.identifier.clone(),
                    col,
                    row,
                    glyph,
                })?;
            // Decoration is never solid, whatever layer it sits on
            let terrain = if kind == Layer::Decoration { Terrain::Decoration } else { terrain };
            space.insert(
                Shape::rect(
                    layer.offset_x + col as f64 * grid,
                    layer.offset_y + row as f64 * grid,
                    grid,
                    grid,
                ),
                TagSet::of(&[terrain]),
                kind,
            );
        }
    }

    Ok((
        layer.offset_x + cols as f64 * grid,
        layer.offset_y + rows.len() as f64 * grid,
    ))
}

fn entity(map: &MapFile, identifier: &str) -> Result<Rect, LoadError> {
    map.entities.iter()
        .find(|e| e.identifier == identifier)
        .map(|e| Rect::new(e.x, e.y, e.width, e.height))
        .ok_or_else(|| LoadError::MissingEntity(identifier.to_string()))
}

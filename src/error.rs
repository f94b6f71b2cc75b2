/// Load-time error taxonomy.
///
/// Everything that can go wrong while reading the map, the sprite sheets
/// or the rest of the asset store ends up here. These are authoring or
/// packaging bugs: the game refuses to start rather than guessing.
/// Nothing in the per-tick simulation returns a `LoadError`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map '{name}' is not valid TOML: {source}")]
    MapSyntax {
        name: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("sprite sheet '{sheet}' is not valid JSON: {source}")]
    SpriteSyntax {
        sheet: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("layer '{layer}' has unknown tile id '{glyph}' at column {col}, row {row}")]
    UnknownTile {
        layer: String,
        col: usize,
        row: usize,
        glyph: char,
    },
    #[error("map has unknown layer '{0}'")]
    UnknownLayer(String),
    #[error("map has no '{0}' layer")]
    MissingLayer(String),
    #[error("map has no '{0}' entity")]
    MissingEntity(String),
    #[error("map grid size must be positive, got {0}")]
    BadGridSize(u32),
    #[error("sprite sheet '{sheet}' has no frame tag '{tag}'")]
    MissingFrameTag { sheet: String, tag: String },
    #[error("frame tag '{tag}' ({from}..={to}) is outside the {frames} frames of '{sheet}'")]
    BadFrameRange {
        sheet: String,
        tag: String,
        from: usize,
        to: usize,
        frames: usize,
    },
    #[error("asset loader stopped before delivering the asset store")]
    LoaderGone,
}

use std::path::PathBuf;

use thiserror::Error;

use crate::color::ColorError;

/// Failures that abort a whole open/save/export call. The in-memory document
/// is unchanged when one of these is returned.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed project file: {0}")]
    Parse(#[from] quick_xml::de::DeError),
    #[error("unable to serialize project: {0}")]
    Serialize(#[from] quick_xml::se::SeError),
    #[error("unsupported project file version '{0}'")]
    Version(String),
}

/// Structural problems in one `<palette16>` block. The palette is left as it
/// was before the load was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteLoadError {
    #[error("incorrect number of subpalettes in palette '{palette}': found {found}, expected 16")]
    SubpaletteCount { palette: String, found: usize },
    #[error("expected subpalette id = {expected} in palette '{palette}', found '{found}'")]
    SubpaletteId {
        palette: String,
        expected: usize,
        found: String,
    },
    #[error("wrong number of colors in subpalette {subpalette} of palette '{palette}': found {found}, expected 16")]
    ColorCount {
        palette: String,
        subpalette: usize,
        found: usize,
    },
    #[error("unable to parse color value in subpalette {subpalette} of palette '{palette}': {source}")]
    Color {
        palette: String,
        subpalette: usize,
        #[source]
        source: ColorError,
    },
}

/// One entity of a project file that could not be loaded. Loading carries on
/// with the rest of the file.
#[derive(Debug, Error)]
pub enum EntityLoadError {
    #[error(transparent)]
    Palette(#[from] PaletteLoadError),
    #[error("unable to load {kind} '{name}': {message}")]
    Invalid {
        kind: &'static str,
        name: String,
        message: String,
    },
}

use serde::{Deserialize, Serialize};

pub type ColorValue = u8; // Color channel value (0-31)
pub type ColorIdx = u8; // Index into 4bpp subpalette (0-15)
pub type SubpaletteIdx = u8; // Index into a palette's subpalettes (0-15)
pub type Color555 = u16; // Packed 15-bit BGR color, as stored by the hardware
pub type ColorRGB = (ColorValue, ColorValue, ColorValue);

pub type PaletteId = u32;
pub type SpritesetId = u32;
pub type SpriteId = u32; // Stable id, assigned by the owning spriteset on creation
pub type MapId = u32;

pub const TILE_SIZE: usize = 8;
pub const NUM_COLORS: usize = 16;
pub const NUM_SUBPALETTES: usize = 16;

/// Foreground (object) data and background data are kept in separate
/// collections with identical structure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetKind {
    Foreground,
    Background,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    GBA,
    NDS,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Platform::GBA => "GBA",
            Platform::NDS => "NDS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GBA" => Some(Platform::GBA),
            "NDS" => Some(Platform::NDS),
            _ => None,
        }
    }
}

/// Project-wide display and target options. Stored in the project file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub platform: Platform,
    pub sprite_show_pixel_grid: bool,
    pub sprite_show_tile_grid: bool,
    pub sprite_show_transparent_marker: bool,
    pub sprite_show_palette_index: bool,
    pub palette_show_transparent_marker: bool,
    pub palette_show_palette_index: bool,
    pub bgmap_show_grid: bool,
    pub bgmap_show_screen: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            platform: Platform::GBA,
            sprite_show_pixel_grid: true,
            sprite_show_tile_grid: true,
            sprite_show_transparent_marker: true,
            sprite_show_palette_index: false,
            palette_show_transparent_marker: true,
            palette_show_palette_index: false,
            bgmap_show_grid: true,
            bgmap_show_screen: true,
        }
    }
}

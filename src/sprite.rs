use anyhow::{ensure, Result};
use log::warn;

use crate::{
    common::{ColorIdx, SpriteId, SubpaletteIdx, TILE_SIZE},
    helpers::scale_rgb,
    palette::Subpalette,
    tile::Tile,
};

mod fill;
mod geometry;

pub use fill::ClickResult;
pub use geometry::{RotateDirection, ShiftDirection};

//  SQUARE  SIZE_8   8 x 8       1 tile
//  SQUARE  SIZE_16  16 x 16     4
//  SQUARE  SIZE_32  32 x 32     16
//  SQUARE  SIZE_64  64 x 64     64
//  WIDE    SIZE_8   16 x 8      2
//  WIDE    SIZE_16  32 x 8      4
//  WIDE    SIZE_32  32 x 16     8
//  WIDE    SIZE_64  64 x 32     32
//  TALL    SIZE_8   8 x 16      2
//  TALL    SIZE_16  8 x 32      4
//  TALL    SIZE_32  16 x 32     8
//  TALL    SIZE_64  32 x 64     32
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Square,
    Wide,
    Tall,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Size {
    Size8,
    Size16,
    Size32,
    Size64,
}

impl Shape {
    pub fn symbol(self) -> &'static str {
        match self {
            Shape::Square => "ATTR0_SQUARE",
            Shape::Wide => "ATTR0_WIDE",
            Shape::Tall => "ATTR0_TALL",
        }
    }
}

impl Size {
    pub fn symbol(self) -> &'static str {
        match self {
            Size::Size8 => "ATTR1_SIZE_8",
            Size::Size16 => "ATTR1_SIZE_16",
            Size::Size32 => "ATTR1_SIZE_32",
            Size::Size64 => "ATTR1_SIZE_64",
        }
    }
}

/// Hardware shape/size for a sprite of the given dimensions (in tiles), or
/// `None` if the hardware has no such object size.
pub fn shape_size(width: usize, height: usize) -> Option<(Shape, Size)> {
    let entry = match (width, height) {
        (1, 1) => (Shape::Square, Size::Size8),
        (2, 2) => (Shape::Square, Size::Size16),
        (4, 4) => (Shape::Square, Size::Size32),
        (8, 8) => (Shape::Square, Size::Size64),
        (2, 1) => (Shape::Wide, Size::Size8),
        (4, 1) => (Shape::Wide, Size::Size16),
        (4, 2) => (Shape::Wide, Size::Size32),
        (8, 4) => (Shape::Wide, Size::Size64),
        (1, 2) => (Shape::Tall, Size::Size8),
        (1, 4) => (Shape::Tall, Size::Size16),
        (2, 4) => (Shape::Tall, Size::Size32),
        (4, 8) => (Shape::Tall, Size::Size64),
        _ => return None,
    };
    Some(entry)
}

pub fn is_valid_size(width: usize, height: usize) -> bool {
    shape_size(width, height).is_some()
}

/// All user-editable state of a sprite. Used only to detect change and to
/// restore state for undo/redo, never for rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoData {
    pub subpalette: SubpaletteIdx,
    pub name: String,
    pub description: String,
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Tile>,
}

#[derive(Clone, Debug)]
struct Bitmap {
    colors: [u16; 16],
    rgb: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Sprite {
    id: SpriteId,
    pub name: String,
    pub description: String,
    pub subpalette: SubpaletteIdx,
    width: usize,  // in tiles
    height: usize, // in tiles
    tiles: Vec<Tile>,
    snapshot: UndoData,
    pub(crate) export_id: u32,
    pub(crate) first_tile_id: u32,
    bitmap: Option<Bitmap>,
}

impl Sprite {
    pub(crate) fn new(
        id: SpriteId,
        width: usize,
        height: usize,
        name: &str,
        description: &str,
        subpalette: SubpaletteIdx,
    ) -> Self {
        let mut sprite = Sprite {
            id,
            name: name.to_string(),
            description: description.to_string(),
            subpalette,
            width,
            height,
            tiles: vec![Tile::default(); width * height],
            snapshot: UndoData {
                subpalette,
                name: String::new(),
                description: String::new(),
                width,
                height,
                tiles: vec![],
            },
            export_id: 0,
            first_tile_id: 0,
            bitmap: None,
        };
        // Initial snapshot of the (empty) sprite.
        sprite.record_snapshot();
        sprite
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    /// Width in tiles.
    pub fn tile_width(&self) -> usize {
        self.width
    }

    /// Height in tiles.
    pub fn tile_height(&self) -> usize {
        self.height
    }

    pub fn num_tiles(&self) -> usize {
        self.width * self.height
    }

    pub fn pixel_width(&self) -> usize {
        self.width * TILE_SIZE
    }

    pub fn pixel_height(&self) -> usize {
        self.height * TILE_SIZE
    }

    pub fn is_size(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height
    }

    pub fn shape_size(&self) -> Option<(Shape, Size)> {
        shape_size(self.width, self.height)
    }

    /// Valid only after an export id pass.
    pub fn export_id(&self) -> u32 {
        self.export_id
    }

    /// Valid only after an export id pass.
    pub fn first_tile_id(&self) -> u32 {
        self.first_tile_id
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Out-of-range indices fall back to tile 0.
    pub fn tile(&self, idx: usize) -> &Tile {
        let idx = if idx < self.tiles.len() { idx } else { 0 };
        &self.tiles[idx]
    }

    pub fn tile_mut(&mut self, idx: usize) -> &mut Tile {
        let idx = if idx < self.tiles.len() { idx } else { 0 };
        self.bitmap = None;
        &mut self.tiles[idx]
    }

    // Sprite pixel (x, y) -> (tile index, tile-local x, tile-local y).
    fn locate(&self, x: usize, y: usize) -> (usize, usize, usize) {
        let tile_idx = (y / TILE_SIZE) * self.width + (x / TILE_SIZE);
        (tile_idx, x % TILE_SIZE, y % TILE_SIZE)
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> ColorIdx {
        let (t, px, py) = self.locate(x, y);
        self.tiles[t].get_pixel(px, py)
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: ColorIdx) {
        let (t, px, py) = self.locate(x, y);
        self.tiles[t].set_pixel(px, py, color);
        self.bitmap = None;
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.pixel_width() && y < self.pixel_height()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(Tile::is_empty)
    }

    pub fn clear(&mut self) {
        self.tiles.iter_mut().for_each(Tile::clear);
        self.flush_bitmaps();
    }

    /// Copy tile data from `source`. Sprites of different dimensions are left
    /// untouched.
    pub fn copy_data(&mut self, source: &Sprite) {
        if !self.is_size(source.width, source.height) {
            return;
        }
        for (dst, src) in self.tiles.iter_mut().zip(&source.tiles) {
            dst.copy_data(src);
        }
        self.flush_bitmaps();
    }

    pub fn duplicate_from(&mut self, source: &Sprite) {
        self.copy_data(source);
        self.subpalette = source.subpalette;
    }

    /// Load one tile of data. Returns false (after logging a warning) when the
    /// index is past the end of the sprite; the data is dropped.
    pub fn import_tile(&mut self, idx: usize, tile: &Tile) -> bool {
        if idx >= self.num_tiles() {
            warn!("Too many tiles specified for sprite '{}'. Ignoring extra tiles.", self.name);
            return false;
        }
        self.tiles[idx] = *tile;
        self.bitmap = None;
        true
    }

    pub fn flush_bitmaps(&mut self) {
        self.bitmap = None;
    }

    /// RGB888 rendering of the sprite (row-major, 3 bytes per pixel). The
    /// result is cached until the pixels or the subpalette colors change.
    pub fn bitmap(&mut self, subpalette: &Subpalette) -> &[u8] {
        let colors = *subpalette.colors();
        let stale = self.bitmap.as_ref().map_or(true, |b| b.colors != colors);
        if stale {
            let (w, h) = (self.pixel_width(), self.pixel_height());
            let mut rgb = Vec::with_capacity(w * h * 3);
            for y in 0..h {
                for x in 0..w {
                    rgb.extend_from_slice(&scale_rgb(subpalette.rgb(self.get_pixel(x, y))));
                }
            }
            self.bitmap = Some(Bitmap { colors, rgb });
        }
        match &self.bitmap {
            Some(b) => &b.rgb,
            None => &[],
        }
    }

    pub fn has_cached_bitmap(&self) -> bool {
        self.bitmap.is_some()
    }

    // Swap in a new tile array; callers guarantee tiles.len() == width * height.
    fn replace_tiles(&mut self, width: usize, height: usize, tiles: Vec<Tile>) {
        debug_assert_eq!(tiles.len(), width * height);
        self.width = width;
        self.height = height;
        self.tiles = tiles;
        self.flush_bitmaps();
    }

    pub fn undo_data(&self) -> UndoData {
        UndoData {
            subpalette: self.subpalette,
            name: self.name.clone(),
            description: self.description.clone(),
            width: self.width,
            height: self.height,
            tiles: self.tiles.clone(),
        }
    }

    pub fn snapshot(&self) -> &UndoData {
        &self.snapshot
    }

    pub fn record_snapshot(&mut self) {
        self.snapshot = self.undo_data();
    }

    /// Compare the current state against the last snapshot. If anything
    /// changed, the current state becomes the new snapshot and the pair
    /// (previous snapshot, new snapshot) is returned.
    pub fn take_undo_diff(&mut self) -> Option<(UndoData, UndoData)> {
        let data = self.undo_data();
        if data == self.snapshot {
            return None;
        }
        let before = std::mem::replace(&mut self.snapshot, data.clone());
        Some((before, data))
    }

    pub fn apply_undo_data(&mut self, undo: &UndoData) -> Result<()> {
        ensure!(
            undo.tiles.len() == undo.width * undo.height,
            "undo data for sprite '{}' has {} tiles, expected {}",
            undo.name,
            undo.tiles.len(),
            undo.width * undo.height
        );
        if undo.tiles.len() != self.tiles.len() {
            self.tiles = vec![Tile::default(); undo.tiles.len()];
        }
        self.name = undo.name.clone();
        self.description = undo.description.clone();
        self.subpalette = undo.subpalette;
        self.width = undo.width;
        self.height = undo.height;
        for (dst, src) in self.tiles.iter_mut().zip(&undo.tiles) {
            dst.copy_data(src);
        }
        self.flush_bitmaps();
        self.record_snapshot();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::DefaultColorSet;

    pub(crate) fn patterned(width: usize, height: usize) -> Sprite {
        let mut s = Sprite::new(1, width, height, "s", "", 0);
        for y in 0..s.pixel_height() {
            for x in 0..s.pixel_width() {
                s.set_pixel(x, y, ((x * 7 + y * 3) % 16) as ColorIdx);
            }
        }
        s
    }

    #[test]
    fn pixel_addressing_crosses_tiles() {
        let mut s = Sprite::new(1, 2, 2, "s", "", 0);
        s.set_pixel(9, 3, 5);
        assert_eq!(s.tile(1).get_pixel(1, 3), 5);
        s.set_pixel(2, 12, 6);
        assert_eq!(s.tile(2).get_pixel(2, 4), 6);
        assert_eq!(s.get_pixel(9, 3), 5);
    }

    #[test]
    fn tile_lookup_clamps_to_zero() {
        let mut s = Sprite::new(1, 1, 2, "s", "", 0);
        s.set_pixel(0, 0, 3);
        assert_eq!(s.tile(99).get_pixel(0, 0), 3);
    }

    #[test]
    fn shape_table() {
        assert_eq!(shape_size(8, 4), Some((Shape::Wide, Size::Size64)));
        assert_eq!(shape_size(1, 4), Some((Shape::Tall, Size::Size16)));
        assert_eq!(shape_size(3, 3), None);
        assert!(!is_valid_size(8, 1));
    }

    #[test]
    fn copy_data_requires_matching_size() {
        let src = patterned(2, 2);
        let mut same = Sprite::new(2, 2, 2, "t", "", 0);
        same.copy_data(&src);
        assert_eq!(same.tiles(), src.tiles());

        let mut other = Sprite::new(3, 2, 1, "u", "", 0);
        other.copy_data(&src);
        assert!(other.is_empty());
    }

    #[test]
    fn import_tile_overflow_is_dropped() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        let mut t = Tile::default();
        t.set_pixel(0, 0, 2);
        assert!(s.import_tile(0, &t));
        assert!(!s.import_tile(1, &t));
        assert_eq!(s.num_tiles(), 1);
    }

    #[test]
    fn undo_diff_detects_real_change_only() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        assert!(s.take_undo_diff().is_none());
        s.set_pixel(1, 1, 4);
        s.set_pixel(1, 1, 0);
        assert!(s.take_undo_diff().is_none());
        s.set_pixel(1, 1, 4);
        let (before, after) = s.take_undo_diff().unwrap();
        assert!(before.tiles[0].is_empty());
        assert_eq!(after.tiles[0].get_pixel(1, 1), 4);
        assert_eq!(s.snapshot(), &after);
    }

    #[test]
    fn apply_undo_data_restores_everything() {
        let mut s = patterned(2, 2);
        s.name = "before".to_string();
        s.description = "desc".to_string();
        s.subpalette = 3;
        s.record_snapshot();
        let saved = s.undo_data();

        s.name = "after".to_string();
        s.description.clear();
        s.subpalette = 7;
        s.resize(4, 4, || true);
        s.flood_fill(0, 0, 15);

        s.apply_undo_data(&saved).unwrap();
        assert_eq!(s.undo_data(), saved);
        assert_eq!(s.snapshot(), &saved);
        assert_eq!(s.num_tiles(), 4);
    }

    #[test]
    fn bitmap_cache_follows_edits() {
        let sp = Subpalette::new(DefaultColorSet::GrayScale);
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        assert_eq!(&s.bitmap(&sp)[0..3], &[255, 255, 255]);
        assert!(s.has_cached_bitmap());
        s.flood_fill(0, 0, 15);
        assert!(!s.has_cached_bitmap());
        assert_eq!(&s.bitmap(&sp)[0..3], &[0, 0, 0]);
        assert_eq!(s.bitmap(&sp).len(), 8 * 8 * 3);
    }
}

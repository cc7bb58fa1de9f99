use anyhow::{ensure, Context, Result};
use itertools::Itertools;

use crate::common::{MapId, SpritesetId, SubpaletteIdx};

pub const DEFAULT_MAP_SIZE: usize = 32;
/// Largest text-mode background, in tiles per side.
pub const MAX_MAP_SIZE: usize = 64;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MapEntry {
    pub tile: u16, // 0-1023
    pub hflip: bool,
    pub vflip: bool,
    pub subpalette: SubpaletteIdx,
}

impl MapEntry {
    pub fn to_word(self) -> u16 {
        (self.tile & 0x3FF)
            | (self.hflip as u16) << 10
            | (self.vflip as u16) << 11
            | (self.subpalette as u16 & 0xF) << 12
    }

    pub fn from_word(w: u16) -> Self {
        Self {
            tile: w & 0x3FF,
            hflip: (w >> 10) & 1 == 1,
            vflip: (w >> 11) & 1 == 1,
            subpalette: (w >> 12) as SubpaletteIdx,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BackgroundMap {
    pub name: String,
    pub id: MapId,
    pub desc: String,
    pub spriteset_id: SpritesetId,
    width: usize,
    height: usize,
    entries: Vec<MapEntry>,
    pub(crate) export_id: u32,
}

impl BackgroundMap {
    pub fn new(
        name: &str,
        id: MapId,
        desc: &str,
        spriteset_id: SpritesetId,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        ensure!(
            (1..=MAX_MAP_SIZE).contains(&width) && (1..=MAX_MAP_SIZE).contains(&height),
            "invalid map size {}x{} for '{}' (1 to {} tiles per side)",
            width,
            height,
            name,
            MAX_MAP_SIZE
        );
        Ok(BackgroundMap {
            name: name.to_string(),
            id,
            desc: desc.to_string(),
            spriteset_id,
            width,
            height,
            entries: vec![MapEntry::default(); width * height],
            export_id: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn get(&self, x: usize, y: usize) -> Option<MapEntry> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.entries[y * self.width + x])
    }

    pub fn set(&mut self, x: usize, y: usize, entry: MapEntry) -> Result<()> {
        ensure!(
            x < self.width && y < self.height,
            "map position ({}, {}) outside {}x{} map '{}'",
            x,
            y,
            self.width,
            self.height,
            self.name
        );
        self.entries[y * self.width + x] = entry;
        Ok(())
    }

    /// Row as stored in the project file: space-separated 4-digit hex words.
    pub fn row_text(&self, y: usize) -> String {
        self.entries[y * self.width..(y + 1) * self.width]
            .iter()
            .map(|e| format!("{:04x}", e.to_word()))
            .join(" ")
    }

    pub fn set_row_text(&mut self, y: usize, text: &str) -> Result<()> {
        ensure!(y < self.height, "too many rows in map '{}'", self.name);
        let words: Vec<u16> = text
            .split_whitespace()
            .map(|w| u16::from_str_radix(w, 16).with_context(|| format!("invalid map entry '{}'", w)))
            .collect::<Result<_>>()?;
        ensure!(
            words.len() == self.width,
            "map '{}' row {} has {} entries, expected {}",
            self.name,
            y,
            words.len(),
            self.width
        );
        for (x, w) in words.into_iter().enumerate() {
            self.entries[y * self.width + x] = MapEntry::from_word(w);
        }
        Ok(())
    }

    pub fn export_id(&self) -> u32 {
        self.export_id
    }
}

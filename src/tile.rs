use anyhow::{ensure, Context, Result};

use crate::common::{ColorIdx, TILE_SIZE};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    pub pixels: [[ColorIdx; TILE_SIZE]; TILE_SIZE],
}

impl Tile {
    pub fn get_pixel(&self, x: usize, y: usize) -> ColorIdx {
        self.pixels[y][x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: ColorIdx) {
        self.pixels[y][x] = color & 0x0F;
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.iter().flatten().all(|&c| c == 0)
    }

    pub fn clear(&mut self) {
        self.pixels = [[0; TILE_SIZE]; TILE_SIZE];
    }

    pub fn copy_data(&mut self, other: &Tile) {
        self.pixels = other.pixels;
    }

    /// Row as stored in the project file: one hex digit per pixel, left to right.
    pub fn row_text(&self, y: usize) -> String {
        self.pixels[y].iter().map(|c| format!("{:x}", c)).collect()
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Tile> {
        ensure!(
            rows.len() == TILE_SIZE,
            "expected {} rows of tile data, found {}",
            TILE_SIZE,
            rows.len()
        );
        let mut tile = Tile::default();
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref().trim();
            ensure!(
                row.len() == TILE_SIZE,
                "tile row '{}' must have {} pixels",
                row,
                TILE_SIZE
            );
            for (x, ch) in row.chars().enumerate() {
                let c = ch
                    .to_digit(16)
                    .with_context(|| format!("invalid pixel '{}' in tile row '{}'", ch, row))?;
                tile.pixels[y][x] = c as ColorIdx;
            }
        }
        Ok(tile)
    }

    /// 4bpp packed form: 4 bytes per row, the low nibble holds the left pixel.
    pub fn to_4bpp(&self) -> [u8; 32] {
        let mut out = [0; 32];
        for y in 0..TILE_SIZE {
            for x in (0..TILE_SIZE).step_by(2) {
                out[y * 4 + x / 2] = self.pixels[y][x] | self.pixels[y][x + 1] << 4;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_every_pixel() {
        let mut tile = Tile::default();
        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                let c = ((x + y * 3) % 16) as ColorIdx;
                tile.set_pixel(x, y, c);
                assert_eq!(tile.get_pixel(x, y), c);
            }
        }
    }

    #[test]
    fn empty_means_all_zero() {
        let mut tile = Tile::default();
        assert!(tile.is_empty());
        tile.set_pixel(7, 7, 1);
        assert!(!tile.is_empty());
        tile.clear();
        assert!(tile.is_empty());
    }

    #[test]
    fn rows_text_form() {
        let mut tile = Tile::default();
        tile.set_pixel(0, 0, 0xA);
        tile.set_pixel(7, 3, 0xF);
        let rows: Vec<String> = (0..TILE_SIZE).map(|y| tile.row_text(y)).collect();
        assert_eq!(rows[0], "a0000000");
        assert_eq!(rows[3], "0000000f");
        assert_eq!(Tile::from_rows(&rows).unwrap(), tile);
        assert!(Tile::from_rows(&rows[..7]).is_err());
        assert!(Tile::from_rows(&["0000000x"; 8]).is_err());
    }

    #[test]
    fn packs_low_nibble_first() {
        let mut tile = Tile::default();
        tile.set_pixel(0, 0, 1);
        tile.set_pixel(1, 0, 2);
        tile.set_pixel(7, 7, 3);
        let data = tile.to_4bpp();
        assert_eq!(data[0], 0x21);
        assert_eq!(data[31], 0x30);
    }
}

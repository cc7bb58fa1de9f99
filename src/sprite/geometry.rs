use serde::{Deserialize, Serialize};

use super::Sprite;
use crate::{common::TILE_SIZE, tile::Tile};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    Clockwise90,
    Counterclockwise90,
    Clockwise180,
}

impl RotateDirection {
    // Offset into the 4-pixel group when rotating a square ring.
    fn ring_offset(self) -> usize {
        match self {
            RotateDirection::Clockwise90 => 3,
            RotateDirection::Counterclockwise90 => 1,
            RotateDirection::Clockwise180 => 2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftDirection {
    Left,
    Right,
    Up,
    Down,
}

impl Sprite {
    /// Would resizing to (width, height) tiles discard any non-empty tile?
    pub fn clips_data(&self, width: usize, height: usize) -> bool {
        let (old_w, old_h) = (self.width, self.height);
        if old_w <= width && old_h <= height {
            return false;
        }
        // Columns that disappear, over every old row.
        for ix in width..old_w {
            for iy in 0..old_h {
                if !self.tiles[iy * old_w + ix].is_empty() {
                    return true;
                }
            }
        }
        // Rows that disappear, restricted to the columns not covered above.
        let min_w = old_w.min(width);
        for iy in height..old_h {
            for ix in 0..min_w {
                if !self.tiles[iy * old_w + ix].is_empty() {
                    return true;
                }
            }
        }
        false
    }

    /// Resize to (width, height) tiles. If the new size would discard data,
    /// `confirm` decides whether to go ahead. Returns true if the sprite
    /// changed size.
    pub fn resize(&mut self, width: usize, height: usize, confirm: impl FnOnce() -> bool) -> bool {
        if self.is_size(width, height) || !super::is_valid_size(width, height) {
            return false;
        }
        if self.clips_data(width, height) && !confirm() {
            return false;
        }

        let (old_w, old_h) = (self.width, self.height);
        let mut tiles = vec![Tile::default(); width * height];
        for iy in 0..height.min(old_h) {
            for ix in 0..width.min(old_w) {
                tiles[iy * width + ix].copy_data(&self.tiles[iy * old_w + ix]);
            }
        }
        self.replace_tiles(width, height, tiles);
        true
    }

    pub fn rotate(&mut self, dir: RotateDirection) {
        if dir == RotateDirection::Clockwise180 {
            self.rotate_180();
        } else if self.width == self.height {
            self.rotate_square(dir);
        } else {
            self.rotate_rect(dir);
        }
    }

    // Rotate a square sprite in place, from the outer ring of pixels inwards.
    // Within a ring, each group of 4 pixels (one per side, same distance
    // along the side) is cycled one step.
    fn rotate_square(&mut self, dir: RotateDirection) {
        let offset = dir.ring_offset();
        let size = self.pixel_width();
        for ring in 0..size / 2 {
            let first = ring;
            let last = size - ring - 1;
            for px in 0..(last - first) {
                let positions = [
                    (first + px, first),
                    (last, first + px),
                    (last - px, last),
                    (first, last - px),
                ];
                let vals = positions.map(|(x, y)| self.get_pixel(x, y));
                for (i, &(x, y)) in positions.iter().enumerate() {
                    self.set_pixel(x, y, vals[(i + offset) % 4]);
                }
            }
        }
    }

    // Rotate a non-square sprite by 90 degrees. The dimensions swap, so this
    // builds a new tile array.
    fn rotate_rect(&mut self, dir: RotateDirection) {
        let (old_pw, old_ph) = (self.pixel_width(), self.pixel_height());
        let (new_w, new_h) = (self.height, self.width);
        let mut tiles = vec![Tile::default(); new_w * new_h];
        for iy in 0..old_ph {
            for ix in 0..old_pw {
                let (nx, ny) = match dir {
                    RotateDirection::Clockwise90 => (old_ph - 1 - iy, ix),
                    _ => (iy, old_pw - 1 - ix),
                };
                let t = (ny / TILE_SIZE) * new_w + nx / TILE_SIZE;
                tiles[t].set_pixel(nx % TILE_SIZE, ny % TILE_SIZE, self.get_pixel(ix, iy));
            }
        }
        self.replace_tiles(new_w, new_h, tiles);
    }

    // Rotate by 180 degrees in place, swapping pairs of rows from the outside in.
    fn rotate_180(&mut self) {
        let (pw, ph) = (self.pixel_width(), self.pixel_height());
        for row in 0..ph / 2 {
            let bottom_row = ph - row - 1;
            for px in 0..pw {
                let top = self.get_pixel(px, row);
                let bottom = self.get_pixel(pw - 1 - px, bottom_row);
                self.set_pixel(px, row, bottom);
                self.set_pixel(pw - 1 - px, bottom_row, top);
            }
        }
    }

    pub fn flip(&mut self, horizontal: bool, vertical: bool) {
        let (pw, ph) = (self.pixel_width(), self.pixel_height());

        // Flipping both axes is a 180 degree rotation, done in a single pass.
        if horizontal && vertical {
            self.rotate_180();
            return;
        }

        if horizontal {
            for y in 0..ph {
                for x in 0..pw / 2 {
                    let c = self.get_pixel(x, y);
                    self.set_pixel(x, y, self.get_pixel(pw - 1 - x, y));
                    self.set_pixel(pw - 1 - x, y, c);
                }
            }
        }

        if vertical {
            for x in 0..pw {
                for y in 0..ph / 2 {
                    let c = self.get_pixel(x, y);
                    self.set_pixel(x, y, self.get_pixel(x, ph - 1 - y));
                    self.set_pixel(x, ph - 1 - y, c);
                }
            }
        }
    }

    pub fn shift_pixels(&mut self, dir: ShiftDirection) {
        let (pw, ph) = (self.pixel_width(), self.pixel_height());
        match dir {
            ShiftDirection::Left => {
                for x in 1..pw {
                    for y in 0..ph {
                        self.set_pixel(x - 1, y, self.get_pixel(x, y));
                    }
                }
                for y in 0..ph {
                    self.set_pixel(pw - 1, y, 0);
                }
            }
            ShiftDirection::Right => {
                for x in (1..pw).rev() {
                    for y in 0..ph {
                        self.set_pixel(x, y, self.get_pixel(x - 1, y));
                    }
                }
                for y in 0..ph {
                    self.set_pixel(0, y, 0);
                }
            }
            ShiftDirection::Up => {
                for y in 1..ph {
                    for x in 0..pw {
                        self.set_pixel(x, y - 1, self.get_pixel(x, y));
                    }
                }
                for x in 0..pw {
                    self.set_pixel(x, ph - 1, 0);
                }
            }
            ShiftDirection::Down => {
                for y in (1..ph).rev() {
                    for x in 0..pw {
                        self.set_pixel(x, y, self.get_pixel(x, y - 1));
                    }
                }
                for x in 0..pw {
                    self.set_pixel(x, 0, 0);
                }
            }
        }
        self.flush_bitmaps();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::tests::patterned;

    fn pixels(s: &Sprite) -> Vec<u8> {
        let mut out = vec![];
        for y in 0..s.pixel_height() {
            for x in 0..s.pixel_width() {
                out.push(s.get_pixel(x, y));
            }
        }
        out
    }

    #[test]
    fn resize_round_trip_without_clipping() {
        let mut s = patterned(2, 2);
        let orig = pixels(&s);
        assert!(s.resize(4, 4, || panic!("no data is clipped")));
        assert_eq!(s.num_tiles(), 16);
        assert!(s.tile(3).is_empty());
        assert!(s.tile(15).is_empty());
        assert!(s.resize(2, 2, || panic!("only blank tiles are clipped")));
        assert_eq!(pixels(&s), orig);
    }

    #[test]
    fn resize_same_size_is_noop() {
        let mut s = patterned(2, 2);
        assert!(!s.resize(2, 2, || true));
    }

    #[test]
    fn resize_rejects_unlisted_sizes() {
        let mut s = patterned(2, 2);
        assert!(!s.resize(3, 1, || true));
        assert!(!s.resize(0, 2, || true));
        assert!(!s.resize(usize::MAX, 2, || true));
        assert!(s.is_size(2, 2));
    }

    #[test]
    fn resize_declined_leaves_sprite_untouched() {
        let mut s = patterned(4, 2);
        let orig = s.tiles().to_vec();
        assert!(!s.resize(2, 2, || false));
        assert!(s.is_size(4, 2));
        assert_eq!(s.tiles(), &orig[..]);

        assert!(s.resize(2, 2, || true));
        assert!(s.is_size(2, 2));
        assert_eq!(s.tiles()[2], orig[4]);
    }

    #[test]
    fn clip_scan_covers_both_strips() {
        // Data only in the bottom-left tile: caught by the row pass.
        let mut s = Sprite::new(1, 2, 2, "s", "", 0);
        s.set_pixel(0, 8, 1);
        assert!(s.clips_data(2, 1));
        assert!(!s.clips_data(1, 2));

        // Data only in the bottom-right corner tile: caught by the column pass.
        let mut s = Sprite::new(1, 2, 2, "s", "", 0);
        s.set_pixel(15, 15, 1);
        assert!(s.clips_data(1, 1));
        assert!(s.clips_data(1, 2));
        assert!(s.clips_data(2, 1));
        assert!(!s.clips_data(4, 4));
    }

    #[test]
    fn four_clockwise_rotations_are_identity() {
        for (w, h) in [(2, 2), (4, 2), (1, 4)] {
            let mut s = patterned(w, h);
            let orig = pixels(&s);
            for _ in 0..4 {
                s.rotate(RotateDirection::Clockwise90);
            }
            assert!(s.is_size(w, h));
            assert_eq!(pixels(&s), orig);
        }
    }

    #[test]
    fn clockwise_then_counterclockwise_is_identity() {
        for (w, h) in [(2, 2), (2, 1)] {
            let mut s = patterned(w, h);
            let orig = pixels(&s);
            s.rotate(RotateDirection::Clockwise90);
            s.rotate(RotateDirection::Counterclockwise90);
            assert_eq!(pixels(&s), orig);
        }
    }

    #[test]
    fn clockwise_moves_top_left_to_top_right() {
        for (w, h) in [(1, 1), (2, 1)] {
            let mut s = Sprite::new(1, w, h, "s", "", 0);
            s.set_pixel(0, 0, 9);
            s.rotate(RotateDirection::Clockwise90);
            assert_eq!(s.get_pixel(s.pixel_width() - 1, 0), 9);

            let mut s = Sprite::new(1, w, h, "s", "", 0);
            s.set_pixel(0, 0, 9);
            s.rotate(RotateDirection::Counterclockwise90);
            assert_eq!(s.get_pixel(0, s.pixel_height() - 1), 9);
        }
    }

    #[test]
    fn rect_rotation_swaps_dimensions() {
        let mut s = patterned(4, 2);
        s.rotate(RotateDirection::Clockwise90);
        assert!(s.is_size(2, 4));
        assert_eq!(s.tiles().len(), 8);
    }

    #[test]
    fn rotate_180_matches_double_flip_and_both_axes() {
        let mut a = patterned(4, 2);
        let mut b = patterned(4, 2);
        let mut c = patterned(4, 2);
        a.rotate(RotateDirection::Clockwise180);
        b.flip(true, false);
        b.flip(false, true);
        c.flip(true, true);
        assert_eq!(pixels(&a), pixels(&b));
        assert_eq!(pixels(&a), pixels(&c));
    }

    #[test]
    fn flips_are_involutions() {
        let mut s = patterned(2, 4);
        let orig = pixels(&s);
        s.flip(true, false);
        assert_ne!(pixels(&s), orig);
        s.flip(true, false);
        assert_eq!(pixels(&s), orig);
        s.flip(false, true);
        s.flip(false, true);
        assert_eq!(pixels(&s), orig);
    }

    #[test]
    fn shift_discards_and_blanks() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        s.set_pixel(0, 0, 1);
        s.set_pixel(7, 7, 2);
        s.shift_pixels(ShiftDirection::Right);
        assert_eq!(s.get_pixel(1, 0), 1);
        assert_eq!(s.get_pixel(0, 0), 0);
        assert_eq!(s.get_pixel(7, 7), 0);
        s.shift_pixels(ShiftDirection::Down);
        assert_eq!(s.get_pixel(1, 1), 1);
        s.shift_pixels(ShiftDirection::Left);
        s.shift_pixels(ShiftDirection::Up);
        assert_eq!(s.get_pixel(0, 0), 1);
        assert_eq!(pixels(&s).iter().filter(|&&c| c != 0).count(), 1);
    }
}

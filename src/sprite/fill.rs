use super::Sprite;
use crate::{
    common::{ColorIdx, NUM_COLORS},
    message::ClickOp,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClickResult {
    Unchanged,
    Changed,
    /// The eyedropper picked this color; pixels are untouched.
    Picked(ColorIdx),
}

impl Sprite {
    /// Fill the 4-connected region containing (x, y) with `color`. Returns
    /// false, without writing anything, if the region already has that color
    /// or `color` is not a subpalette index.
    pub fn flood_fill(&mut self, x: usize, y: usize, color: ColorIdx) -> bool {
        if !self.contains(x, y) || color as usize >= NUM_COLORS {
            return false;
        }
        let old = self.get_pixel(x, y);
        if old == color {
            return false;
        }

        let (pw, ph) = (self.pixel_width(), self.pixel_height());
        let mut stack = vec![(x, y)];
        while let Some((px, py)) = stack.pop() {
            if self.get_pixel(px, py) != old {
                continue;
            }
            self.set_pixel(px, py, color);
            if px > 0 && self.get_pixel(px - 1, py) == old {
                stack.push((px - 1, py));
            }
            if px + 1 < pw && self.get_pixel(px + 1, py) == old {
                stack.push((px + 1, py));
            }
            if py > 0 && self.get_pixel(px, py - 1) == old {
                stack.push((px, py - 1));
            }
            if py + 1 < ph && self.get_pixel(px, py + 1) == old {
                stack.push((px, py + 1));
            }
        }

        self.flush_bitmaps();
        true
    }

    /// Apply one tool click at sprite pixel (x, y). Clicks outside the sprite
    /// are ignored, as are colors outside the subpalette.
    pub fn click(&mut self, x: usize, y: usize, op: ClickOp, current_color: ColorIdx) -> ClickResult {
        if !self.contains(x, y) || current_color as usize >= NUM_COLORS {
            return ClickResult::Unchanged;
        }
        let new_color = match op {
            ClickOp::FloodFill => {
                return if self.flood_fill(x, y, current_color) {
                    ClickResult::Changed
                } else {
                    ClickResult::Unchanged
                };
            }
            ClickOp::PickColor => return ClickResult::Picked(self.get_pixel(x, y)),
            ClickOp::Paint => current_color,
            ClickOp::Erase => 0,
        };
        if self.get_pixel(x, y) == new_color {
            return ClickResult::Unchanged;
        }
        self.set_pixel(x, y, new_color);
        ClickResult::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_same_color_is_noop() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        s.set_pixel(3, 3, 2);
        let before = s.undo_data();
        assert!(!s.flood_fill(3, 3, 2));
        assert_eq!(s.undo_data(), before);
    }

    #[test]
    fn fill_stops_at_boundary() {
        let mut s = Sprite::new(1, 2, 1, "s", "", 0);
        // Vertical wall at x = 4 splits the sprite in two regions.
        for y in 0..8 {
            s.set_pixel(4, y, 1);
        }
        assert!(s.flood_fill(0, 0, 3));
        for y in 0..8 {
            for x in 0..4 {
                assert_eq!(s.get_pixel(x, y), 3);
            }
            assert_eq!(s.get_pixel(4, y), 1);
            for x in 5..16 {
                assert_eq!(s.get_pixel(x, y), 0);
            }
        }
    }

    #[test]
    fn fill_is_four_connected() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        // Diagonal line: the pixels touch only at corners.
        for i in 0..8 {
            s.set_pixel(i, i, 5);
        }
        assert!(s.flood_fill(0, 0, 6));
        assert_eq!(s.get_pixel(0, 0), 6);
        assert_eq!(s.get_pixel(1, 1), 5);
    }

    #[test]
    fn fill_large_sprite_uses_stack() {
        let mut s = Sprite::new(1, 8, 8, "s", "", 0);
        assert!(s.flood_fill(63, 63, 1));
        assert!(s.tiles().iter().all(|t| t.pixels.iter().flatten().all(|&c| c == 1)));
    }

    #[test]
    fn out_of_range_color_is_rejected() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        assert!(!s.flood_fill(0, 0, 16));
        s.set_pixel(1, 1, 3);
        assert!(!s.flood_fill(1, 1, 0x13));
        assert_eq!(s.click(0, 0, ClickOp::Paint, 16), ClickResult::Unchanged);
        assert_eq!(s.click(1, 1, ClickOp::Erase, 200), ClickResult::Unchanged);
        assert_eq!(s.get_pixel(0, 0), 0);
        assert_eq!(s.get_pixel(1, 1), 3);
    }

    #[test]
    fn click_ops() {
        let mut s = Sprite::new(1, 1, 1, "s", "", 0);
        assert_eq!(s.click(2, 2, ClickOp::Paint, 7), ClickResult::Changed);
        assert_eq!(s.click(2, 2, ClickOp::Paint, 7), ClickResult::Unchanged);
        assert_eq!(s.click(2, 2, ClickOp::PickColor, 1), ClickResult::Picked(7));
        assert_eq!(s.click(2, 2, ClickOp::Erase, 7), ClickResult::Changed);
        assert_eq!(s.click(8, 0, ClickOp::Paint, 7), ClickResult::Unchanged);
        assert_eq!(s.click(0, 0, ClickOp::FloodFill, 4), ClickResult::Changed);
        assert_eq!(s.get_pixel(7, 7), 4);
    }
}

use crate::common::{ColorRGB, ColorValue};

/// Expand a 5-bit channel to 8 bits.
pub fn scale_color(c: ColorValue) -> u8 {
    ((c as u16) * 255 / 31) as u8
}

pub fn scale_rgb(c: ColorRGB) -> [u8; 3] {
    [scale_color(c.0), scale_color(c.1), scale_color(c.2)]
}

/// Parse a "WxH" size attribute.
pub fn parse_size(s: &str) -> Option<(usize, usize)> {
    let (w, h) = s.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

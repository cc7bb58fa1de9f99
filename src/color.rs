//! RGB555 color codec.
//!
//! Colors are stored the way the hardware reads them: three 5-bit channels
//! packed into a `u16` with red in the low bits. The project file writes each
//! channel as two hex digits, and since a channel never exceeds 0x1F the first
//! digit is always `0` or `1`.
use thiserror::Error;

use crate::common::{Color555, ColorRGB, ColorValue};

pub const MAX_CHANNEL: ColorValue = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("color value '{0}' must be exactly 6 hex digits")]
    Length(String),
    #[error("color value '{0}' has a channel outside 00-1f")]
    Channel(String),
}

pub fn encode(r: ColorValue, g: ColorValue, b: ColorValue) -> Color555 {
    (r as u16 & 0x1F) | (g as u16 & 0x1F) << 5 | (b as u16 & 0x1F) << 10
}

pub fn decode(c: Color555) -> ColorRGB {
    (
        (c & 0x1F) as ColorValue,
        ((c >> 5) & 0x1F) as ColorValue,
        ((c >> 10) & 0x1F) as ColorValue,
    )
}

pub fn encode_rgb(c: ColorRGB) -> Color555 {
    encode(c.0, c.1, c.2)
}

/// Parse the `RRGGBB` text form used by `<color rgb="...">`.
pub fn parse_hex(s: &str) -> Result<Color555, ColorError> {
    let bytes = s.as_bytes();
    if bytes.len() != 6 {
        return Err(ColorError::Length(s.to_string()));
    }
    let mut channels = [0 as ColorValue; 3];
    for (i, pair) in bytes.chunks(2).enumerate() {
        let high = match pair[0] {
            b'0' => 0,
            b'1' => 16,
            _ => return Err(ColorError::Channel(s.to_string())),
        };
        let low = (pair[1] as char)
            .to_digit(16)
            .ok_or_else(|| ColorError::Channel(s.to_string()))?;
        channels[i] = (high + low) as ColorValue;
    }
    Ok(encode(channels[0], channels[1], channels[2]))
}

pub fn format_hex(c: Color555) -> String {
    let (r, g, b) = decode(c);
    format!("{:02x}{:02x}{:02x}", r, g, b)
}

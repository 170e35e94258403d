use serde::{Deserialize, Serialize};

use crate::surface::SurfaceError;

/// Straight-alpha RGBA colour.
///
/// Deserializes from either `{"r":..,"g":..,"b":..,"a":..}` (alpha optional)
/// or a hex string such as `"#ff8800"` / `"#ff880080"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn parse_hex(input: &str) -> Result<Self, SurfaceError> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        let invalid = || SurfaceError::InvalidColor(input.to_string());
        if !digits.is_ascii() || !(digits.len() == 6 || digits.len() == 8) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels {
        r: u8,
        g: u8,
        b: u8,
        #[serde(default = "opaque")]
        a: u8,
    },
}

fn opaque() -> u8 {
    255
}

impl TryFrom<ColorRepr> for Color {
    type Error = SurfaceError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(hex) => Color::parse_hex(&hex),
            ColorRepr::Channels { r, g, b, a } => Ok(Color::rgba(r, g, b, a)),
        }
    }
}

/// A colour at a position along a gradient, `offset` in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

impl ColorStop {
    pub fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }

    pub fn to_skia(self) -> tiny_skia::GradientStop {
        tiny_skia::GradientStop::new(self.offset.clamp(0.0, 1.0), self.color.to_skia())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse_hex("#ff8800").unwrap(), Color::rgb(255, 136, 0));
        assert_eq!(Color::parse_hex("00000080").unwrap(), Color::rgba(0, 0, 0, 128));
        assert!(Color::parse_hex("#fff").is_err());
        assert!(Color::parse_hex("#gg0000").is_err());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let hex: Color = serde_json::from_str("\"#102030\"").unwrap();
        assert_eq!(hex, Color::rgb(16, 32, 48));

        let channels: Color = serde_json::from_str(r#"{"r":1,"g":2,"b":3}"#).unwrap();
        assert_eq!(channels, Color::rgb(1, 2, 3));

        let bad: Result<Color, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_roundtrips_through_channels() {
        let json = serde_json::to_string(&Color::rgba(9, 8, 7, 6)).unwrap();
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgba(9, 8, 7, 6));
    }
}

//! # Style
//!
//! The small set of visual properties the order sheet needs: colors, font
//! variants and horizontal alignment. Everything else about the look of the
//! sheet is fixed by [`crate::config::LayoutConfig`].

use serde::{Deserialize, Serialize};

/// An RGB color with components in `0.0..=1.0`.
///
/// Deserializes from `{"r": .., "g": .., "b": ..}` or from a `#rrggbb` /
/// `#rgb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` or `#rgb` hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits: Vec<u8> = hex
            .trim()
            .trim_start_matches('#')
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        let (r, g, b) = match digits.as_slice() {
            &[r1, r0, g1, g0, b1, b0] => (r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0),
            &[r, g, b] => (r * 17, g * 17, b * 17),
            _ => return None,
        };
        Some(Self::rgb(
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0,
        ))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb { r: f64, g: f64, b: f64 },
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        let color = match repr {
            ColorRepr::Hex(hex) => {
                Color::from_hex(&hex).ok_or_else(|| format!("invalid hex color {:?}", hex))?
            }
            ColorRepr::Rgb { r, g, b } => Color::rgb(r, g, b),
        };
        let in_range = |c: f64| (0.0..=1.0).contains(&c);
        if in_range(color.r) && in_range(color.g) && in_range(color.b) {
            Ok(color)
        } else {
            Err(format!(
                "color components must be within 0..1, got ({}, {}, {})",
                color.r, color.g, color.b
            ))
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Font variant within the Helvetica family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontStyle {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl FontStyle {
    pub const REGULAR: FontStyle = FontStyle { bold: false, italic: false };
    pub const BOLD: FontStyle = FontStyle { bold: true, italic: false };
    pub const ITALIC: FontStyle = FontStyle { bold: false, italic: true };
}

/// Horizontal alignment of cell content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

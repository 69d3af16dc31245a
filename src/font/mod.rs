//! # Font Management
//!
//! Text measurement for the four standard Helvetica faces. These are part of
//! the PDF base-14 set, so the serializer references them by name and never
//! embeds font programs.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use crate::style::FontStyle;

/// The standard PDF faces used by the order sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
}

impl StandardFont {
    pub fn from_style(style: FontStyle) -> Self {
        match (style.bold, style.italic) {
            (false, false) => Self::Helvetica,
            (true, false) => Self::HelveticaBold,
            (false, true) => Self::HelveticaOblique,
            (true, true) => Self::HelveticaBoldOblique,
        }
    }

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD,
        }
    }
}

/// Shared font context used by layout and PDF serialization.
#[derive(Debug, Default, Clone, Copy)]
pub struct FontContext;

impl FontContext {
    pub fn new() -> Self {
        Self
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, style: FontStyle, font_size: f64) -> f64 {
        StandardFont::from_style(style)
            .metrics()
            .char_width(ch, font_size)
    }

    /// Distance from the baseline to the top of the tallest glyphs, in points.
    pub fn ascent(&self, style: FontStyle, font_size: f64) -> f64 {
        StandardFont::from_style(style).metrics().ascender as f64 / 1000.0 * font_size
    }

    /// Distance from the baseline to the lowest descender (negative), in points.
    pub fn descent(&self, style: FontStyle, font_size: f64) -> f64 {
        StandardFont::from_style(style).metrics().descender as f64 / 1000.0 * font_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', FontStyle::REGULAR, 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('A', FontStyle::REGULAR, 12.0);
        let bold = ctx.char_width('A', FontStyle::BOLD, 12.0);
        assert!(bold > regular, "Bold A should be wider than regular A");
    }

    #[test]
    fn test_oblique_shares_upright_widths() {
        let ctx = FontContext::new();
        for ch in "Quantità".chars() {
            let upright = ctx.char_width(ch, FontStyle::REGULAR, 9.0);
            let oblique = ctx.char_width(ch, FontStyle::ITALIC, 9.0);
            assert!((upright - oblique).abs() < 1e-9);
        }
    }

    #[test]
    fn test_font_names() {
        let bold_italic = FontStyle {
            bold: true,
            italic: true,
        };
        assert_eq!(
            StandardFont::from_style(bold_italic).pdf_name(),
            "Helvetica-BoldOblique"
        );
        assert_eq!(StandardFont::from_style(FontStyle::ITALIC).pdf_name(), "Helvetica-Oblique");
    }

    #[test]
    fn test_vertical_metrics() {
        let ctx = FontContext::new();
        assert!((ctx.ascent(FontStyle::REGULAR, 10.0) - 7.18).abs() < 1e-9);
        assert!((ctx.descent(FontStyle::REGULAR, 10.0) + 2.07).abs() < 1e-9);
    }
}

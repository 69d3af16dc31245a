//! Placement inside a single box: aspect-preserving image scaling and
//! positioning of fitted text lines.

use crate::config::ImageFit;
use crate::font::FontContext;
use crate::model::PT_TO_MM;
use crate::style::{Color, FontStyle, TextAlign};
use crate::text::fit::FittedText;

use super::{DrawOp, Rect};

/// Vertical anchoring of a text block inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
}

/// Scale an image of `natural` size (mm) into `bounds`, keeping its aspect
/// ratio, and center it.
///
/// `Contain` never scales above the natural size; `Fill` grows until one
/// dimension touches the box.
pub fn fit_image(natural: (f64, f64), bounds: Rect, fit: ImageFit) -> Rect {
    let (w, h) = natural;
    if !(w > 0.0 && h > 0.0 && bounds.width > 0.0 && bounds.height > 0.0) {
        return Rect::new(
            bounds.x + bounds.width.max(0.0) / 2.0,
            bounds.y + bounds.height.max(0.0) / 2.0,
            0.0,
            0.0,
        );
    }

    let mut scale = (bounds.width / w).min(bounds.height / h);
    if fit == ImageFit::Contain {
        scale = scale.min(1.0);
    }
    let (width, height) = (w * scale, h * scale);
    Rect::new(
        bounds.x + (bounds.width - width) / 2.0,
        bounds.y + (bounds.height - height) / 2.0,
        width,
        height,
    )
}

/// Turn fitted lines into text operations inside `inner`.
///
/// The baseline of each line sits so the glyph box is centered in the line
/// slot.
pub fn place_lines(
    fonts: &FontContext,
    fitted: &FittedText,
    inner: Rect,
    align: TextAlign,
    valign: VAlign,
    style: FontStyle,
    color: Color,
) -> Vec<DrawOp> {
    let size = fitted.font_size;
    let line_h = fitted.line_height;
    let ascent = fonts.ascent(style, size) * PT_TO_MM;
    let glyph_h = (fonts.ascent(style, size) - fonts.descent(style, size)) * PT_TO_MM;

    let block_h = fitted.block_height();
    let block_top = match valign {
        VAlign::Top => inner.y,
        VAlign::Middle => inner.y + (inner.height - block_h) / 2.0,
    };

    let mut ops = Vec::with_capacity(fitted.lines.len());
    for (i, line) in fitted.lines.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let width = line.width * PT_TO_MM;
        let x = match align {
            TextAlign::Left => inner.x,
            TextAlign::Center => inner.x + (inner.width - width) / 2.0,
            TextAlign::Right => inner.right() - width,
        };
        let line_top = block_top + i as f64 * line_h;
        ops.push(DrawOp::Text {
            x,
            baseline: line_top + (line_h - glyph_h) / 2.0 + ascent,
            text: line.text.clone(),
            font_size: size,
            style,
            color,
        });
    }
    ops
}

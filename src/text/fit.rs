//! # Fit Text to Box
//!
//! The one routine every piece of text on the sheet goes through: wrap at the
//! starting size, and while the lines overflow the box, step the font size
//! down and re-wrap. At the minimum size whatever still overflows is clipped.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::font::FontContext;
use crate::model::{MM_TO_PT, PT_TO_MM};
use crate::style::FontStyle;
use crate::text::{BrokenLine, TextLayout};

const EPSILON: f64 = 1e-9;
/// Largest font size any text on the sheet may start at, in points.
pub const MAX_FONT_SIZE: f64 = 200.0;
/// Shrink iterations before the loop jumps straight to the minimum size.
const MAX_SHRINK_STEPS: usize = 400;

/// Parameters of the shrink-to-fit loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FitParams {
    /// Starting font size in points.
    pub initial_size: f64,
    /// Smallest font size the loop may reach, in points.
    pub min_size: f64,
    /// Decrement per iteration, in points.
    pub step: f64,
    /// Inner margin on every side of the box, in millimetres.
    pub padding: f64,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
    pub style: FontStyle,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            initial_size: 8.0,
            min_size: 5.0,
            step: 0.5,
            padding: 1.5,
            line_height: 1.15,
            style: FontStyle::REGULAR,
        }
    }
}

impl FitParams {
    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    /// Height of one line at `font_size`, in millimetres.
    pub fn line_height_mm(&self, font_size: f64) -> f64 {
        font_size * self.line_height * PT_TO_MM
    }

    pub(crate) fn validate(&self, name: &str) -> Result<(), ProformaError> {
        let ok = self.min_size > 0.0
            && self.min_size <= self.initial_size
            && self.initial_size <= MAX_FONT_SIZE
            && self.step > 0.0
            && self.line_height > 0.0
            && self.padding >= 0.0;
        if ok {
            Ok(())
        } else {
            Err(ProformaError::Config(format!(
                "{}: need 0 < minSize <= initialSize <= {}, step > 0, lineHeight > 0 and padding >= 0",
                name, MAX_FONT_SIZE
            )))
        }
    }
}

/// The outcome of fitting a text into a box.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedText {
    /// Chosen font size in points.
    pub font_size: f64,
    /// Line height at the chosen size, in millimetres.
    pub line_height: f64,
    /// The lines to draw; never more than `capacity`.
    pub lines: Vec<BrokenLine>,
    /// How many lines fit in the box at the chosen size.
    pub capacity: usize,
    /// Whether lines were dropped at the minimum size.
    pub truncated: bool,
}

impl FittedText {
    /// Total height of the drawn lines, in millimetres.
    pub fn block_height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }
}

/// Fit `text` into a `width` × `height` mm box.
pub fn fit_text(
    font_context: &FontContext,
    text_layout: &TextLayout,
    text: &str,
    width: f64,
    height: f64,
    params: &FitParams,
) -> FittedText {
    let inner_width = (width - 2.0 * params.padding).max(0.0);
    let inner_height = (height - 2.0 * params.padding).max(0.0);
    let capacity_at = |size: f64| -> usize {
        let line_h = params.line_height_mm(size);
        if line_h <= 0.0 {
            return 0;
        }
        (inner_height / line_h + EPSILON).floor() as usize
    };

    if text.trim().is_empty() {
        return FittedText {
            font_size: params.initial_size,
            line_height: params.line_height_mm(params.initial_size),
            lines: Vec::new(),
            capacity: capacity_at(params.initial_size),
            truncated: false,
        };
    }

    let mut size = params.initial_size;
    let mut steps = 0;
    loop {
        let capacity = capacity_at(size);
        let mut lines = text_layout.break_into_lines(
            font_context,
            text,
            inner_width * MM_TO_PT,
            size,
            params.style,
        );
        if lines.len() <= capacity {
            return FittedText {
                font_size: size,
                line_height: params.line_height_mm(size),
                lines,
                capacity,
                truncated: false,
            };
        }

        steps += 1;
        let next = size - params.step;
        if steps < MAX_SHRINK_STEPS && params.step > 0.0 && next >= params.min_size - EPSILON {
            size = next;
            continue;
        }
        if params.step > 0.0 && size > params.min_size + EPSILON {
            // The last step would undershoot; try the minimum itself once.
            size = params.min_size;
            continue;
        }

        debug!(
            "text clipped to {} of {} lines at {:.1}pt: {:?}",
            capacity,
            lines.len(),
            size,
            preview(text)
        );
        lines.truncate(capacity);
        return FittedText {
            font_size: size,
            line_height: params.line_height_mm(size),
            lines,
            capacity,
            truncated: true,
        };
    }
}

fn preview(text: &str) -> String {
    text.chars().take(32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(text: &str, width: f64, height: f64, params: &FitParams) -> FittedText {
        fit_text(&FontContext::new(), &TextLayout::new(), text, width, height, params)
    }

    #[test]
    fn short_text_keeps_initial_size() {
        let fitted = fit("A100", 35.0, 40.0, &FitParams::default());
        assert_eq!(fitted.font_size, 8.0);
        assert_eq!(fitted.lines.len(), 1);
        assert!(!fitted.truncated);
    }

    #[test]
    fn long_text_shrinks() {
        let text = "Borsa in pelle con manici rinforzati e chiusura magnetica, fodera interna";
        let params = FitParams::default();
        // Two lines at 8pt fit in 10 mm (2.82 * 1.15 = 3.25 mm per line, 7 mm inner).
        let fitted = fit(text, 35.0, 10.0, &params);
        assert!(fitted.font_size < params.initial_size);
        assert!(fitted.font_size >= params.min_size);
        assert!(fitted.lines.len() <= fitted.capacity);
    }

    #[test]
    fn impossible_text_is_clipped_at_min_size() {
        let text = "word ".repeat(200);
        let params = FitParams::default();
        let fitted = fit(&text, 20.0, 8.0, &params);
        assert_eq!(fitted.font_size, params.min_size);
        assert!(fitted.truncated);
        assert_eq!(fitted.lines.len(), fitted.capacity);
    }

    #[test]
    fn step_that_skips_min_size_still_tries_it() {
        let params = FitParams {
            initial_size: 8.0,
            min_size: 5.2,
            step: 1.0,
            ..Default::default()
        };
        let text = "word ".repeat(200);
        let fitted = fit(&text, 20.0, 8.0, &params);
        assert!((fitted.font_size - 5.2).abs() < 1e-9);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let fitted = fit("   ", 20.0, 8.0, &FitParams::default());
        assert!(fitted.lines.is_empty());
        assert!(!fitted.truncated);
        assert_eq!(fitted.block_height(), 0.0);
    }

    #[test]
    fn box_smaller_than_padding_fits_nothing() {
        let fitted = fit("A", 2.0, 2.0, &FitParams::default());
        assert_eq!(fitted.capacity, 0);
        assert!(fitted.lines.is_empty());
        assert!(fitted.truncated);
    }

    #[test]
    fn invalid_params_rejected() {
        let params = FitParams {
            min_size: 10.0,
            ..Default::default()
        };
        assert!(params.validate("cellText").is_err());
        assert!(FitParams::default().validate("cellText").is_ok());
    }

    #[test]
    fn oversized_initial_size_rejected() {
        let params = FitParams {
            initial_size: 1e9,
            ..Default::default()
        };
        assert!(params.validate("cellText").is_err());
    }

    #[test]
    fn tiny_step_still_reaches_the_minimum() {
        let params = FitParams {
            step: 1e-9,
            ..Default::default()
        };
        let text = "word ".repeat(200);
        let fitted = fit(&text, 20.0, 8.0, &params);
        assert!(fitted.truncated);
        assert_eq!(fitted.font_size, params.min_size);
    }
}

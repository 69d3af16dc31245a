//! # Text Layout
//!
//! Greedy line breaking over UAX#14 break opportunities, measured with the
//! standard font metrics. Widths here are in points; callers working in
//! millimetres convert at the boundary.

pub mod fit;

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::font::FontContext;
use crate::style::FontStyle;

const SOFT_HYPHEN: char = '\u{00AD}';

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    /// The text of the line, trailing whitespace removed.
    pub text: String,
    /// Width of `text` in points.
    pub width: f64,
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Entry `i` is the opportunity *before* `char[i]`. Index 0 is always `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        // A break at the very end is implicit.
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextLayout;

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break a string into lines that fit within `max_width` points.
    ///
    /// Breaks at the last allowed opportunity before the overflow. A word
    /// wider than the line is split between characters. Explicit newlines
    /// always break, and consecutive newlines produce empty lines.
    pub fn break_into_lines(
        &self,
        font_context: &FontContext,
        text: &str,
        max_width: f64,
        font_size: f64,
        style: FontStyle,
    ) -> Vec<BrokenLine> {
        if text.is_empty() {
            return vec![BrokenLine {
                text: String::new(),
                width: 0.0,
            }];
        }

        let chars: Vec<char> = text.chars().collect();
        let char_widths: Vec<f64> = chars
            .iter()
            .map(|&ch| {
                if is_newline(ch) || ch == SOFT_HYPHEN {
                    0.0
                } else {
                    font_context.char_width(ch, style, font_size)
                }
            })
            .collect();
        let break_opps = compute_break_opportunities(text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break_point: Option<usize> = None;

        for (i, &ch) in chars.iter().enumerate() {
            let char_width = char_widths[i];

            // A break *before* char[i] ends the previous line at char[i-1].
            if i > 0 {
                match break_opps[i] {
                    Some(BreakOpportunity::Mandatory) => {
                        lines.push(make_line(&chars[line_start..i], &char_widths[line_start..i]));
                        line_start = i;
                        line_width = 0.0;
                        last_break_point = None;
                    }
                    Some(BreakOpportunity::Allowed) => {
                        last_break_point = Some(i - 1);
                    }
                    None => {}
                }
            }

            if is_newline(ch) || ch == SOFT_HYPHEN {
                continue;
            }

            // Whitespace may hang past the edge; it is trimmed from the line.
            if line_width + char_width > max_width && line_start < i && !ch.is_whitespace() {
                if let Some(bp) = last_break_point.filter(|&bp| bp >= line_start) {
                    let break_at = bp + 1;
                    lines.push(make_line(
                        &chars[line_start..break_at],
                        &char_widths[line_start..break_at],
                    ));
                    line_start = break_at;
                    line_width = char_widths[line_start..=i].iter().sum();
                    last_break_point = None;
                    continue;
                }

                // No break opportunity on this line; split the word.
                lines.push(make_line(&chars[line_start..i], &char_widths[line_start..i]));
                line_start = i;
                line_width = char_width;
                last_break_point = None;
                continue;
            }

            line_width += char_width;
        }

        if line_start < chars.len() {
            lines.push(make_line(&chars[line_start..], &char_widths[line_start..]));
        }

        lines
    }
}

/// Create a BrokenLine, dropping line terminators, soft hyphens and
/// trailing whitespace.
fn make_line(chars: &[char], widths: &[f64]) -> BrokenLine {
    let kept: Vec<(char, f64)> = chars
        .iter()
        .zip(widths.iter())
        .filter(|(c, _)| !is_newline(**c) && **c != SOFT_HYPHEN)
        .map(|(c, w)| (*c, *w))
        .collect();

    let mut end = kept.len();
    while end > 0 && kept[end - 1].0.is_whitespace() {
        end -= 1;
    }

    BrokenLine {
        text: kept[..end].iter().map(|(c, _)| *c).collect(),
        width: kept[..end].iter().map(|(_, w)| *w).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FontContext {
        FontContext::new()
    }

    fn texts(lines: &[BrokenLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_single_line() {
        let lines = TextLayout::new().break_into_lines(&ctx(), "Hello", 200.0, 12.0, FontStyle::REGULAR);
        assert_eq!(texts(&lines), vec!["Hello"]);
    }

    #[test]
    fn test_line_break_at_space() {
        let lines =
            TextLayout::new().break_into_lines(&ctx(), "Hello World", 40.0, 12.0, FontStyle::REGULAR);
        assert_eq!(texts(&lines), vec!["Hello", "World"]);
        assert!(lines.iter().all(|l| l.width <= 40.0));
    }

    #[test]
    fn test_explicit_newline() {
        let lines =
            TextLayout::new().break_into_lines(&ctx(), "Hello\nWorld", 200.0, 12.0, FontStyle::REGULAR);
        assert_eq!(texts(&lines), vec!["Hello", "World"]);
    }

    #[test]
    fn test_crlf_and_blank_line() {
        let lines = TextLayout::new().break_into_lines(
            &ctx(),
            "one\r\n\r\ntwo",
            200.0,
            12.0,
            FontStyle::REGULAR,
        );
        assert_eq!(texts(&lines), vec!["one", "", "two"]);
    }

    #[test]
    fn test_empty_string() {
        let lines = TextLayout::new().break_into_lines(&ctx(), "", 200.0, 12.0, FontStyle::REGULAR);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 0.0);
    }

    #[test]
    fn test_long_word_is_split() {
        let lines = TextLayout::new().break_into_lines(
            &ctx(),
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            30.0,
            10.0,
            FontStyle::REGULAR,
        );
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width <= 30.0 + 1e-9));
        let joined: String = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(joined, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn test_trailing_space_not_counted() {
        let tl = TextLayout::new();
        let fc = ctx();
        let lines = tl.break_into_lines(&fc, "Hello World", 40.0, 12.0, FontStyle::REGULAR);
        let hello: f64 = "Hello"
            .chars()
            .map(|ch| fc.char_width(ch, FontStyle::REGULAR, 12.0))
            .sum();
        assert!((lines[0].width - hello).abs() < 1e-9);
    }

    #[test]
    fn test_bold_text_wider() {
        let tl = TextLayout::new();
        let fc = ctx();
        let regular = tl.break_into_lines(&fc, "ABCDEFG", 500.0, 32.0, FontStyle::REGULAR);
        let bold = tl.break_into_lines(&fc, "ABCDEFG", 500.0, 32.0, FontStyle::BOLD);
        assert!(bold[0].width > regular[0].width);
    }
}

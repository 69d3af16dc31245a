//! # Page Break Decisions
//!
//! Rows are unbreakable: a row either goes where the cursor is, moves whole
//! to a fresh page, or cannot be placed at all. Nothing here touches the
//! document; the engine acts on the decision.

const EPSILON: f64 = 1e-6;

/// What to do with the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// The row fits below the cursor on the current page.
    Place,
    /// The row does not fit here but fits on a fresh page.
    MoveToNextPage,
    /// The row would not fit even directly below the repeated headers.
    TooTall,
}

/// Whether a block of `height` starting at `top` stays above `limit`.
pub fn fits(top: f64, height: f64, limit: f64) -> bool {
    top + height <= limit + EPSILON
}

/// Decide where a row of `height` goes.
///
/// `current_y` is the cursor on the current page, `limit` the lowest y
/// content may reach and `fresh_y` where rows start on a new page (below the
/// header block and column headers).
pub fn decide_row(current_y: f64, height: f64, limit: f64, fresh_y: f64) -> BreakDecision {
    if fits(current_y, height, limit) {
        BreakDecision::Place
    } else if fits(fresh_y, height, limit) {
        BreakDecision::MoveToNextPage
    } else {
        BreakDecision::TooTall
    }
}

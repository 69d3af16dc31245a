//! # Layout Configuration
//!
//! Every constant the layout engine uses lives here, with serde defaults that
//! reproduce the classic A4 order sheet: six columns (item code, picture,
//! unit, MOQ, sample price, quantity), 55 mm rows and an 8 mm header row.
//!
//! The config is validated once by [`crate::layout::LayoutEngine::begin_document`];
//! nothing downstream re-checks it.

use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::model::{ColumnSpec, Edges, PageFormat};
use crate::style::{Color, FontStyle};
use crate::text::fit::{FitParams, MAX_FONT_SIZE};

const EPSILON: f64 = 1e-6;

/// All layout constants for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub page: PageFormat,
    /// Table columns, left to right.
    pub columns: Vec<ColumnSpec>,
    /// Height of every data row, including the note band.
    pub row_height: f64,
    /// Height of the column header row.
    pub header_row_height: f64,
    pub header_block: HeaderBlockStyle,
    /// Fit parameters for data cells.
    pub cell_text: FitParams,
    /// Fit parameters for column header labels.
    pub header_text: FitParams,
    /// Full-width band at the bottom of each row for description and note.
    pub row_note: Option<RowNoteSpec>,
    pub general_notes: GeneralNotesStyle,
    pub image: ImageCellStyle,
    /// Cell border width in millimetres.
    pub border_width: f64,
    pub border_color: Color,
    pub text_color: Color,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page: PageFormat::default(),
            columns: default_columns(),
            row_height: 55.0,
            header_row_height: 8.0,
            header_block: HeaderBlockStyle::default(),
            cell_text: FitParams::default(),
            header_text: FitParams {
                initial_size: 8.0,
                min_size: 5.0,
                step: 0.5,
                padding: 1.0,
                line_height: 1.1,
                style: FontStyle::BOLD,
            },
            row_note: Some(RowNoteSpec::default()),
            general_notes: GeneralNotesStyle::default(),
            image: ImageCellStyle::default(),
            border_width: 0.2,
            border_color: Color::BLACK,
            text_color: Color::BLACK,
        }
    }
}

/// The six columns of the classic order sheet, 190 mm in total.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::text("code", "Item", 35.0),
        ColumnSpec::image("image", "Image", 110.0),
        ColumnSpec::text("unit", "U.M.", 10.0),
        ColumnSpec::text("moq", "MOQ", 10.0),
        ColumnSpec::price("price", "Sample Price", 15.0, "€"),
        ColumnSpec::text("quantity", "Qty", 10.0),
    ]
}

impl LayoutConfig {
    /// Total width of all columns.
    pub fn table_width(&self) -> f64 {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Height of the cell area of a row, excluding the note band.
    pub fn cell_height(&self) -> f64 {
        match &self.row_note {
            Some(note) => self.row_height - note.height,
            None => self.row_height,
        }
    }

    /// The y where rows start on every page: below the header block, its gap
    /// and the column header row.
    pub fn rows_top(&self) -> f64 {
        self.page.margin.top
            + self.header_block.height
            + self.header_block.gap
            + self.header_row_height
    }

    /// Check the schema and constants. Called before any drawing happens.
    pub fn validate(&self) -> Result<(), ProformaError> {
        let (page_w, page_h) = self.page.dimensions();
        if !(page_w > 0.0 && page_h > 0.0) {
            return Err(config_err(format!(
                "page size must be positive, got {}x{} mm",
                page_w, page_h
            )));
        }
        if self.page.usable_width() <= 0.0 || self.page.usable_height() <= 0.0 {
            return Err(config_err("page margins leave no usable area"));
        }

        if self.columns.is_empty() {
            return Err(config_err("no columns supplied"));
        }
        for col in &self.columns {
            if !(col.width.is_finite() && col.width > 0.0) {
                return Err(config_err(format!(
                    "column '{}' has non-positive width {}",
                    col.key, col.width
                )));
            }
        }
        let total = self.table_width();
        if total <= 0.0 {
            return Err(config_err("column widths sum to a non-positive value"));
        }
        let usable = self.page.usable_width();
        if total > usable + EPSILON {
            return Err(config_err(format!(
                "columns need {:.2} mm but only {:.2} mm of page width is usable",
                total, usable
            )));
        }

        if !(self.row_height > 0.0) {
            return Err(config_err("row height must be positive"));
        }
        if !(self.header_row_height > 0.0) {
            return Err(config_err("header row height must be positive"));
        }
        if let Some(note) = &self.row_note {
            if !(note.height > 0.0 && note.height < self.row_height) {
                return Err(config_err(format!(
                    "row note height {} must be positive and smaller than the row height {}",
                    note.height, self.row_height
                )));
            }
            note.text.validate("rowNote.text")?;
        }
        if !(self.header_block.height >= 0.0 && self.header_block.gap >= 0.0) {
            return Err(config_err("header block height and gap must not be negative"));
        }
        if self.rows_top() > self.page.content_bottom() + EPSILON {
            return Err(config_err(format!(
                "header block and column headers end at {:.2} mm, below the bottom margin at {:.2} mm",
                self.rows_top(),
                self.page.content_bottom()
            )));
        }
        let sizes = [
            ("headerBlock.companyFontSize", self.header_block.company_font_size),
            ("headerBlock.partyFontSize", self.header_block.party_font_size),
            ("generalNotes.titleSize", self.general_notes.title_size),
        ];
        for (name, size) in sizes {
            if !(size > 0.0 && size <= MAX_FONT_SIZE) {
                return Err(config_err(format!(
                    "{} must be within (0, {}] pt, got {}",
                    name, MAX_FONT_SIZE, size
                )));
            }
        }
        if !(self.image.dpi > 0.0) {
            return Err(config_err("image dpi must be positive"));
        }

        self.cell_text.validate("cellText")?;
        self.header_text.validate("headerText")?;
        self.general_notes.text.validate("generalNotes.text")?;
        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> ProformaError {
    ProformaError::Config(msg.into())
}

/// Geometry and typography of the header block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderBlockStyle {
    /// Fixed height of the block; content below it is dropped.
    pub height: f64,
    /// Space between the block and the column headers.
    pub gap: f64,
    pub logo_width: f64,
    pub logo_height: f64,
    pub company_font_size: f64,
    pub company_line_spacing: f64,
    pub party_font_size: f64,
    pub party_line_spacing: f64,
    /// Width of the contact box on the right-hand side.
    pub contact_width: f64,
}

impl Default for HeaderBlockStyle {
    fn default() -> Self {
        Self {
            height: 66.0,
            gap: 4.0,
            logo_width: 40.0,
            logo_height: 18.0,
            company_font_size: 8.0,
            company_line_spacing: 3.5,
            party_font_size: 10.0,
            party_line_spacing: 6.0,
            contact_width: 60.0,
        }
    }
}

/// The description/note band at the bottom of each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowNoteSpec {
    pub height: f64,
    /// Item keys whose values form the description, joined by spaces.
    pub description_keys: Vec<String>,
    /// Item key of the free-text note, printed in italics.
    pub note_key: String,
    pub note_prefix: String,
    pub text: FitParams,
}

impl Default for RowNoteSpec {
    fn default() -> Self {
        Self {
            height: 12.0,
            description_keys: vec!["description".to_string()],
            note_key: "note".to_string(),
            note_prefix: "Note: ".to_string(),
            text: FitParams {
                initial_size: 7.0,
                min_size: 5.0,
                step: 0.5,
                padding: 1.0,
                line_height: 1.15,
                style: FontStyle::REGULAR,
            },
        }
    }
}

/// The free-text block after the last row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralNotesStyle {
    pub title: String,
    pub title_size: f64,
    /// Space between the table and the block.
    pub gap_before: f64,
    pub text: FitParams,
}

impl Default for GeneralNotesStyle {
    fn default() -> Self {
        Self {
            title: "General notes:".to_string(),
            title_size: 10.0,
            gap_before: 10.0,
            text: FitParams {
                initial_size: 8.0,
                min_size: 5.0,
                step: 0.5,
                padding: 0.0,
                line_height: 1.2,
                style: FontStyle::REGULAR,
            },
        }
    }
}

/// How images are scaled into their cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Scale down to fit, never above natural size.
    #[default]
    Contain,
    /// Scale up or down until one dimension touches the padded box.
    Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageCellStyle {
    pub fit: ImageFit,
    pub padding: Edges,
    /// Pixel density used to derive an image's natural size.
    pub dpi: f64,
}

impl Default for ImageCellStyle {
    fn default() -> Self {
        Self {
            fit: ImageFit::Contain,
            padding: Edges::symmetric(5.0, 2.0),
            dpi: 96.0,
        }
    }
}

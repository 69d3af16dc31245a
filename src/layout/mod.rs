//! # Page-Aware Layout Engine
//!
//! The engine never lays out onto an infinitely tall canvas. It opens a page
//! of known size, draws the header block and the column header row, and then
//! asks of every row: does this fit below the cursor? If it does, the row is
//! drawn and the cursor moves down. If it doesn't, a new page is opened with
//! the same header block and column headers, and the row goes there. Rows are
//! never split; content that overflows its cell is shrunk and, at the minimum
//! font size, clipped.
//!
//! The stepwise operations ([`LayoutEngine::begin_document`],
//! [`LayoutEngine::start_page`], [`LayoutEngine::layout_row`]) are public so a
//! caller can drive the loop itself and stop between rows.
//! [`LayoutEngine::finalize_document`] is the whole loop.
//!
//! All coordinates are millimetres from the top-left corner of the page.

pub mod cell;
pub mod page_break;

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::config::{ImageFit, LayoutConfig, RowNoteSpec};
use crate::error::ProformaError;
use crate::font::FontContext;
use crate::image_loader::{ImageResolver, LoadedImage};
use crate::model::{ColumnKind, ColumnSpec, Edges, HeaderBlock, LineItem, PageFormat, MM_TO_PT};
use crate::style::{Color, FontStyle, TextAlign};
use crate::text::fit::{fit_text, FitParams, FittedText};
use crate::text::TextLayout;

use self::cell::{fit_image, place_lines, VAlign};
use self::page_break::BreakDecision;

const EPSILON: f64 = 1e-6;
/// Space between the logo and the company lines.
const LOGO_GAP: f64 = 2.0;
/// Space between the company lines and the party fields.
const PARTY_GAP: f64 = 2.0;
/// Space between the party column and the contact box.
const CONTACT_GAP: f64 = 4.0;

/// An axis-aligned box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink by `edges`; never produces a negative size.
    pub fn inset(&self, edges: &Edges) -> Rect {
        Rect {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.horizontal()).max(0.0),
            height: (self.height - edges.vertical()).max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether `other` lies inside this box, allowing for rounding.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    /// A stroked and/or filled rectangle.
    #[serde(rename_all = "camelCase")]
    Rect {
        rect: Rect,
        stroke: Option<Color>,
        fill: Option<Color>,
        line_width: f64,
    },
    /// One line of text. `baseline` is the y of the text baseline.
    #[serde(rename_all = "camelCase")]
    Text {
        x: f64,
        baseline: f64,
        text: String,
        font_size: f64,
        style: FontStyle,
        color: Color,
    },
    /// A resolved image scaled into `rect`, or the 1×1 placeholder stretched
    /// over the padded box when the image could not be loaded.
    #[serde(rename_all = "camelCase")]
    Image {
        rect: Rect,
        width_px: u32,
        height_px: u32,
        #[serde(skip)]
        image: Arc<LoadedImage>,
    },
}

/// Where an item's row landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPlacement {
    pub item_index: usize,
    pub top: f64,
    pub bottom: f64,
}

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
    pub rows: Vec<RowPlacement>,
    /// The first `header_ops` operations are the repeated page header.
    pub header_ops: usize,
}

impl LayoutPage {
    fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            rows: Vec::new(),
            header_ops: 0,
        }
    }

    /// The header block and column header operations of this page.
    pub fn header(&self) -> &[DrawOp] {
        &self.ops[..self.header_ops.min(self.ops.len())]
    }
}

/// The paginated result of one export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub format: PageFormat,
    pub pages: Vec<LayoutPage>,
}

impl Document {
    /// The page the cursor points at.
    pub fn page_mut(&mut self, cursor: &PageCursor) -> Result<&mut LayoutPage, ProformaError> {
        let count = self.pages.len();
        self.pages.get_mut(cursor.page_index).ok_or_else(|| {
            ProformaError::Layout(format!(
                "cursor points at page {} but the document has {} pages",
                cursor.page_index + 1,
                count
            ))
        })
    }

    /// Total number of rows placed across all pages.
    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }
}

/// The mutable render position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageCursor {
    pub page_index: usize,
    pub current_y: f64,
}

/// Lays out one order onto pages.
///
/// Image references are resolved through `resolver` at most once per engine;
/// failures are remembered too, so a broken logo is reported once, not once
/// per page. Every failure draws the same placeholder image, so the PDF embeds
/// it once.
pub struct LayoutEngine<'a> {
    config: &'a LayoutConfig,
    header: &'a HeaderBlock,
    resolver: &'a dyn ImageResolver,
    fonts: FontContext,
    text_layout: TextLayout,
    image_cache: RefCell<HashMap<String, Option<Arc<LoadedImage>>>>,
    placeholder: Arc<LoadedImage>,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        header: &'a HeaderBlock,
        resolver: &'a dyn ImageResolver,
    ) -> Self {
        Self {
            config,
            header,
            resolver,
            fonts: FontContext::new(),
            text_layout: TextLayout::new(),
            image_cache: RefCell::new(HashMap::new()),
            placeholder: Arc::new(LoadedImage::placeholder()),
        }
    }

    /// Validate the configuration and create an empty document.
    pub fn begin_document(&self) -> Result<Document, ProformaError> {
        self.config.validate()?;
        Ok(Document {
            format: self.config.page,
            pages: Vec::new(),
        })
    }

    /// The y where rows start on every page.
    pub fn rows_top(&self) -> f64 {
        self.config.rows_top()
    }

    /// Open a new page with the header block and column headers drawn, and
    /// point the cursor just below them.
    pub fn start_page(&self, doc: &mut Document, cursor: &mut PageCursor) {
        let (width, height) = self.config.page.dimensions();
        doc.pages.push(LayoutPage::new(width, height));
        cursor.page_index = doc.pages.len() - 1;
        cursor.current_y = self.config.page.margin.top;

        let page = &mut doc.pages[cursor.page_index];
        self.draw_header_block(page, cursor);
        self.draw_column_headers(page, cursor);
        page.header_ops = page.ops.len();
    }

    /// Draw the logo, company lines, party fields and contact box in the
    /// fixed-height block at the cursor, then advance past it.
    pub fn draw_header_block(&self, page: &mut LayoutPage, cursor: &mut PageCursor) {
        let style = &self.config.header_block;
        let margin = &self.config.page.margin;
        let left = margin.left;
        let top = cursor.current_y;
        let block_bottom = top + style.height;

        let contact_x = page.width - margin.right - style.contact_width;
        let text_width = if self.header.contact.is_some() {
            (contact_x - CONTACT_GAP - left).max(0.0)
        } else {
            self.config.page.usable_width()
        };

        let mut y = top;
        if let Some(src) = self.header.logo.as_deref().filter(|s| !s.trim().is_empty()) {
            let bounds = Rect::new(left, top, style.logo_width, style.logo_height);
            match self.resolve_image(src) {
                Some(image) => {
                    let natural = image.natural_size_mm(self.config.image.dpi);
                    let fitted = fit_image(natural, bounds, ImageFit::Fill);
                    let rect = Rect {
                        x: bounds.x,
                        y: bounds.y,
                        ..fitted
                    };
                    page.ops.push(image_op(rect, image));
                }
                None => page.ops.push(image_op(bounds, self.placeholder.clone())),
            }
            y = top + style.logo_height + LOGO_GAP;
        }

        let company = line_params(style.company_font_size, FontStyle::REGULAR);
        for line in &self.header.company_lines {
            let spacing = style.company_line_spacing;
            if !self.header_line(page, line, (left, text_width), &mut y, spacing, &company, block_bottom) {
                break;
            }
        }

        if !self.header.company_lines.is_empty() {
            y += PARTY_GAP;
        }
        let parties_top = y;
        let party = line_params(style.party_font_size, FontStyle::REGULAR);
        for field in &self.header.parties {
            let spacing = style.party_line_spacing;
            if !self.header_line(page, &field.line(), (left, text_width), &mut y, spacing, &party, block_bottom) {
                break;
            }
        }

        if let Some(contact) = &self.header.contact {
            let bold = line_params(style.party_font_size, FontStyle::BOLD);
            let regular = line_params(style.party_font_size, FontStyle::REGULAR);
            let mut y = parties_top;
            let lines = [
                (contact.title.as_str(), &bold),
                (contact.name.as_str(), &bold),
                (contact.email.as_str(), &regular),
            ];
            for (text, params) in lines {
                let column = (contact_x, style.contact_width);
                let spacing = style.party_line_spacing;
                if !self.header_line(page, text, column, &mut y, spacing, params, block_bottom) {
                    break;
                }
            }
        }

        cursor.current_y = block_bottom + style.gap;
    }

    /// One line of the header block. Returns false once the block is full.
    #[allow(clippy::too_many_arguments)]
    fn header_line(
        &self,
        page: &mut LayoutPage,
        text: &str,
        (x, width): (f64, f64),
        y: &mut f64,
        spacing: f64,
        params: &FitParams,
        block_bottom: f64,
    ) -> bool {
        if *y + spacing > block_bottom + EPSILON {
            debug!("header block full, dropping line {:?}", text);
            return false;
        }
        let bounds = Rect::new(x, *y, width, spacing);
        self.draw_text_box(page, text, bounds, params, TextAlign::Left, VAlign::Top);
        *y += spacing;
        true
    }

    /// Draw one bordered cell per column with its label, then advance by the
    /// header row height.
    pub fn draw_column_headers(&self, page: &mut LayoutPage, cursor: &mut PageCursor) {
        let height = self.config.header_row_height;
        let mut x = self.config.page.margin.left;
        for column in &self.config.columns {
            let bounds = Rect::new(x, cursor.current_y, column.width, height);
            page.ops.push(self.border(bounds));
            self.draw_text_box(
                page,
                &column.label,
                bounds,
                &self.config.header_text,
                TextAlign::Center,
                VAlign::Top,
            );
            x += column.width;
        }
        cursor.current_y += height;
    }

    /// Draw `item` as a row of `row_height` at the cursor.
    ///
    /// Returns false without drawing anything when the row would cross the
    /// bottom margin.
    pub fn layout_row(
        &self,
        page: &mut LayoutPage,
        cursor: &mut PageCursor,
        item_index: usize,
        item: &LineItem,
        row_height: f64,
    ) -> bool {
        let limit = self.config.page.content_bottom();
        if !page_break::fits(cursor.current_y, row_height, limit) {
            return false;
        }

        let top = cursor.current_y;
        let note = self
            .config
            .row_note
            .as_ref()
            .filter(|n| n.height < row_height);
        let cell_height = row_height - note.map_or(0.0, |n| n.height);

        let mut x = self.config.page.margin.left;
        for column in &self.config.columns {
            let bounds = Rect::new(x, top, column.width, cell_height);
            page.ops.push(self.border(bounds));
            match column.kind {
                ColumnKind::Image => self.draw_image_cell(page, column, item, bounds),
                ColumnKind::Text | ColumnKind::Price { .. } => {
                    let text = column.display_value(item);
                    self.draw_text_box(
                        page,
                        &text,
                        bounds,
                        &self.config.cell_text,
                        column.align,
                        VAlign::Middle,
                    );
                }
            }
            x += column.width;
        }

        if let Some(note) = note {
            let band = Rect::new(
                self.config.page.margin.left,
                top + cell_height,
                self.config.table_width(),
                note.height,
            );
            page.ops.push(self.border(band));
            let description = note
                .description_keys
                .iter()
                .map(|key| item.text(key))
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            self.layout_note(page, note, &description, &item.text(&note.note_key), band);
        }

        page.rows.push(RowPlacement {
            item_index,
            top,
            bottom: top + row_height,
        });
        cursor.current_y += row_height;
        true
    }

    fn draw_image_cell(&self, page: &mut LayoutPage, column: &ColumnSpec, item: &LineItem, bounds: Rect) {
        let src = column.display_value(item);
        let src = src.trim();
        if src.is_empty() {
            return;
        }
        let padded = bounds.inset(&self.config.image.padding);
        match self.resolve_image(src) {
            Some(image) => {
                let natural = image.natural_size_mm(self.config.image.dpi);
                let rect = fit_image(natural, padded, self.config.image.fit);
                page.ops.push(image_op(rect, image));
            }
            None => page.ops.push(image_op(padded, self.placeholder.clone())),
        }
    }

    /// Draw the description and the note of a row into `bounds`.
    ///
    /// The description is top-anchored and takes the space above the note;
    /// the note, prefixed and in italics, takes one line at the bottom.
    pub fn layout_note(
        &self,
        page: &mut LayoutPage,
        style: &RowNoteSpec,
        description: &str,
        note: &str,
        bounds: Rect,
    ) {
        let params = &style.text;
        let note = note.trim();
        let mut description_box = bounds;

        if !note.is_empty() {
            let note_height =
                (params.line_height_mm(params.initial_size) + 2.0 * params.padding).min(bounds.height);
            let note_box = Rect::new(
                bounds.x,
                bounds.bottom() - note_height,
                bounds.width,
                note_height,
            );
            description_box.height = (bounds.height - note_height).max(0.0);
            let italic = params.with_style(FontStyle {
                italic: true,
                ..params.style
            });
            let text = format!("{}{}", style.note_prefix, note);
            self.draw_text_box(page, &text, note_box, &italic, TextAlign::Left, VAlign::Top);
        }

        self.draw_text_box(
            page,
            description,
            description_box,
            params,
            TextAlign::Left,
            VAlign::Top,
        );
    }

    /// Place the general notes block below the table, on a new page if it
    /// does not fit the remaining space at its initial size.
    pub fn layout_general_notes(
        &self,
        doc: &mut Document,
        cursor: &mut PageCursor,
        text: &str,
    ) -> Result<(), ProformaError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let style = &self.config.general_notes;
        let limit = self.config.page.content_bottom();
        let width = self.config.table_width();
        let title_params = FitParams {
            initial_size: style.title_size,
            min_size: style.title_size.min(5.0),
            step: 0.5,
            padding: 0.0,
            line_height: 1.2,
            style: FontStyle::BOLD,
        };
        let title_h = title_params.line_height_mm(style.title_size);

        let body = &style.text;
        let natural_lines = self
            .text_layout
            .break_into_lines(
                &self.fonts,
                text.trim(),
                (width - 2.0 * body.padding).max(0.0) * MM_TO_PT,
                body.initial_size,
                body.style,
            )
            .len();
        let needed = title_h
            + natural_lines as f64 * body.line_height_mm(body.initial_size)
            + 2.0 * body.padding;

        let mut top = cursor.current_y + style.gap_before;
        if top + needed > limit + EPSILON && cursor.current_y > self.rows_top() + EPSILON {
            debug!("general notes move to page {}", doc.pages.len() + 1);
            self.start_page(doc, cursor);
            top = cursor.current_y + style.gap_before;
        }

        let page = doc.page_mut(cursor)?;
        let left = self.config.page.margin.left;
        let title_box = Rect::new(left, top, width, title_h.min((limit - top).max(0.0)));
        self.draw_text_box(page, &style.title, title_box, &title_params, TextAlign::Left, VAlign::Top);

        let body_top = top + title_h;
        let body_box = Rect::new(left, body_top, width, (limit - body_top).max(0.0));
        let fitted = self.draw_text_box(page, text.trim(), body_box, body, TextAlign::Left, VAlign::Top);

        cursor.current_y = (body_top + fitted.block_height() + 2.0 * body.padding).min(limit);
        Ok(())
    }

    /// Lay out every item in order, starting new pages as needed, then the
    /// general notes.
    pub fn finalize_document(
        &self,
        items: &[LineItem],
        general_notes: Option<&str>,
    ) -> Result<Document, ProformaError> {
        let mut doc = self.begin_document()?;
        let mut cursor = PageCursor::default();
        self.start_page(&mut doc, &mut cursor);

        let row_height = self.config.row_height;
        let limit = self.config.page.content_bottom();
        for (index, item) in items.iter().enumerate() {
            match page_break::decide_row(cursor.current_y, row_height, limit, self.rows_top()) {
                BreakDecision::Place => {}
                BreakDecision::MoveToNextPage => {
                    debug!("row {} moves to page {}", index + 1, doc.pages.len() + 1);
                    self.start_page(&mut doc, &mut cursor);
                }
                BreakDecision::TooTall => return Err(self.too_tall(index)),
            }
            if !self.layout_row(doc.page_mut(&cursor)?, &mut cursor, index, item, row_height) {
                return Err(self.too_tall(index));
            }
        }

        if let Some(text) = general_notes {
            self.layout_general_notes(&mut doc, &mut cursor, text)?;
        }
        Ok(doc)
    }

    fn too_tall(&self, index: usize) -> ProformaError {
        ProformaError::Layout(format!(
            "row taller than page: item {} needs {:.1} mm but only {:.1} mm are free below the headers",
            index + 1,
            self.config.row_height,
            self.config.page.content_bottom() - self.rows_top()
        ))
    }

    /// Fit `text` into `bounds` and push the resulting line operations.
    fn draw_text_box(
        &self,
        page: &mut LayoutPage,
        text: &str,
        bounds: Rect,
        params: &FitParams,
        align: TextAlign,
        valign: VAlign,
    ) -> FittedText {
        let fitted = fit_text(
            &self.fonts,
            &self.text_layout,
            text,
            bounds.width,
            bounds.height,
            params,
        );
        let inner = bounds.inset(&Edges::uniform(params.padding));
        page.ops.extend(place_lines(
            &self.fonts,
            &fitted,
            inner,
            align,
            valign,
            params.style,
            self.config.text_color,
        ));
        fitted
    }

    fn border(&self, rect: Rect) -> DrawOp {
        DrawOp::Rect {
            rect,
            stroke: Some(self.config.border_color),
            fill: None,
            line_width: self.config.border_width,
        }
    }

    /// Resolve through the cache. `None` means draw a placeholder.
    fn resolve_image(&self, src: &str) -> Option<Arc<LoadedImage>> {
        if let Some(cached) = self.image_cache.borrow().get(src) {
            return cached.clone();
        }
        let resolved = match self.resolver.resolve(src) {
            Ok(image) => Some(Arc::new(image)),
            Err(e) => {
                warn!("{}; drawing a placeholder", e);
                None
            }
        };
        self.image_cache
            .borrow_mut()
            .insert(src.to_string(), resolved.clone());
        resolved
    }
}

fn image_op(rect: Rect, image: Arc<LoadedImage>) -> DrawOp {
    DrawOp::Image {
        rect,
        width_px: image.width_px,
        height_px: image.height_px,
        image,
    }
}

/// Fit parameters for a single header line.
fn line_params(size: f64, style: FontStyle) -> FitParams {
    FitParams {
        initial_size: size,
        min_size: size.min(5.0),
        step: 0.5,
        padding: 0.0,
        line_height: 1.15,
        style,
    }
}

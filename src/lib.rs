//! # Proforma
//!
//! A paginated order-sheet engine. An order is a header block (logo, company
//! lines, client and other party fields), a fixed column schema and a list of
//! line items. The engine turns it into pages of a bordered grid, one row per
//! item, with the header block and column headers repeated on every page.
//!
//! Column widths never depend on content. Text that does not fit its cell is
//! wrapped and shrunk, then clipped at the minimum font size. Images keep
//! their aspect ratio and are centered in their cell. An image that cannot be
//! loaded becomes a grey placeholder; the document still completes.
//!
//! ## Architecture
//!
//! ```text
//! Order (JSON/API)            Proforma cart
//!       ↓                           ↓ to_line_items
//!   [model]  + [config]  ←──────────┘
//!       ↓
//!   [layout]   fixed-grid page engine, uses [text::fit] and [image_loader]
//!       ↓
//!   [pdf]      serialize to PDF bytes
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

pub use error::ProformaError;

use log::info;

use image_loader::ImageResolver;
use layout::{Document, LayoutEngine};
use model::Order;
use pdf::PdfWriter;

/// Lay out an order into pages without serializing it.
pub fn layout(order: &Order, resolver: &dyn ImageResolver) -> Result<Document, ProformaError> {
    let engine = LayoutEngine::new(&order.config, &order.header, resolver);
    engine.finalize_document(&order.items, order.general_notes.as_deref())
}

/// Render an order to PDF bytes.
///
/// This is the primary entry point. Nothing is written anywhere; the caller
/// decides where the bytes go, so a failed render leaves no artifact.
pub fn render(order: &Order, resolver: &dyn ImageResolver) -> Result<Vec<u8>, ProformaError> {
    let doc = layout(order, resolver)?;
    let bytes = PdfWriter::new().write(&doc, &order.metadata)?;
    info!(
        "rendered {} items on {} pages ({} bytes)",
        doc.row_count(),
        doc.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Render an order described as JSON to PDF bytes.
pub fn render_json(json: &str, resolver: &dyn ImageResolver) -> Result<Vec<u8>, ProformaError> {
    let order: Order = serde_json::from_str(json)?;
    render(&order, resolver)
}

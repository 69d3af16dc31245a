//! # Order Model
//!
//! The input representation for the layout engine: the column schema, the
//! line items that fill the table, the header block repeated on every page,
//! and the page format.
//!
//! All lengths are millimetres. Font sizes are points.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::style::TextAlign;

/// Points to millimetres.
pub const PT_TO_MM: f64 = 25.4 / 72.0;
/// Millimetres to points.
pub const MM_TO_PT: f64 = 72.0 / 25.4;

/// A complete order ready for rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Document metadata (title, author, etc.)
    #[serde(default)]
    pub metadata: Metadata,

    /// Page format, column schema and typographic constants.
    #[serde(default)]
    pub config: LayoutConfig,

    /// Logo, company text and party fields drawn at the top of every page.
    #[serde(default)]
    pub header: HeaderBlock,

    /// The table rows, in order.
    #[serde(default)]
    pub items: Vec<LineItem>,

    /// Free text printed after the last row.
    #[serde(default)]
    pub general_notes: Option<String>,

    /// Explicit output file name. Derived from the recipient when absent.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Order {
    /// The file name the rendered document should be saved under.
    pub fn output_file_name(&self) -> String {
        match &self.file_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => crate::cart::file_name_for(self.header.recipient().unwrap_or("")),
        }
    }
}

/// Document metadata embedded in the PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

/// Page size and margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFormat {
    #[serde(default)]
    pub size: PageSize,
    #[serde(default = "default_page_margin")]
    pub margin: Edges,
}

fn default_page_margin() -> Edges {
    Edges::uniform(10.0)
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: default_page_margin(),
        }
    }
}

impl PageFormat {
    /// Returns (width, height) in millimetres.
    pub fn dimensions(&self) -> (f64, f64) {
        self.size.dimensions()
    }

    /// Page width minus left and right margins.
    pub fn usable_width(&self) -> f64 {
        self.size.dimensions().0 - self.margin.horizontal()
    }

    /// The lowest y any content may reach: page height minus bottom margin.
    pub fn content_bottom(&self) -> f64 {
        self.size.dimensions().1 - self.margin.bottom
    }

    /// Page height minus top and bottom margins.
    pub fn usable_height(&self) -> f64 {
        self.size.dimensions().1 - self.margin.vertical()
    }
}

/// Standard page sizes in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in millimetres.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::A3 => (297.0, 420.0),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margin and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// What a column renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ColumnKind {
    /// Plain text, wrapped and shrunk to fit.
    #[default]
    Text,
    /// The value is an image reference resolved through the engine's resolver.
    Image,
    /// A price, printed with two decimals after the currency symbol.
    Price { currency: String },
}

/// One table column. Widths are fixed; content never resizes a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// The line item key this column reads.
    pub key: String,
    /// Header label.
    pub label: String,
    /// Width in millimetres.
    pub width: f64,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn text(key: &str, label: &str, width: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            width,
            align: TextAlign::Left,
            kind: ColumnKind::Text,
        }
    }

    pub fn image(key: &str, label: &str, width: f64) -> Self {
        Self {
            kind: ColumnKind::Image,
            align: TextAlign::Center,
            ..Self::text(key, label, width)
        }
    }

    pub fn price(key: &str, label: &str, width: f64, currency: &str) -> Self {
        Self {
            kind: ColumnKind::Price {
                currency: currency.to_string(),
            },
            ..Self::text(key, label, width)
        }
    }

    /// The display string for this column's cell in `item`.
    ///
    /// Missing keys produce an empty string.
    pub fn display_value(&self, item: &LineItem) -> String {
        let Some(value) = item.get(&self.key) else {
            return String::new();
        };
        match &self.kind {
            ColumnKind::Price { currency } => {
                let amount = match value {
                    CellValue::Number(n) => format!("{:.2}", n),
                    CellValue::Text(s) => format_price(s),
                    CellValue::Empty => format_price(""),
                };
                if currency.is_empty() {
                    amount
                } else {
                    format!("{} {}", currency, amount)
                }
            }
            ColumnKind::Text | ColumnKind::Image => value.display(),
        }
    }
}

/// A single field value of a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

/// One table row: a mapping from column key to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItem {
    fields: BTreeMap<String, CellValue>,
}

impl LineItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<CellValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    /// The display text for `key`, empty when the key is absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(CellValue::display).unwrap_or_default()
    }
}

/// The block drawn at the top of every page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderBlock {
    /// Image reference for the company logo.
    #[serde(default)]
    pub logo: Option<String>,
    /// Static company text (address, VAT number, contacts).
    #[serde(default)]
    pub company_lines: Vec<String>,
    /// Dynamic `label: value` fields. The first one names the recipient.
    #[serde(default)]
    pub parties: Vec<PartyField>,
    /// Optional box on the right-hand side (e.g. the sales representative).
    #[serde(default)]
    pub contact: Option<ContactBox>,
}

impl HeaderBlock {
    /// The value of the first party field, if any.
    pub fn recipient(&self) -> Option<&str> {
        self.parties.first().map(|p| p.value.as_str())
    }

    /// Fill every empty `today` field with `date` as `dd/mm/yyyy`.
    pub fn fill_today(&mut self, date: NaiveDate) {
        let formatted = date.format("%d/%m/%Y").to_string();
        for party in self.parties.iter_mut().filter(|p| p.today && p.value.is_empty()) {
            party.value = formatted.clone();
        }
    }
}

/// A `label: value` line in the header block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyField {
    pub label: String,
    #[serde(default)]
    pub value: String,
    /// When set and `value` is empty, the caller fills in today's date.
    #[serde(default)]
    pub today: bool,
}

impl PartyField {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            today: false,
        }
    }

    pub fn today(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: String::new(),
            today: true,
        }
    }

    pub fn line(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

/// Right-hand box of the header block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBox {
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Format a price string with two decimals, accepting `,` as the decimal
/// separator. Unparseable input yields `0.00`.
pub fn format_price(raw: &str) -> String {
    let normalized = raw.trim().replacen(',', ".", 1);
    let source = if normalized.is_empty() { "0" } else { normalized.as_str() };
    match source.parse::<f64>() {
        Ok(v) if v.is_finite() => format!("{:.2}", v),
        _ => "0.00".to_string(),
    }
}

/// Integers print without a fractional part, everything else as-is.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_formatting() {
        assert_eq!(format_price("12,5"), "12.50");
        assert_eq!(format_price(" 3.456 "), "3.46");
        assert_eq!(format_price(""), "0.00");
        assert_eq!(format_price("n/a"), "0.00");
    }

    #[test]
    fn price_column_display() {
        let col = ColumnSpec::price("price", "Price", 15.0, "€");
        let item = LineItem::new().with("price", "7,2");
        assert_eq!(col.display_value(&item), "€ 7.20");
        let item = LineItem::new().with("price", 4.0);
        assert_eq!(col.display_value(&item), "€ 4.00");
    }

    #[test]
    fn missing_key_renders_empty() {
        let col = ColumnSpec::text("moq", "MOQ", 10.0);
        assert_eq!(col.display_value(&LineItem::new()), "");
        let col = ColumnSpec::price("price", "Price", 15.0, "€");
        assert_eq!(col.display_value(&LineItem::new()), "");
    }

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(CellValue::Number(3.0).display(), "3");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
    }

    #[test]
    fn line_item_json_accepts_mixed_values() {
        let item: LineItem =
            serde_json::from_str(r#"{"code": "A1", "quantity": 3, "note": null}"#).unwrap();
        assert_eq!(item.text("code"), "A1");
        assert_eq!(item.text("quantity"), "3");
        assert_eq!(item.get("note"), Some(&CellValue::Empty));
        assert_eq!(item.text("unknown"), "");
    }

    #[test]
    fn column_kind_json() {
        let col: ColumnSpec = serde_json::from_str(
            r#"{"key": "price", "label": "Price", "width": 15, "kind": {"type": "price", "currency": "$"}}"#,
        )
        .unwrap();
        assert_eq!(
            col.kind,
            ColumnKind::Price {
                currency: "$".to_string()
            }
        );
        assert_eq!(col.align, TextAlign::Left);
    }

    #[test]
    fn page_format_geometry() {
        let format = PageFormat::default();
        assert_eq!(format.dimensions(), (210.0, 297.0));
        assert!((format.usable_width() - 190.0).abs() < 1e-9);
        assert!((format.content_bottom() - 287.0).abs() < 1e-9);
        assert!((format.usable_height() - 277.0).abs() < 1e-9);
    }

    #[test]
    fn fill_today_only_touches_empty_date_fields() {
        let mut header = HeaderBlock {
            parties: vec![
                PartyField::new("Client", "Rossi"),
                PartyField::today("Date"),
                PartyField {
                    label: "Due".to_string(),
                    value: "01/01/2030".to_string(),
                    today: true,
                },
            ],
            ..Default::default()
        };
        header.fill_today(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert_eq!(header.parties[0].value, "Rossi");
        assert_eq!(header.parties[1].value, "09/03/2026");
        assert_eq!(header.parties[2].value, "01/01/2030");
        assert_eq!(header.recipient(), Some("Rossi"));
    }

    #[test]
    fn output_file_name_from_recipient() {
        let mut order = Order::default();
        order.header.parties.push(PartyField::new("Client", "Mario  Rossi Srl"));
        assert_eq!(order.output_file_name(), "proforma-mario_rossi_srl.pdf");
        order.file_name = Some("custom.pdf".to_string());
        assert_eq!(order.output_file_name(), "custom.pdf");
    }
}

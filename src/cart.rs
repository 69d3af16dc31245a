//! # Catalog and Proforma List
//!
//! The caller-side state that feeds the layout engine: a product catalog
//! searchable by code, and the list of products picked for one proforma with
//! their quantities and notes. [`Proforma::to_line_items`] takes the
//! immutable snapshot the engine renders.

use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::model::LineItem;

/// One catalog product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub code: String,
    pub description: String,
    /// Image reference (data URI, path or URL) passed to the resolver.
    pub image: String,
    pub unit: String,
    pub moq: String,
    /// Price as entered; `,` is accepted as the decimal separator.
    pub price: String,
}

/// Products with a non-empty code.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .filter(|p| !p.code.trim().is_empty())
                .collect(),
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Products whose code contains `term`, ignoring case.
    ///
    /// A blank term matches every product.
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let term = term.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| p.code.to_lowercase().contains(&term))
            .collect()
    }
}

/// A product on the proforma list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProformaEntry {
    pub product: Product,
    pub quantity: u32,
    pub note: String,
}

/// The ordered list of products for one proforma.
#[derive(Debug, Clone, Default)]
pub struct Proforma {
    entries: Vec<ProformaEntry>,
}

impl Proforma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ProformaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a product with quantity 1. A product whose code is already on
    /// the list is rejected.
    pub fn add(&mut self, product: Product) -> Result<(), ProformaError> {
        if self.entries.iter().any(|e| e.product.code == product.code) {
            return Err(ProformaError::Cart(format!(
                "item '{}' is already on the proforma",
                product.code
            )));
        }
        self.entries.push(ProformaEntry {
            product,
            quantity: 1,
            note: String::new(),
        });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<ProformaEntry, ProformaError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index))
    }

    /// Set the quantity from user input. Anything that does not parse as a
    /// positive integer becomes 1.
    pub fn set_quantity(&mut self, index: usize, raw: &str) -> Result<u32, ProformaError> {
        self.check_index(index)?;
        let quantity = parse_quantity(raw);
        self.entries[index].quantity = quantity;
        Ok(quantity)
    }

    pub fn set_note(&mut self, index: usize, note: &str) -> Result<(), ProformaError> {
        self.check_index(index)?;
        self.entries[index].note = note.to_string();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Snapshot the list as table rows.
    ///
    /// Keys: `code`, `description`, `image`, `unit`, `moq`, `price`,
    /// `quantity` and, when set, `note`.
    pub fn to_line_items(&self) -> Vec<LineItem> {
        self.entries
            .iter()
            .map(|e| {
                let p = &e.product;
                let mut item = LineItem::new()
                    .with("code", p.code.as_str())
                    .with("description", p.description.as_str())
                    .with("image", p.image.as_str())
                    .with("unit", p.unit.as_str())
                    .with("moq", p.moq.as_str())
                    .with("price", p.price.as_str())
                    .with("quantity", e.quantity);
                if !e.note.trim().is_empty() {
                    item.insert("note", e.note.as_str());
                }
                item
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), ProformaError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(ProformaError::Cart(format!(
                "no item at position {} (the proforma has {})",
                index,
                self.entries.len()
            )))
        }
    }
}

/// Leading integer of `raw`, at least 1.
fn parse_quantity(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .trim_start_matches('+')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|&q| q >= 1).unwrap_or(1)
}

/// `proforma-<client>.pdf` with the client lowercased and whitespace runs
/// replaced by `_`.
pub fn file_name_for(client: &str) -> String {
    let slug = client
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() {
        "proforma.pdf".to_string()
    } else {
        format!("proforma-{}.pdf", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str) -> Product {
        Product {
            code: code.to_string(),
            description: format!("{code} description"),
            price: "9,90".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn catalog_drops_empty_codes_and_searches() {
        let catalog = Catalog::new(vec![product("AB-100"), product("  "), product("cd-200")]);
        assert_eq!(catalog.products().len(), 2);
        let hits: Vec<_> = catalog.search(" ab ").iter().map(|p| p.code.as_str()).collect();
        assert_eq!(hits, vec!["AB-100"]);
        assert_eq!(catalog.search("-").len(), 2);
        assert_eq!(catalog.search("").len(), 2);
        assert_eq!(catalog.search("   ").len(), 2);
        assert!(catalog.search("zz").is_empty());
    }

    #[test]
    fn duplicate_code_rejected() {
        let mut proforma = Proforma::new();
        proforma.add(product("A")).unwrap();
        let err = proforma.add(product("A")).unwrap_err();
        assert!(matches!(err, ProformaError::Cart(_)));
        assert_eq!(proforma.len(), 1);
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("12"), 12);
        assert_eq!(parse_quantity("3 boxes"), 3);
        assert_eq!(parse_quantity(""), 1);
        assert_eq!(parse_quantity("abc"), 1);
        assert_eq!(parse_quantity("0"), 1);
        assert_eq!(parse_quantity("-4"), 1);
    }

    #[test]
    fn edits_check_the_index() {
        let mut proforma = Proforma::new();
        proforma.add(product("A")).unwrap();
        assert_eq!(proforma.set_quantity(0, "5").unwrap(), 5);
        proforma.set_note(0, "gift wrap").unwrap();
        assert!(proforma.set_quantity(1, "5").is_err());
        assert!(proforma.set_note(3, "x").is_err());
        assert!(proforma.remove(2).is_err());
        assert_eq!(proforma.remove(0).unwrap().quantity, 5);
        assert!(proforma.is_empty());
    }

    #[test]
    fn line_items_snapshot() {
        let mut proforma = Proforma::new();
        proforma.add(product("A")).unwrap();
        proforma.add(product("B")).unwrap();
        proforma.set_quantity(1, "7").unwrap();
        proforma.set_note(1, "urgent").unwrap();

        let items = proforma.to_line_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text("code"), "A");
        assert_eq!(items[0].text("quantity"), "1");
        assert!(items[0].get("note").is_none());
        assert_eq!(items[1].text("quantity"), "7");
        assert_eq!(items[1].text("note"), "urgent");

        proforma.reset();
        assert!(proforma.to_line_items().is_empty());
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name_for("Mario  Rossi Srl"), "proforma-mario_rossi_srl.pdf");
        assert_eq!(file_name_for("ACME"), "proforma-acme.pdf");
        assert_eq!(file_name_for("  "), "proforma.pdf");
    }
}

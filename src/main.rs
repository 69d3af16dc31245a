//! # Proforma CLI
//!
//! Usage:
//!   proforma order.json -o proforma.pdf
//!   cat order.json | proforma
//!   proforma --example > order.json
//!   proforma order.json --layout-json

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;

use proforma::image_loader::SourceImageResolver;
use proforma::model::Order;
use proforma::ProformaError;

#[derive(Parser)]
#[command(name = "proforma")]
#[command(version)]
#[command(about = "Render an order JSON file to a paginated proforma PDF", long_about = None)]
struct Cli {
    /// Order JSON file (stdin if not specified)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output PDF file (derived from the client name if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print a sample order and exit
    #[arg(long)]
    example: bool,

    /// Print the laid-out pages as JSON instead of writing a PDF
    #[arg(long)]
    layout_json: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.example {
        print!("{}", example_order_json());
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), ProformaError> {
    let input = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut order: Order = serde_json::from_str(&input)?;
    order.header.fill_today(Local::now().date_naive());
    let resolver = SourceImageResolver::default();

    if cli.layout_json {
        let doc = proforma::layout(&order, &resolver)?;
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| ProformaError::Io(io::Error::other(e)))?;
        println!("{}", json);
        return Ok(());
    }

    let pdf_bytes = proforma::render(&order, &resolver)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(order.output_file_name()));
    write_atomically(&output_path, &pdf_bytes)?;
    eprintln!(
        "✓ Written {} bytes to {}",
        pdf_bytes.len(),
        output_path.display()
    );
    Ok(())
}

/// Write to a sibling `.part` file and rename it into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn example_order_json() -> &'static str {
    r##"{
  "metadata": {
    "title": "Proforma - Rossi Pelletteria",
    "author": "Anna Bianchi"
  },
  "header": {
    "logo": "./logo.jpg",
    "companyLines": [
      "VIA DELLE INDUSTRIE 12",
      "62015 MONTE SAN GIUSTO MC",
      "VAT 01234567890",
      "www.example.com   info@example.com",
      "TEL. +39 0733 000000"
    ],
    "parties": [
      { "label": "Client", "value": "Rossi Pelletteria" },
      { "label": "Bank", "value": "Banca Marche, IBAN IT00X0000000000000000000000" },
      { "label": "Date", "today": true },
      { "label": "Courier", "value": "BRT" }
    ],
    "contact": {
      "title": "REPRESENTATIVE:",
      "name": "Anna Bianchi",
      "email": "anna.bianchi@example.com"
    }
  },
  "items": [
    {
      "code": "BG-1042",
      "description": "Leather tote bag, reinforced handles, magnetic closure",
      "image": "./images/bg-1042.jpg",
      "unit": "pcs",
      "moq": "6",
      "price": "48,50",
      "quantity": 12
    },
    {
      "code": "WL-0007",
      "description": "Bifold wallet in vegetable-tanned leather",
      "image": "./images/wl-0007.png",
      "unit": "pcs",
      "moq": "12",
      "price": "19.9",
      "quantity": 24,
      "note": "Embossed logo on the inside flap"
    },
    {
      "code": "BL-3310",
      "description": "Braided belt, brass buckle",
      "image": "./images/bl-3310.jpg",
      "unit": "pcs",
      "moq": "10",
      "price": "22",
      "quantity": 10
    },
    {
      "code": "KH-0210",
      "description": "Key holder with snap hook",
      "image": "./images/kh-0210.jpg",
      "unit": "box",
      "moq": "1",
      "price": "35",
      "quantity": 2
    }
  ],
  "generalNotes": "Prices exclude VAT. Delivery within 30 days of order confirmation. Payment by bank transfer."
}
"##
}

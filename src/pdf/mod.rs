//! # PDF Serializer
//!
//! Takes the laid-out pages from the layout engine and writes a PDF 1.7 file.
//!
//! The subset needed for an order sheet is small: stroked and filled
//! rectangles, single-line text in the standard Helvetica faces, and image
//! XObjects. Layout works in millimetres from the top-left corner; PDF user
//! space is points from the bottom-left, so every coordinate is converted
//! here and nowhere else.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! The output carries no timestamps, so identical documents serialize to
//! identical bytes.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::ProformaError;
use crate::font::StandardFont;
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::{Document, DrawOp, LayoutPage, Rect};
use crate::model::{Metadata, MM_TO_PT};
use crate::style::FontStyle;

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Fonts in resource order: `/F0`, `/F1`, ...
    font_objects: Vec<(StandardFont, usize)>,
    /// XObject ids in resource order: `/Im0`, `/Im1`, ...
    image_objects: Vec<usize>,
    /// Shared images are embedded once, keyed by allocation.
    image_index: HashMap<*const LoadedImage, usize>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write a laid-out document to a PDF byte vector.
    pub fn write(&self, doc: &Document, metadata: &Metadata) -> Result<Vec<u8>, ProformaError> {
        if doc.pages.is_empty() {
            return Err(ProformaError::Layout(
                "cannot serialize a document without pages".to_string(),
            ));
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            image_objects: Vec::new(),
            image_index: HashMap::new(),
        };

        // 0 = free entry, 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: vec![] });
        }

        self.register_fonts(&mut builder, &doc.pages);
        self.register_images(&mut builder, &doc.pages);

        let font_resources = self.build_font_resource_dict(&builder);
        let mut page_obj_ids: Vec<usize> = Vec::new();

        for page in &doc.pages {
            let content = self.build_content_stream_for_page(page, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let xobject_resources = self.build_xobject_resource_dict(page, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!(
                    "/Font << {} >> /XObject << {} >>",
                    font_resources, xobject_resources
                )
            };
            let page_obj_id = builder.objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width * MM_TO_PT,
                page.height * MM_TO_PT,
                content_obj_id,
                resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = self.write_info(&mut builder, metadata);
        Ok(self.serialize(&builder, info_obj_id))
    }

    fn write_info(&self, builder: &mut PdfBuilder, metadata: &Metadata) -> Option<usize> {
        let entries = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Creator", &metadata.creator),
        ];
        if entries.iter().all(|(_, v)| v.is_none()) {
            return None;
        }
        let mut info = String::from("<< ");
        for (key, value) in entries {
            if let Some(value) = value {
                let _ = write!(info, "/{} ({}) ", key, Self::encode_text(value));
            }
        }
        info.push_str("/Producer (proforma) >>");
        let id = builder.objects.len();
        builder.objects.push(PdfObject {
            data: info.into_bytes(),
        });
        Some(id)
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream_for_page(&self, page: &LayoutPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        for op in &page.ops {
            self.write_op(&mut stream, op, page.height, builder);
        }
        stream
    }

    fn write_op(&self, stream: &mut String, op: &DrawOp, page_height: f64, builder: &PdfBuilder) {
        match op {
            DrawOp::Rect {
                rect,
                stroke,
                fill,
                line_width,
            } => {
                let (x, y, w, h) = to_pdf_rect(rect, page_height);
                let _ = writeln!(stream, "q");
                if let Some(c) = fill {
                    let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
                }
                if let Some(c) = stroke {
                    let _ = writeln!(
                        stream,
                        "{:.3} {:.3} {:.3} RG\n{:.2} w",
                        c.r,
                        c.g,
                        c.b,
                        line_width * MM_TO_PT
                    );
                }
                let paint = match (fill.is_some(), stroke.is_some()) {
                    (true, true) => "B",
                    (true, false) => "f",
                    (false, true) => "S",
                    (false, false) => "n",
                };
                let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re\n{}\nQ", x, y, w, h, paint);
            }

            DrawOp::Text {
                x,
                baseline,
                text,
                font_size,
                style,
                color,
            } => {
                let font = self.font_index(*style, &builder.font_objects);
                let _ = writeln!(
                    stream,
                    "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.2} Tf\n{:.2} {:.2} Td\n({}) Tj\nET",
                    color.r,
                    color.g,
                    color.b,
                    font,
                    font_size,
                    x * MM_TO_PT,
                    (page_height - baseline) * MM_TO_PT,
                    Self::encode_text(text)
                );
            }

            DrawOp::Image { rect, image, .. } => {
                let (x, y, w, h) = to_pdf_rect(rect, page_height);
                // Every image op was registered by `register_images`.
                if let Some(idx) = builder.image_index.get(&Arc::as_ptr(image)) {
                    let _ = writeln!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ",
                        w, h, x, y, idx
                    );
                }
            }
        }
    }

    /// Register the faces used anywhere in the document, in a stable order.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        let mut fonts: BTreeSet<StandardFont> = pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter_map(|op| match op {
                DrawOp::Text { style, .. } => Some(StandardFont::from_style(*style)),
                _ => None,
            })
            .collect();

        // Every page references /F0, so always have at least Helvetica.
        if fonts.is_empty() {
            fonts.insert(StandardFont::Helvetica);
        }

        for font in fonts {
            let obj_id = builder.objects.len();
            let font_dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.pdf_name()
            );
            builder.objects.push(PdfObject {
                data: font_dict.into_bytes(),
            });
            builder.font_objects.push((font, obj_id));
        }
    }

    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        for page in pages {
            for op in &page.ops {
                if let DrawOp::Image { image, .. } = op {
                    let key = Arc::as_ptr(image);
                    if builder.image_index.contains_key(&key) {
                        continue;
                    }
                    let xobj_id = Self::write_image_xobject(builder, image);
                    builder.image_index.insert(key, builder.image_objects.len());
                    builder.image_objects.push(xobj_id);
                }
            }
        }
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                let obj_id = builder.objects.len();
                let mut obj_data: Vec<u8> = Vec::new();
                let _ = write!(
                    obj_data,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    color_space,
                    data.len()
                );
                obj_data.extend_from_slice(data);
                obj_data.extend_from_slice(b"\nendstream");
                builder.objects.push(PdfObject { data: obj_data });
                obj_id
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                let smask_id = alpha.as_ref().map(|alpha_data| {
                    let obj_id = builder.objects.len();
                    let data = flate_image_stream(image, "/DeviceGray", alpha_data, "");
                    builder.objects.push(PdfObject { data });
                    obj_id
                });

                let smask_ref = smask_id
                    .map(|id| format!(" /SMask {} 0 R", id))
                    .unwrap_or_default();
                let obj_id = builder.objects.len();
                let data = flate_image_stream(image, "/DeviceRGB", rgb, &smask_ref);
                builder.objects.push(PdfObject { data });
                obj_id
            }
        }
    }

    /// The /XObject resource entries for the images a page draws.
    fn build_xobject_resource_dict(&self, page: &LayoutPage, builder: &PdfBuilder) -> String {
        let used: BTreeSet<usize> = page
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Image { image, .. } => builder.image_index.get(&Arc::as_ptr(image)).copied(),
                _ => None,
            })
            .collect();
        used.iter()
            .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx]))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_font_resource_dict(&self, builder: &PdfBuilder) -> String {
        builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up the font index (/F0, /F1, ...) for a style.
    fn font_index(&self, style: FontStyle, font_objects: &[(StandardFont, usize)]) -> usize {
        let wanted = StandardFont::from_style(style);
        font_objects
            .iter()
            .position(|(font, _)| *font == wanted)
            .unwrap_or(0)
    }

    /// Encode text as the body of a PDF literal string in WinAnsiEncoding.
    ///
    /// Characters outside WinAnsi become `?`. Bytes outside printable ASCII
    /// use octal escapes so the content stream stays ASCII.
    fn encode_text(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252: Latin-1 maps directly and
    /// 0x80..=0x9F holds quotes, dashes, the euro sign and friends.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // euro
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // bullet
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: Option<usize>) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R",
            builder.objects.len()
        );
        if let Some(info_id) = info_obj_id {
            let _ = write!(output, " /Info {} 0 R", info_id);
        }
        let _ = write!(output, " >>\nstartxref\n{}\n%%EOF\n", xref_offset);

        output
    }
}

/// Convert a top-left millimetre rect to a bottom-left point rect.
fn to_pdf_rect(rect: &Rect, page_height: f64) -> (f64, f64, f64, f64) {
    (
        rect.x * MM_TO_PT,
        (page_height - rect.y - rect.height) * MM_TO_PT,
        rect.width * MM_TO_PT,
        rect.height * MM_TO_PT,
    )
}

fn flate_image_stream(image: &LoadedImage, color_space: &str, pixels: &[u8], extra: &str) -> Vec<u8> {
    let compressed = compress_to_vec_zlib(pixels, 6);
    let mut data: Vec<u8> = Vec::new();
    let _ = write!(
        data,
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
         /ColorSpace {} /BitsPerComponent 8 /Filter /FlateDecode \
         /Length {}{} >>\nstream\n",
        image.width_px,
        image.height_px,
        color_space,
        compressed.len(),
        extra
    );
    data.extend_from_slice(&compressed);
    data.extend_from_slice(b"\nendstream");
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RowPlacement;
    use crate::model::PageFormat;
    use crate::style::Color;

    fn page(ops: Vec<DrawOp>) -> LayoutPage {
        LayoutPage {
            width: 210.0,
            height: 297.0,
            ops,
            rows: Vec::<RowPlacement>::new(),
            header_ops: 0,
        }
    }

    fn doc(pages: Vec<LayoutPage>) -> Document {
        Document {
            format: PageFormat::default(),
            pages,
        }
    }

    fn text(s: &str, style: FontStyle) -> DrawOp {
        DrawOp::Text {
            x: 10.0,
            baseline: 20.0,
            text: s.to_string(),
            font_size: 8.0,
            style,
            color: Color::BLACK,
        }
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(PdfWriter::encode_text("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::encode_text("back\\slash"), "back\\\\slash");
        assert_eq!(PdfWriter::encode_text("€ 5"), "\\200 5");
        assert_eq!(PdfWriter::encode_text("Q.tà"), "Q.t\\340");
        assert_eq!(PdfWriter::encode_text("日"), "?");
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let err = PdfWriter::new()
            .write(&doc(vec![]), &Metadata::default())
            .unwrap_err();
        assert!(matches!(err, ProformaError::Layout(_)));
    }

    #[test]
    fn test_blank_page_produces_valid_pdf() {
        let bytes = PdfWriter::new()
            .write(&doc(vec![page(vec![])]), &Metadata::default())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(text.contains("/MediaBox [0 0 595.28 841.89]"));
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.ends_with("%%EOF\n"));
        assert!(!text.contains("/Info"));
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("Proforma (Acme)".to_string()),
            author: Some("Anna".to_string()),
            subject: None,
            creator: None,
        };
        let bytes = PdfWriter::new()
            .write(&doc(vec![page(vec![])]), &metadata)
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Proforma \\(Acme\\))"));
        assert!(text.contains("/Author (Anna)"));
        assert!(!text.contains("/Subject"));
    }

    #[test]
    fn test_fonts_registered_per_style() {
        let ops = vec![
            text("a", FontStyle::REGULAR),
            text("b", FontStyle::BOLD),
            text("c", FontStyle::ITALIC),
            text("d", FontStyle::BOLD),
        ];
        let bytes = PdfWriter::new()
            .write(&doc(vec![page(ops)]), &Metadata::default())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Type1").count(), 3);
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/Helvetica-Oblique"));
    }

    #[test]
    fn test_shared_image_embedded_once() {
        let image = Arc::new(LoadedImage::placeholder());
        let op = |x: f64| DrawOp::Image {
            rect: Rect::new(x, 10.0, 20.0, 20.0),
            width_px: 1,
            height_px: 1,
            image: image.clone(),
        };
        let pages = vec![page(vec![op(10.0), op(40.0)]), page(vec![op(10.0)])];
        let bytes = PdfWriter::new()
            .write(&doc(pages), &Metadata::default())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Image").count(), 1);
        assert_eq!(text.matches("/XObject << /Im0").count(), 2);
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let ops = vec![
                text("A100", FontStyle::REGULAR),
                DrawOp::Image {
                    rect: Rect::new(50.0, 50.0, 30.0, 30.0),
                    width_px: 1,
                    height_px: 1,
                    image: Arc::new(LoadedImage::placeholder()),
                },
            ];
            PdfWriter::new()
                .write(&doc(vec![page(ops)]), &Metadata::default())
                .unwrap()
        };
        assert_eq!(build(), build());
    }
}

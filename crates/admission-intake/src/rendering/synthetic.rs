//! Minimal PDF writer used as the terminal rendering tier.
//!
//! The output is plain Helvetica text on US-Letter pages with a hand-built cross-reference
//! table. Nothing here reads the clock or any random source, so identical input text
//! produces identical bytes.

use std::sync::Arc;

use super::template::DocumentTemplate;
use super::{RenderError, Renderer};
use crate::admissions::domain::AdmissionRecord;

const WRAP_COLUMNS: usize = 90;
const LINES_PER_PAGE: usize = 48;
const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const FONT_SIZE: u32 = 10;
const LEADING: u32 = 15;
const LEFT_MARGIN: u32 = 50;
const TOP_BASELINE: u32 = 750;

/// Writes the record's text layout as a bare PDF, with the HTML layout as sidecar.
#[derive(Debug, Clone)]
pub struct SyntheticPdfRenderer {
    template: Arc<DocumentTemplate>,
}

impl SyntheticPdfRenderer {
    pub fn new(template: Arc<DocumentTemplate>) -> Self {
        Self { template }
    }
}

impl Renderer for SyntheticPdfRenderer {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn render(&self, record: &AdmissionRecord) -> Result<Vec<u8>, RenderError> {
        Ok(write_text_pdf(&self.template.render_text(record)))
    }

    fn html_sidecar(&self, record: &AdmissionRecord) -> Option<String> {
        Some(self.template.render_html(record))
    }
}

/// Lay out `text` as wrapped, paginated lines and serialize a PDF 1.4 document.
pub fn write_text_pdf(text: &str) -> Vec<u8> {
    let lines: Vec<String> = text
        .lines()
        .flat_map(|line| wrap(line, WRAP_COLUMNS))
        .collect();
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut writer = PdfWriter::default();
    writer.header();

    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", page_object(index)))
        .collect::<Vec<_>>()
        .join(" ");

    writer.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
    writer.object(
        2,
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).as_bytes(),
    );
    writer.object(
        3,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );

    for (index, page_lines) in pages.iter().enumerate() {
        let content_id = page_object(index) + 1;
        writer.object(
            page_object(index),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .as_bytes(),
        );
        writer.stream(content_id, &content_stream(page_lines));
    }

    writer.finish()
}

fn page_object(index: usize) -> usize {
    4 + 2 * index
}

fn content_stream(lines: &[String]) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(
        format!("BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{LEFT_MARGIN} {TOP_BASELINE} Td\n")
            .as_bytes(),
    );
    for line in lines {
        content.push(b'(');
        content.extend_from_slice(&escape_pdf_text(line));
        content.extend_from_slice(b") Tj T*\n");
    }
    content.extend_from_slice(b"ET\n");
    content
}

#[derive(Default)]
struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn header(&mut self) {
        self.buffer.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buffer.len()));
        self.buffer
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, data: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);
        let xref_offset = self.buffer.len();
        let size = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for (_, offset) in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        ));
        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

/// Escape a line for a PDF literal string. Characters outside Latin-1 become `?`.
fn escape_pdf_text(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\t' => out.push(b' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) <= 0xFF => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Greedy word wrap. Words longer than `width` are split.
fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admissions::domain::ApplicationId;
    use crate::config::BrandingConfig;
    use chrono::{TimeZone, Utc};

    fn renderer() -> SyntheticPdfRenderer {
        SyntheticPdfRenderer::new(Arc::new(DocumentTemplate::new(BrandingConfig {
            logo_candidates: Vec::new(),
            ..BrandingConfig::default()
        })))
    }

    fn record() -> AdmissionRecord {
        AdmissionRecord::new(
            ApplicationId("HLC20250042".to_string()),
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        )
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    #[test]
    fn identical_records_produce_identical_bytes() {
        let first = renderer().render(&record()).expect("first render");
        let second = renderer().render(&record()).expect("second render");
        assert_eq!(first, second);
    }

    #[test]
    fn output_is_a_small_well_formed_pdf() {
        let pdf = renderer().render(&record()).expect("render");

        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(pdf.len() > 1_000, "suspiciously small: {}", pdf.len());
        assert!(pdf.len() < 16 * 1024, "too large: {}", pdf.len());
        assert!(find(&pdf, b"(Application ID: HLC20250042) Tj").is_some());
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = write_text_pdf("hello\nworld");
        let text = String::from_utf8_lossy(&pdf).into_owned();

        let startxref = text.rfind("startxref\n").expect("startxref") + "startxref\n".len();
        let xref_offset: usize = text[startxref..]
            .lines()
            .next()
            .and_then(|value| value.parse().ok())
            .expect("xref offset");
        assert!(pdf[xref_offset..].starts_with(b"xref\n"));

        let table = String::from_utf8_lossy(&pdf[xref_offset..]).into_owned();
        let entries: Vec<&str> = table.lines().skip(3).take(5).collect();
        for (index, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().expect("offset digits");
            let expected = format!("{} 0 obj", index + 1);
            assert!(
                pdf[offset..].starts_with(expected.as_bytes()),
                "entry {index} does not point at object"
            );
        }
    }

    #[test]
    fn long_text_is_paginated() {
        let text = (0..100)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let pdf = write_text_pdf(&text);
        assert!(find(&pdf, b"/Count 3").is_some());
        assert!(find(&pdf, b"(line 99) Tj").is_some());
    }

    #[test]
    fn pdf_strings_are_escaped() {
        assert_eq!(escape_pdf_text("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(escape_pdf_text("caf\u{e9} \u{2713}"), b"caf\xe9 ?".to_vec());
    }

    #[test]
    fn wrap_breaks_on_whitespace_and_splits_long_words() {
        let line = format!("{} {}", "a".repeat(60), "b".repeat(60));
        assert_eq!(wrap(&line, 90), vec!["a".repeat(60), "b".repeat(60)]);

        let long = "x".repeat(200);
        let wrapped = wrap(&long, 90);
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped[2].len(), 20);
    }

    #[test]
    fn sidecar_is_the_html_document() {
        let html = renderer().html_sidecar(&record()).expect("sidecar");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("HLC20250042"));
    }
}

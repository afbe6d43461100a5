//! PDF text extraction backends.
//!
//! Each backend turns the raw bytes of one PDF into per-page text. The
//! loader picks a backend per [`ParsingStrategy`](crate::loader::ParsingStrategy):
//!
//! | Backend | Crate | Output |
//! |---------|-------|--------|
//! | [`FastTextBackend`] | `pdf-extract` | plain page text |
//! | [`TableBackend`] | `lopdf` | page text, tabular lines as `a \| b \| c` |
//! | `LayoutBackend` | `pdf-extract` | Markdown (headings, lists, tables) |
//!
//! Backends never panic on malformed input; errors are returned as strings
//! and wrapped into [`LoadError::Parse`](crate::error::LoadError) by the loader.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use lopdf::content::Content;
use lopdf::{Encoding, Object};

/// A PDF parser producing one text per page, in page order.
pub trait PdfBackend: Send + Sync {
    /// Stable backend name, recorded in document metadata.
    fn name(&self) -> &'static str;

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, String>;
}

/// Speed-oriented extraction via `pdf-extract`.
pub struct FastTextBackend;

impl PdfBackend for FastTextBackend {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
        pdf_extract_pages(bytes)
    }
}

/// Table-preserving extraction via `lopdf`.
///
/// The page content stream is walked operator by operator so that every
/// line move starts a new line and a same-line move to the right opens a
/// new cell. Lines whose cells are separated by tabs or runs of two or more
/// spaces are then re-emitted as pipe-delimited rows.
pub struct TableBackend;

impl PdfBackend for TableBackend {
    fn name(&self) -> &'static str {
        "lopdf-table"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err("document has no pages".to_string());
        }

        let mut out = Vec::with_capacity(pages.len());
        for (page_no, page_id) in pages {
            let text = page_text(&doc, page_id).map_err(|e| format!("page {}: {}", page_no, e))?;
            out.push(format_table_rows(&text));
        }
        Ok(out)
    }
}

/// Text of one page with line structure kept.
fn page_text(doc: &lopdf::Document, page_id: lopdf::ObjectId) -> lopdf::Result<String> {
    let encodings: BTreeMap<Vec<u8>, Encoding> = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .filter_map(|(name, font)| font.get_font_encoding(doc).ok().map(|enc| (name, enc)))
        .collect();
    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut text = String::new();
    let mut encoding: Option<&Encoding> = None;
    for op in &content.operations {
        match op.operator.as_str() {
            "Tf" => {
                encoding = op
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name));
            }
            "Td" | "TD" => {
                let dx = op.operands.first().and_then(|o| o.as_float().ok()).unwrap_or(0.0);
                let dy = op.operands.get(1).and_then(|o| o.as_float().ok()).unwrap_or(0.0);
                if dy == 0.0 && dx > 0.0 {
                    open_cell(&mut text);
                } else {
                    break_line(&mut text);
                }
            }
            "T*" | "Tm" | "ET" => break_line(&mut text),
            "'" | "\"" => {
                break_line(&mut text);
                if let Some(enc) = encoding {
                    show_text(&mut text, enc, op.operands.last())?;
                }
            }
            "Tj" | "TJ" => {
                if let Some(enc) = encoding {
                    show_text(&mut text, enc, op.operands.first())?;
                }
            }
            _ => {}
        }
    }
    Ok(text.trim_end().to_string())
}

fn break_line(text: &mut String) {
    let kept = text.trim_end_matches(' ').len();
    text.truncate(kept);
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

fn open_cell(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') && !text.ends_with("  ") {
        text.push_str("  ");
    }
}

/// Append a `Tj` string or `TJ` array. Large negative kerning inside an
/// array reads as a word gap.
fn show_text(text: &mut String, encoding: &Encoding, operand: Option<&Object>) -> lopdf::Result<()> {
    match operand {
        Some(Object::String(bytes, _)) => {
            text.push_str(&lopdf::Document::decode_text(encoding, bytes)?);
        }
        Some(Object::Array(items)) => {
            for item in items {
                match item {
                    Object::String(..) => show_text(text, encoding, Some(item))?,
                    other => {
                        if other.as_float().is_ok_and(|k| k < -100.0) && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Layout-aware extraction rendering each page as Markdown.
#[cfg(feature = "layout-markdown")]
pub struct LayoutBackend;

#[cfg(feature = "layout-markdown")]
impl PdfBackend for LayoutBackend {
    fn name(&self) -> &'static str {
        "pdf-markdown"
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, String> {
        Ok(pdf_extract_pages(bytes)?
            .iter()
            .map(|page| to_markdown(page))
            .collect())
    }
}

fn pdf_extract_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    // pdf-extract panics on some malformed files instead of returning an error.
    match panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("parser panicked on malformed input".to_string()),
    }
}

/// Split a line into cells on tabs or runs of two or more spaces.
fn split_cells(line: &str) -> Vec<&str> {
    line.split('\t')
        .flat_map(|part| part.split("  "))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Re-render tabular lines as `a | b | c`; other lines are kept as-is
/// (trailing whitespace removed).
pub fn format_table_rows(text: &str) -> String {
    text.lines()
        .map(|line| {
            let cells = split_cells(line);
            if cells.len() >= 2 {
                cells.join(" | ")
            } else {
                line.trim_end().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const BULLETS: [char; 8] = ['•', '●', '▪', '◦', '·', '-', '*', '–'];

fn as_list_item(line: &str) -> Option<String> {
    let first = line.chars().next()?;
    if BULLETS.contains(&first) {
        let after = &line[first.len_utf8()..];
        // ASCII markers need a following space so "-40 C" stays text.
        if first.is_ascii() && !after.starts_with(' ') {
            return None;
        }
        let body = after.trim_start();
        return (!body.is_empty()).then(|| format!("- {}", body));
    }

    // "1." / "12)" numbered items
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=3).contains(&digits) {
        let rest = &line[digits..];
        let body = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
        if body.starts_with(' ') && !body.trim().is_empty() {
            return Some(format!("{}. {}", &line[..digits], body.trim_start()));
        }
    }
    None
}

fn is_heading(line: &str) -> bool {
    if line.chars().count() > 60 || line.ends_with('.') {
        return false;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let cased: Vec<&char> = letters
        .iter()
        .filter(|c| c.is_uppercase() || c.is_lowercase())
        .collect();
    let all_caps = cased.len() >= 3 && cased.iter().all(|c| c.is_uppercase());
    let label = line.ends_with(':') && line.split_whitespace().count() <= 6;
    all_caps || label
}

fn flush_table(rows: &mut Vec<Vec<String>>, out: &mut Vec<String>) {
    if rows.is_empty() {
        return;
    }
    if rows.len() == 1 {
        out.push(rows[0].join(" | "));
        rows.clear();
        return;
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        out.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            out.push(format!("|{}", " --- |".repeat(width)));
        }
    }
    rows.clear();
}

/// Render extracted page text as Markdown.
///
/// Headings become `## ` lines, bullet glyphs and numbered items become
/// list items, and consecutive tabular lines become a Markdown table whose
/// first row is the header. Runs of blank lines collapse to one.
pub fn to_markdown(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut table: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_table(&mut table, &mut out);
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        let cells = split_cells(line);
        if cells.len() >= 2 {
            table.push(cells.into_iter().map(str::to_string).collect());
            continue;
        }
        flush_table(&mut table, &mut out);

        if let Some(item) = as_list_item(trimmed) {
            out.push(item);
        } else if is_heading(trimmed) {
            out.push(format!("## {}", trimmed));
        } else {
            out.push(trimmed.to_string());
        }
    }
    flush_table(&mut table, &mut out);

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

//! Shared fixtures for integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use ship_rag::embedding::EmbeddingProvider;

/// Minimal valid PDF with one page per entry of `pages`. Lines within a
/// page are separated by `\n` and each is placed with `T*`.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let streams = pages
        .iter()
        .map(|text| {
            let lines = text
                .lines()
                .map(|line| format!("({}) Tj", escape(line)))
                .collect::<Vec<_>>()
                .join(" T* ");
            format!("BT /F1 12 Tf 14 TL 72 720 Td {} ET", lines)
        })
        .collect::<Vec<_>>();
    pdf_with_streams(&streams)
}

/// Minimal valid PDF with one page per raw content stream. Font `/F1` is
/// Helvetica. Body then xref with correct byte offsets so both pdf-extract
/// and lopdf can parse it.
pub fn pdf_with_streams<S: AsRef<str>>(streams: &[S]) -> Vec<u8> {
    let page_count = streams.len();
    let mut objects: Vec<String> = Vec::new();

    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids, page_count
    ));
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    for (i, stream) in streams.iter().enumerate() {
        let stream = stream.as_ref();
        let content_id = 5 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            content_id
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

fn escape(line: &str) -> String {
    line.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of `DIMS` buckets.
pub struct HashingEmbedder;

const DIMS: usize = 256;

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing-test"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_words(t)).collect())
    }
}

fn hash_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| !w.is_empty())
    {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}


//! Plain-text extraction for the accepted upload formats.
//!
//! txt/md are read as UTF-8, pdf goes through pdf-extract, docx is
//! unzipped and its main document part stripped of markup.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "md", "pdf", "docx"];

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("txt")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => extract_pdf(path),
        "docx" => extract_docx(path),
        _ => fs::read_to_string(path)
            .with_context(|| format!("failed to read text file: {}", path.display())),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read pdf: {}", path.display()))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("failed to extract pdf text: {}", path.display()))?;

    let cleaned = text
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if cleaned.is_empty() {
        bail!("pdf contains no extractable text: {}", path.display());
    }

    Ok(cleaned)
}

fn extract_docx(path: &Path) -> Result<String> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open docx: {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("docx is not a valid archive: {}", path.display()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("docx missing word/document.xml")?
        .read_to_string(&mut xml)
        .context("docx document part is not valid UTF-8")?;

    let text = strip_docx_markup(&xml);
    if text.trim().is_empty() {
        bail!("docx contains no extractable text: {}", path.display());
    }

    Ok(text)
}

/// Drop XML tags, turning paragraph ends into newlines and decoding the
/// five predefined entities.
fn strip_docx_markup(xml: &str) -> String {
    let mut result = String::new();
    let mut chars = xml.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let mut tag = String::new();
            for t in chars.by_ref() {
                if t == '>' {
                    break;
                }
                tag.push(t);
            }
            if tag == "/w:p" || tag.starts_with("w:br") {
                result.push('\n');
            }
        } else {
            result.push(c);
        }
    }

    let decoded = result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");

    decoded
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

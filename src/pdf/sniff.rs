//! File type detection from magic bytes
//!
//! Drive's declared content types are not trusted (warning pages have been
//! seen labelled as the requested file), so classification only ever looks
//! at the content.

use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Leading bytes searched for an HTML signature, on the wire and on disk
pub const DEFAULT_SNIFF_WINDOW: usize = 1024;

/// Detected content type of a downloaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Png,
    Jpeg,
    Unrecognized,
}

impl FileKind {
    /// Classify raw bytes by their signature
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(PDF_MAGIC) {
            FileKind::Pdf
        } else if bytes.starts_with(PNG_MAGIC) {
            FileKind::Png
        } else if bytes.starts_with(JPEG_MAGIC) {
            FileKind::Jpeg
        } else {
            FileKind::Unrecognized
        }
    }
}

/// Whether the bytes carry an HTML document signature
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let lower = bytes.to_ascii_lowercase();
    contains(&lower, b"<!doctype") || contains(&lower, b"<html")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify a downloaded file, rejecting anything that is not PDF, PNG or JPEG.
///
/// An HTML page here means the fetch never got past Drive's interstitials,
/// which is reported separately from a genuinely unsupported file. Pass the
/// same `sniff_window` the fetcher used so both agree on what is HTML.
pub fn classify_file(path: &Path, sniff_window: usize) -> Result<FileKind> {
    let mut header = Vec::with_capacity(sniff_window);
    std::fs::File::open(path)?
        .take(sniff_window as u64)
        .read_to_end(&mut header)?;

    match FileKind::detect(&header) {
        FileKind::Unrecognized if looks_like_html(&header) => Err(Error::UnexpectedHtmlContent {
            path: path.display().to_string(),
        }),
        FileKind::Unrecognized => Err(Error::UnsupportedFileType {
            header: hex_prefix(&header),
        }),
        kind => Ok(kind),
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

//! PDF concatenation via qpdf (vendored FFI)
//!
//! Inputs are always opened with the empty password. Bank statements are
//! often encrypted with an owner password only, and qpdf decrypts those
//! transparently; documents behind a real user password fail to open.

use crate::error::{Error, Result};
use qpdf::QPdf;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Result of a file merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOutput {
    pub path: PathBuf,
    pub page_count: u32,
}

/// Open one input document, decrypting it with the empty password if needed
fn open_input(index: usize, data: &[u8]) -> Result<QPdf> {
    let source = QPdf::read_from_memory_encrypted(data, "").map_err(|e| match e.error_code() {
        qpdf::QPdfErrorCode::InvalidPassword => Error::DecryptionFailed {
            index,
            reason: e.to_string(),
        },
        _ => Error::CorruptDocument {
            index,
            reason: e.to_string(),
        },
    })?;

    if source.is_encrypted() {
        debug!(index, "Input PDF is encrypted, opened with empty password");
    }
    Ok(source)
}

fn merge_error(e: qpdf::QPdfError) -> Error {
    Error::MergeFailed {
        reason: e.to_string(),
    }
}

/// Concatenate PDFs in order, returning the merged document and its page count
fn merge_with_count(inputs: &[&[u8]]) -> Result<(Vec<u8>, u32)> {
    if inputs.is_empty() {
        return Err(Error::NoInputDocuments);
    }

    let dest = QPdf::empty();
    // Copied pages reference their source's stream data until the writer runs
    let mut sources = Vec::with_capacity(inputs.len());

    for (index, data) in inputs.iter().enumerate() {
        let source = open_input(index, data)?;
        let pages = source.get_pages().map_err(|e| Error::CorruptDocument {
            index,
            reason: e.to_string(),
        })?;
        debug!(index, pages = pages.len(), "Appending input PDF");

        for page in &pages {
            let copied = dest.copy_from_foreign(page);
            dest.add_page(&copied, false).map_err(merge_error)?;
        }
        sources.push(source);
    }

    let page_count = dest.get_num_pages().map_err(merge_error)?;

    let mut writer = dest.writer();
    writer.preserve_encryption(false);
    let output = writer.write_to_memory().map_err(merge_error)?;

    drop(sources);
    Ok((output, page_count))
}

/// Merge PDF documents held in memory
pub fn merge_pdf_bytes(inputs: &[&[u8]]) -> Result<Vec<u8>> {
    merge_with_count(inputs).map(|(output, _)| output)
}

/// Merge PDF files in order into `destination`.
///
/// Nothing is written unless every input opens: the result is staged in a
/// temporary file beside `destination` and renamed into place.
pub fn merge_pdf_files<P: AsRef<Path>>(inputs: &[P], destination: &Path) -> Result<MergedOutput> {
    info!(count = inputs.len(), "Combining PDF files");

    let data = inputs
        .iter()
        .map(|path| std::fs::read(path.as_ref()))
        .collect::<std::io::Result<Vec<_>>>()?;
    let refs: Vec<&[u8]> = data.iter().map(|d| d.as_slice()).collect();

    let (output, page_count) = merge_with_count(&refs)?;

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(&output)?;
    staged.flush()?;
    staged
        .persist(destination)
        .map_err(|e| Error::Io(e.error))?;

    info!(path = %destination.display(), page_count, "Combined PDF saved");
    Ok(MergedOutput {
        path: destination.to_path_buf(),
        page_count,
    })
}

/// Number of pages in a PDF, opening encrypted documents with the empty password
pub fn page_count(data: &[u8]) -> Result<u32> {
    let qpdf = open_input(0, data)?;
    qpdf.get_num_pages().map_err(|e| Error::CorruptDocument {
        index: 0,
        reason: e.to_string(),
    })
}

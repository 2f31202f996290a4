//! Share links in, one combined PDF out
//!
//! Each link goes through resolve → fetch → classify → (convert), strictly in
//! order, then all resulting PDFs are merged. Working files land in the
//! caller's directory and are left there for the caller to clean up.

use crate::config::CombinerConfig;
use crate::error::{Error, Result};
use crate::pdf::{classify_file, image_to_pdf, merge_pdf_files, FileKind, MergedOutput};
use crate::source::{resolve_link, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Run CPU-bound PDF/image work off the async runtime
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task {
            reason: e.to_string(),
        })?
}

/// Normalize a requested output name into a bare `*.pdf` file name.
///
/// Directory components, quotes and control characters are dropped; an empty
/// result falls back to `default`.
pub fn output_filename(requested: Option<&str>, default: &str) -> String {
    let requested = requested.unwrap_or_default().trim();
    let base = requested
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();

    let name = if cleaned.is_empty() { default } else { cleaned };
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{}.pdf", name)
    }
}

/// The fetch-and-merge pipeline
#[derive(Debug, Clone)]
pub struct Combiner {
    config: Arc<CombinerConfig>,
    fetcher: Fetcher,
}

impl Combiner {
    pub fn new(config: CombinerConfig) -> Self {
        Self {
            fetcher: Fetcher::new(config.clone()),
            config: Arc::new(config),
        }
    }

    /// Download one share link into `work_dir` and return the path of a PDF for it.
    ///
    /// Images are converted; the downloaded image is replaced by its PDF.
    pub async fn prepare(&self, link: &str, work_dir: &Path) -> Result<PathBuf> {
        let resolved = resolve_link(link, &self.config.drive_base_url)?;
        info!(file_id = %resolved.file_id, "Fetching file");

        let fetched = self.fetcher.fetch(&resolved.file_id, work_dir).await?;
        let dpi = self.config.image_dpi;
        let sniff_window = self.config.sniff_window;

        run_blocking(move || {
            let path = fetched.path;
            match classify_file(&path, sniff_window)? {
                FileKind::Pdf => {
                    info!(path = %path.display(), "File is a PDF");
                    Ok(path)
                }
                kind @ (FileKind::Png | FileKind::Jpeg) => {
                    info!(path = %path.display(), ?kind, "File is an image");
                    image_to_pdf(&path, dpi)
                }
                // classify_file already rejects these
                FileKind::Unrecognized => Err(Error::UnsupportedFileType {
                    header: "unrecognized".to_string(),
                }),
            }
        })
        .await
    }

    /// Fetch every link in order and merge them into `destination`.
    ///
    /// Any failure aborts the whole request; `destination` is only created
    /// on success.
    pub async fn combine(
        &self,
        links: &[&str],
        work_dir: &Path,
        destination: &Path,
    ) -> Result<MergedOutput> {
        let mut pdfs = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            info!(file = i + 1, total = links.len(), "Processing file");
            pdfs.push(self.prepare(link, work_dir).await?);
        }

        let destination = destination.to_path_buf();
        run_blocking(move || merge_pdf_files(&pdfs, &destination)).await
    }
}

//! Error types for the Drive PDF combiner

use thiserror::Error;

/// Result type alias for the combiner
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the combiner pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Share link carries neither a `/file/d/<id>` segment nor an `id=` parameter
    #[error("Invalid Google Drive link format: {link}")]
    InvalidLinkFormat { link: String },

    /// Drive answered with a sign-in page
    #[error("File {file_id} requires authentication")]
    AuthenticationRequired { file_id: String },

    /// Drive kept serving an interstitial page instead of the file
    #[error("Drive returned an HTML page instead of the file: {path}")]
    UnexpectedHtmlContent { path: String },

    /// Downloaded bytes are neither PDF, PNG nor JPEG
    #[error("Unsupported file type (header: {header})")]
    UnsupportedFileType { header: String },

    /// Encrypted PDF that the empty password does not open
    #[error("Failed to decrypt input PDF {index}: {reason}")]
    DecryptionFailed { index: usize, reason: String },

    /// Input is not a readable PDF
    #[error("Failed to read input PDF {index}: {reason}")]
    CorruptDocument { index: usize, reason: String },

    /// Merge called without documents
    #[error("No input PDFs provided")]
    NoInputDocuments,

    /// qpdf failed while assembling or writing the merged document
    #[error("Failed to write merged PDF: {reason}")]
    MergeFailed { reason: String },

    /// Non-success HTTP status for a non-HTML response
    #[error("Download failed with status {status}: {url}")]
    FetchFailed { status: u16, url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Image could not be turned into a PDF page
    #[error("Image conversion failed: {reason}")]
    ImageConversion { reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode error
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// Blocking task panicked or was cancelled
    #[error("Task join error: {reason}")]
    Task { reason: String },
}

impl Error {
    /// Return a message safe to send to HTTP clients.
    /// Local paths and library internals are omitted; log the full error first.
    pub fn client_message(&self) -> String {
        match self {
            Error::InvalidLinkFormat { link } => {
                format!("Invalid Google Drive link format: {}", link)
            }
            Error::AuthenticationRequired { .. } => "This file requires authentication. \
                Please make the file publicly accessible: share it with \
                'Anyone with the link' can view, then copy the new link and try again"
                .to_string(),
            Error::UnexpectedHtmlContent { .. } => "Google Drive returned an HTML page \
                instead of the file. The file may be too large or require permission"
                .to_string(),
            Error::UnsupportedFileType { header } => {
                format!("Unsupported file type. File header: {}", header)
            }
            Error::DecryptionFailed { index, .. } => {
                format!("Input PDF {} is password protected", index + 1)
            }
            Error::CorruptDocument { index, .. } => {
                format!("Input PDF {} could not be read", index + 1)
            }
            Error::NoInputDocuments => "No input PDFs provided".to_string(),
            Error::MergeFailed { .. } => "Failed to combine PDFs".to_string(),
            Error::FetchFailed { status, .. } => {
                format!("Download failed with status {}", status)
            }
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
            Error::ImageConversion { .. } | Error::Image(_) => {
                "Failed to convert image to PDF".to_string()
            }
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Task { .. } => "Internal error".to_string(),
        }
    }
}

//! PDF processing layer
//!
//! Type sniffing, image conversion (PDFium) and merging (qpdf).

mod convert;
mod merge;
mod sniff;

pub use convert::{create_pdfium, flatten_to_rgb, image_bytes_to_pdf, image_to_pdf, page_size_points};
pub use merge::{merge_pdf_bytes, merge_pdf_files, page_count, MergedOutput};
pub use sniff::{classify_file, looks_like_html, FileKind, DEFAULT_SNIFF_WINDOW};

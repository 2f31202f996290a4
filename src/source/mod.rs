//! Share link resolution and Drive downloads

pub mod fetcher;
pub mod link;

pub use fetcher::{extract_download_url, FetchedFile, Fetcher};
pub use link::{download_url, extract_file_id, resolve_link, ResolvedLink};

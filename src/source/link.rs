//! Share link resolution

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static FILE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("valid regex"));

static QUERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").expect("valid regex"));

/// A share link reduced to its file identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub file_id: String,
    pub download_url: String,
}

/// Extract the Drive file ID from a share link.
///
/// Accepts `.../file/d/<ID>/...` and `...?id=<ID>` / `...&id=<ID>`. The path
/// form wins when both are present.
pub fn extract_file_id(link: &str) -> Result<String> {
    let link = link.trim();

    FILE_PATH_ID
        .captures(link)
        .or_else(|| QUERY_ID.captures(link))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidLinkFormat {
            link: link.to_string(),
        })
}

/// Direct download URL for a file ID on the given Drive base URL
pub fn download_url(base_url: &str, file_id: &str) -> String {
    format!(
        "{}/uc?export=download&id={}",
        base_url.trim_end_matches('/'),
        file_id
    )
}

/// Resolve a share link into its file ID and direct download URL
pub fn resolve_link(link: &str, base_url: &str) -> Result<ResolvedLink> {
    let file_id = extract_file_id(link)?;
    let download_url = download_url(base_url, &file_id);
    Ok(ResolvedLink {
        file_id,
        download_url,
    })
}

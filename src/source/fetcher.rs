//! Download files from Drive, getting past its interstitial pages
//!
//! Drive does not always stream the file for a `uc?export=download` request.
//! Large files get a "can't scan for viruses" confirmation page, and private
//! files get a sign-in page. The fetcher walks a short, fixed chain of
//! strategies:
//!
//! 1. plain direct download URL
//! 2. the same URL with `confirm=t`
//! 3. a download URL scraped from the confirmation page markup, or the
//!    `uc?id=<ID>&export=download` variant when the page has none
//!
//! A sign-in page at any step aborts the fetch.

use crate::config::CombinerConfig;
use crate::error::{Error, Result};
use crate::pdf::looks_like_html;
use crate::source::link::download_url;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

static UC_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(/uc\?export=download[^"]+)""#).expect("valid regex"));

static UC_DOWNLOAD_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"id="uc-download-link"[^>]*href="([^"]+)""#).expect("valid regex")
});

static FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<form\b([^>]*)>(.*?)</form>"#).expect("valid regex"));

static INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<input\b([^>]*)>"#).expect("valid regex"));

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z_:-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));

/// A downloaded file waiting to be classified
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: PathBuf,
    /// Content-Type header of the final response, if any
    pub content_type: Option<String>,
    pub size: u64,
}

/// An open response with its first bytes already buffered
struct Probe {
    url: String,
    status: StatusCode,
    content_type: Option<String>,
    head: Vec<u8>,
    response: reqwest::Response,
}

impl Probe {
    fn is_html(&self, window: usize) -> bool {
        let head = &self.head[..self.head.len().min(window)];
        looks_like_html(head)
            || self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
    }
}

/// Drive downloader
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: CombinerConfig,
}

impl Fetcher {
    pub fn new(config: CombinerConfig) -> Self {
        Self { config }
    }

    fn base_url(&self) -> &str {
        self.config.drive_base_url.trim_end_matches('/')
    }

    /// One cookie-carrying session per fetch; nothing is shared across fetches.
    fn session(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(self.config.user_agent.as_str())
            .build()
            .map_err(Error::HttpRequest)
    }

    /// Download `file_id` into `work_dir`.
    ///
    /// Creates exactly one file per successful call; the caller owns it.
    pub async fn fetch(&self, file_id: &str, work_dir: &Path) -> Result<FetchedFile> {
        let client = self.session()?;
        let window = self.config.sniff_window;
        let base = self.base_url().to_string();

        let mut probe = self.open(&client, &download_url(&base, file_id)).await?;

        if probe.is_html(window) {
            self.inspect_page(&mut probe, file_id).await?;
            info!(file_id, "Received HTML instead of file, retrying with confirmation");

            let confirm_url = format!("{}/uc?export=download&confirm=t&id={}", base, file_id);
            probe = self.open(&client, &confirm_url).await?;

            if probe.is_html(window) {
                let page = self.inspect_page(&mut probe, file_id).await?;
                let next_url = match extract_download_url(&page, &base) {
                    Some(url) => {
                        info!(file_id, url = %url, "Following download link from confirmation page");
                        url
                    }
                    None => {
                        info!(file_id, "No download link on confirmation page, trying alternate endpoint");
                        format!("{}/uc?id={}&export=download", base, file_id)
                    }
                };
                probe = self.open(&client, &next_url).await?;
            }
        }

        if probe.is_html(window) {
            // Still HTML: keep it on disk for the sniffer, unless it is a sign-in wall
            self.inspect_page(&mut probe, file_id).await?;
        } else if !probe.status.is_success() {
            return Err(Error::FetchFailed {
                status: probe.status.as_u16(),
                url: probe.url,
            });
        }

        self.persist(probe, work_dir).await
    }

    /// Send a GET and buffer at least `sniff_window` bytes (or the whole body if shorter)
    async fn open(&self, client: &reqwest::Client, url: &str) -> Result<Probe> {
        debug!(url, "GET");
        let response = client.get(url).send().await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if let Some(content_length) = response.content_length() {
            if content_length > self.config.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: content_length,
                    max_size: self.config.max_download_bytes,
                });
            }
        }

        let mut probe = Probe {
            url: url.to_string(),
            status,
            content_type,
            head: Vec::new(),
            response,
        };

        while probe.head.len() <= self.config.sniff_window {
            match probe.response.chunk().await? {
                Some(chunk) => probe.head.extend_from_slice(&chunk),
                None => break,
            }
        }

        Ok(probe)
    }

    /// Drain an HTML response into memory and reject sign-in pages
    async fn inspect_page(&self, probe: &mut Probe, file_id: &str) -> Result<String> {
        while let Some(chunk) = probe.response.chunk().await? {
            probe.head.extend_from_slice(&chunk);
            self.check_size(probe.head.len() as u64)?;
        }

        let page = String::from_utf8_lossy(&probe.head).into_owned();
        let window = probe.head.len().min(self.config.sniff_window);
        if looks_like_html(&probe.head[..window]) && is_sign_in_page(&page) {
            return Err(Error::AuthenticationRequired {
                file_id: file_id.to_string(),
            });
        }
        Ok(page)
    }

    async fn persist(&self, probe: Probe, work_dir: &Path) -> Result<FetchedFile> {
        let extension = extension_for(probe.content_type.as_deref());
        let path = work_dir.join(format!("{}{}", uuid::Uuid::new_v4(), extension));
        let content_type = probe.content_type.clone();

        match self.write_body(probe, &path).await {
            Ok(size) => {
                info!(path = %path.display(), size, "File downloaded");
                Ok(FetchedFile {
                    path,
                    content_type,
                    size,
                })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn write_body(&self, mut probe: Probe, path: &Path) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = probe.head.len() as u64;
        self.check_size(written)?;
        file.write_all(&probe.head).await?;

        while let Some(chunk) = probe.response.chunk().await? {
            written += chunk.len() as u64;
            self.check_size(written)?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.config.max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size,
                max_size: self.config.max_download_bytes,
            });
        }
        Ok(())
    }
}

/// Whether an HTML page asks the visitor to sign in
pub fn is_sign_in_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("sign in") || lower.contains("signin")
}

/// Cosmetic file extension from a declared content type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    if content_type.contains("pdf") {
        ".pdf"
    } else if content_type.contains("png") {
        ".png"
    } else if content_type.contains("jpeg") || content_type.contains("jpg") {
        ".jpg"
    } else {
        ".tmp"
    }
}

/// Find the real download URL inside a Drive confirmation page.
///
/// Tried in order: a `/uc?export=download` href, the `uc-download-link`
/// anchor, then the `download-form` form with its hidden fields.
pub fn extract_download_url(html: &str, base_url: &str) -> Option<String> {
    let href = UC_HREF
        .captures(html)
        .or_else(|| UC_DOWNLOAD_LINK.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()));

    if let Some(href) = href {
        return absolutize(base_url, &href);
    }

    download_form_url(html, base_url)
}

fn download_form_url(html: &str, base_url: &str) -> Option<String> {
    let form = FORM
        .captures_iter(html)
        .find(|caps| attribute(&caps[1], "id").as_deref() == Some("download-form"))?;

    let action = attribute(&form[1], "action")?;
    let mut url = url::Url::parse(&absolutize(base_url, &action)?).ok()?;

    {
        let mut query = url.query_pairs_mut();
        for input in INPUT.captures_iter(&form[2]) {
            let attrs = &input[1];
            if attribute(attrs, "type").as_deref() != Some("hidden") {
                continue;
            }
            if let Some(name) = attribute(attrs, "name") {
                let value = attribute(attrs, "value").unwrap_or_default();
                query.append_pair(&name, &value);
            }
        }
    }

    Some(url.to_string())
}

fn attribute(tag_attrs: &str, name: &str) -> Option<String> {
    ATTRIBUTE
        .captures_iter(tag_attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .map(|caps| decode_entities(&caps[2]))
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn absolutize(base_url: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(&format!("{}/", base_url.trim_end_matches('/'))).ok()?;
    base.join(href).ok().map(String::from)
}

//! Runtime configuration
//!
//! Everything the pipeline needs is carried in [`CombinerConfig`] and handed
//! to [`crate::Combiner::new`]; nothing is read from process-wide state after
//! construction.

use crate::pdf::DEFAULT_SNIFF_WINDOW;
use std::env;

/// Default Drive endpoint all download URLs are built on
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://drive.google.com";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct CombinerConfig {
    /// Base URL of the storage service (overridable for tests and proxies)
    pub drive_base_url: String,
    /// Resolution used to size image pages (pixels per inch)
    pub image_dpi: f32,
    /// Number of leading response bytes inspected for an HTML signature
    pub sniff_window: usize,
    /// Maximum download size in bytes (default: 100MB)
    pub max_download_bytes: u64,
    /// User-Agent header sent to the storage service
    pub user_agent: String,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            drive_base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            image_dpi: 100.0,
            sniff_window: DEFAULT_SNIFF_WINDOW,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

impl CombinerConfig {
    /// Defaults overlaid with `DRIVE_BASE_URL`, `IMAGE_DPI` and `MAX_DOWNLOAD_BYTES`.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            drive_base_url: env::var("DRIVE_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.drive_base_url),
            image_dpi: env::var("IMAGE_DPI")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|dpi: &f32| *dpi > 0.0)
                .unwrap_or(defaults.image_dpi),
            max_download_bytes: env::var("MAX_DOWNLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_download_bytes),
            ..defaults
        }
    }
}

/// HTTP service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub combiner: CombinerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            combiner: CombinerConfig::default(),
        }
    }
}

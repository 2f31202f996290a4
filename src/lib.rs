//! Drive PDF combiner library
//!
//! Fetches receipt files from Google Drive share links and combines them
//! into a single PDF:
//! - `source`: share link resolution and downloads past Drive's interstitial pages
//! - `pdf`: magic-byte sniffing, image to PDF conversion, merging
//! - `pipeline`: the end-to-end [`Combiner`]
//! - `server`: the `POST /combine` HTTP service

pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod server;
pub mod source;

pub use config::{CombinerConfig, ServiceConfig};
pub use error::{Error, Result};
pub use pipeline::{output_filename, Combiner};
pub use server::{router, run_server, CombineRequest};

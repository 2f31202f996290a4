//! Drive PDF combiner - Entry point
//!
//! `combine` merges two share links into a local PDF; `serve` runs the HTTP
//! service used by the browser extension.

use anyhow::Context;
use clap::{Parser, Subcommand};
use drive_pdf_combiner::{output_filename, run_server, Combiner, CombinerConfig, ServiceConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "drive-pdf-combiner", version, about = "Combine two Google Drive files (PDF, PNG or JPEG) into one PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download two share links and merge them into one PDF
    Combine {
        /// First Google Drive link (PDF, PNG or JPEG)
        link1: String,
        /// Second Google Drive link (PDF, PNG or JPEG)
        link2: String,
        /// Output file name (".pdf" is appended if missing)
        #[arg(short, long, default_value = "combined_output.pdf")]
        output: String,
        /// Directory the combined PDF is written to
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,
        /// Parent directory for the per-run working directory
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },
    /// Run the HTTP service
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value_t = 8765)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drive_pdf_combiner=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let combiner_config = CombinerConfig::from_env();

    match cli.command {
        Command::Combine {
            link1,
            link2,
            output,
            output_dir,
            temp_dir,
        } => combine(combiner_config, &link1, &link2, &output, output_dir, temp_dir).await,
        Command::Serve { host, port } => {
            tracing::info!("Starting Drive PDF combiner service");
            run_server(ServiceConfig {
                host,
                port,
                combiner: combiner_config,
            })
            .await
        }
    }
}

async fn combine(
    config: CombinerConfig,
    link1: &str,
    link2: &str,
    output: &str,
    output_dir: PathBuf,
    temp_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    let destination = output_dir.join(output_filename(Some(output), "combined_output.pdf"));

    let mut builder = tempfile::Builder::new();
    builder.prefix("feb_combine_");
    let work_dir = match temp_dir {
        Some(parent) => {
            std::fs::create_dir_all(&parent)
                .with_context(|| format!("creating temp directory {}", parent.display()))?;
            builder.tempdir_in(parent)?
        }
        None => builder.tempdir()?,
    };
    tracing::info!(work_dir = %work_dir.path().display(), "Using working directory");

    let combiner = Combiner::new(config);
    let merged = combiner
        .combine(&[link1, link2], work_dir.path(), &destination)
        .await
        .context("combining files")?;

    println!(
        "Combined PDF saved as: {} ({} pages)",
        merged.path.display(),
        merged.page_count
    );
    Ok(())
}

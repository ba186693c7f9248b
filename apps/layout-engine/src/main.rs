use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use layout_engine::config::Config;
use layout_engine::errors::LayoutError;
use layout_engine::layout::{CompressionController, GenerationRequest, PageSize};
use layout_engine::models::{JobKeywordSet, ResumeDocument};

#[derive(Parser, Debug)]
#[command(name = "layout-engine")]
#[command(version)]
#[command(about = "Render a resume to PDF within a page budget")]
struct Cli {
    /// Request JSON: { "document": {...}, "keywords": [...] }
    input: PathBuf,

    /// Where to write the PDF
    #[arg(short, long)]
    output: PathBuf,

    /// Page budget (overrides LAYOUT_MAX_PAGES)
    #[arg(long)]
    max_pages: Option<usize>,

    /// letter or a4 (overrides LAYOUT_PAGE_SIZE)
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Extra job keyword; repeatable
    #[arg(short = 'k', long = "keyword")]
    keywords: Vec<String>,

    /// Print the outcome (attempt trace, final style, warning) as JSON
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Deserialize)]
struct InputFile {
    document: ResumeDocument,
    #[serde(default)]
    keywords: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("layout_engine={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let input: InputFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid generation request", cli.input.display()))?;

    let keywords = JobKeywordSet::new(input.keywords.iter().chain(cli.keywords.iter()));
    let request = GenerationRequest {
        document: input.document.clone(),
        keywords,
        max_pages: cli.max_pages.unwrap_or(config.max_pages),
        page_size: cli.page_size.unwrap_or(config.page_size),
    };
    info!(
        max_pages = request.max_pages,
        page_size = %request.page_size,
        keywords = request.keywords.len(),
        "Generating layout"
    );

    let controller = CompressionController::new(config.compression());
    match controller.generate(request).await {
        Ok(outcome) => {
            write_atomic(&cli.output, &outcome.bytes)?;
            info!(
                path = %cli.output.display(),
                pages = outcome.page_count,
                attempts = outcome.attempts.len(),
                budget_met = outcome.budget_met,
                "PDF written"
            );
            if cli.report {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            Ok(())
        }
        Err(e) if e.is_render_failure() => {
            write_fallback(&cli.output, &input.document, &e, cli.report)
        }
        Err(e) => Err(anyhow!("[{}] {e}", e.code())),
    }
}

/// Writes `<output>.txt` after a render failure. Always returns an error so the
/// process exits non-zero.
fn write_fallback(
    output: &Path,
    document: &ResumeDocument,
    error: &LayoutError,
    report: bool,
) -> Result<()> {
    let fallback = output.with_extension("txt");
    write_atomic(&fallback, document.to_plain_text().as_bytes())?;
    warn!(
        error = %error,
        path = %fallback.display(),
        "PDF rendering failed; wrote plain-text fallback"
    );
    if report {
        let report = serde_json::json!({
            "ok": false,
            "code": error.code(),
            "error": error.to_string(),
            "fallback": fallback.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Err(anyhow!(
        "[{}] {error}; plain-text fallback written to {}",
        error.code(),
        fallback.display()
    ))
}

/// Writes through a temp file in the destination directory, then renames it
/// into place, so readers never see a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    Ok(())
}

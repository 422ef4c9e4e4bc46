//! CLI binary for edgequake-pageloader.
//!
//! A thin shim over the library: maps flags to `EngineConfig`,
//! `VisionOptions` and `LoaderOptions`, runs the loader, and writes one
//! Markdown file (or JSON line) per page.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pageloader::{
    DocumentLoader, EngineConfig, LoadProgressCallback, LoaderError, LoaderOptions, OcrBackend,
    OutputDocument, PageLoader, PageSplitter, PdfiumBackend, ProgressCallback, SourceDocument,
    VisionEngine, VisionOptions,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
///
/// Pages arrive strictly in order, so only the current page's start time is
/// tracked.
struct CliProgressCallback {
    bar: ProgressBar,
    current: Mutex<Option<(usize, Instant)>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page: usize) -> f64 {
        match self.current.lock() {
            Ok(mut slot) => match slot.take() {
                Some((p, t)) if p == page => t.elapsed().as_secs_f64(),
                _ => 0.0,
            },
            Err(_) => 0.0,
        }
    }
}

impl LoadProgressCallback for CliProgressCallback {
    fn on_load_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Loading");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page: usize, _total_pages: usize) {
        if let Ok(mut slot) = self.current.lock() {
            *slot = Some((page, Instant::now()));
        }
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_complete(&self, page: usize, total_pages: usize, content_len: usize) {
        let secs = self.elapsed_secs(page);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page,
            total_pages,
            dim(&format!("{content_len:>5} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page: usize, total_pages: usize, error: String) {
        let secs = self.elapsed_secs(page);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error,
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page,
            total_pages,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_load_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if self.errors.load(Ordering::SeqCst) == 0 && success_count == total_pages {
            eprintln!(
                "{} {} pages loaded",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} stopped after {}/{} pages",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print every page as Markdown (streamed)
  pdfpages report.pdf

  # One file per page: out/page-0001.md, out/page-0002.md, …
  pdfpages report.pdf --output-dir out/

  # JSON Lines, one OutputDocument per line
  pdfpages report.pdf --jsonl > pages.jsonl

  # Born-digital PDF: read text layers only, no API key needed
  pdfpages --no-ocr report.pdf

  # OCR only pages without a usable text layer, with a local model
  pdfpages --no-force-ocr --backend ollama --model llava scan.pdf

  # Page count only
  pdfpages --inspect-only report.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --backend is auto
  EDGEQUAKE_MODEL         Model used when --backend is auto
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
"#;

/// Load a PDF page by page as Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdfpages",
    version,
    about = "Load a PDF page by page as Markdown documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write one Markdown file per page into this directory.
    #[arg(short, long, env = "PDFPAGES_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Emit JSON Lines (one OutputDocument per line) on stdout.
    #[arg(long, conflicts_with = "output_dir")]
    jsonl: bool,

    /// Stream pages one at a time (default).
    #[arg(long, conflicts_with = "eager")]
    lazy: bool,

    /// Split every page up front and convert them as a batch.
    #[arg(long)]
    eager: bool,

    /// OCR backend: auto, openai, anthropic, gemini, mistral, ollama, lmstudio,
    /// or any other edgequake-llm provider name (requires --model).
    #[arg(long, env = "PDFPAGES_BACKEND", default_value = "auto")]
    backend: String,

    /// Vision model ID. Default depends on the backend.
    #[arg(long, env = "PDFPAGES_MODEL")]
    model: Option<String>,

    /// Disable OCR; use each page's embedded text layer.
    #[arg(long)]
    no_ocr: bool,

    /// OCR only pages whose text layer is missing or sparse.
    #[arg(long)]
    no_force_ocr: bool,

    /// Do not recognise table structure.
    #[arg(long)]
    no_tables: bool,

    /// Do not pad table rows to the header's cell count.
    #[arg(long)]
    no_cell_matching: bool,

    /// Do not recognise display formulas.
    #[arg(long)]
    no_formulas: bool,

    /// Do not recognise code blocks.
    #[arg(long)]
    no_code: bool,

    /// Hint the engine to avoid hardware acceleration.
    #[arg(long)]
    no_acceleration: bool,

    /// Engine batch-size hint.
    #[arg(long, default_value_t = 3)]
    batch_size: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFPAGES_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDFPAGES_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Transport retries per page on LLM failure.
    #[arg(long, env = "PDFPAGES_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-page LLM call timeout in seconds.
    #[arg(long, env = "PDFPAGES_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFPAGES_PASSWORD")]
    password: Option<String>,

    /// Directory for temporary page PDFs.
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Print the page count only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    ensure_pdfium(cli.quiet)?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn LoadProgressCallback>)
    } else {
        None
    };

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let source = inspect_source(&cli).await.context("Failed to open PDF")?;
        println!("File:   {}", source.path.display());
        println!("Pages:  {}", source.page_count);
        return Ok(());
    }

    let loader = build_loader(&cli, progress).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let mut sink = PageSink::new(&cli);
    if cli.eager && !cli.lazy {
        let pages = loader.load(&cli.input).await.context("Load failed")?;
        for page in &pages {
            sink.write(page).await?;
        }
    } else {
        let mut pages = loader
            .lazy_load(&cli.input)
            .await
            .context("Failed to open PDF")?;
        while let Some(page) = pages.next().await {
            let page = page.context("Load failed")?;
            sink.write(&page).await?;
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!("Loaded {} pages", sink.written);
    }
    Ok(())
}

/// Make sure the pdfium library is on disk, downloading it with a progress
/// bar on first run.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if cfg!(feature = "bundled") || pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to a loader over the built-in engine.
async fn build_loader(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<PageLoader<VisionEngine>> {
    let backend = parse_backend(&cli.backend, cli.model.as_deref())?;

    let config = EngineConfig::builder()
        .ocr_enabled(!cli.no_ocr)
        .force_full_page_ocr(!cli.no_ocr && !cli.no_force_ocr)
        .ocr_backend(backend)
        .use_acceleration(!cli.no_acceleration)
        .table_structure(!cli.no_tables)
        .cell_matching(!cli.no_cell_matching)
        .formula_enrichment(!cli.no_formulas)
        .code_enrichment(!cli.no_code)
        .batch_size(cli.batch_size)
        .build()
        .context("Invalid engine configuration")?;

    let mut vision = VisionOptions::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref model) = cli.model {
        vision = vision.model(model.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        vision = vision.system_prompt(prompt);
    }
    let vision = vision.build().context("Invalid vision options")?;

    let mut options = LoaderOptions::default();
    if let Some(ref dir) = cli.temp_dir {
        options = options.temp_dir(dir.clone());
    }
    if let Some(ref pwd) = cli.password {
        options = options.password(pwd.clone());
    }
    if let Some(cb) = progress {
        options = options.progress_callback(cb);
    }

    PageLoader::vision(config, vision, options).context("Failed to set up conversion engine")
}

/// Open the input for `--inspect-only`. Counting pages needs no engine.
async fn inspect_source(cli: &Cli) -> Result<SourceDocument, LoaderError> {
    let splitter = PageSplitter::new(
        Arc::new(PdfiumBackend::new()),
        cli.temp_dir.clone(),
        cli.password.clone(),
    );
    splitter.open(&cli.input).await
}

/// Parse `--backend` into an `OcrBackend`.
fn parse_backend(name: &str, model: Option<&str>) -> Result<OcrBackend> {
    Ok(match name.trim().to_lowercase().as_str() {
        "auto" => OcrBackend::Auto,
        "openai" => OcrBackend::OpenAi,
        "anthropic" => OcrBackend::Anthropic,
        "gemini" => OcrBackend::Gemini,
        "mistral" => OcrBackend::Mistral,
        "ollama" => OcrBackend::Ollama,
        "lmstudio" | "lm-studio" => OcrBackend::LmStudio,
        other => {
            let model = model
                .with_context(|| format!("--backend {other} requires --model"))?;
            OcrBackend::Custom {
                provider: other.to_string(),
                model: model.to_string(),
            }
        }
    })
}

/// Where pages go: a directory, JSON Lines on stdout, or Markdown on stdout.
struct PageSink {
    output_dir: Option<PathBuf>,
    jsonl: bool,
    written: usize,
}

impl PageSink {
    fn new(cli: &Cli) -> Self {
        Self {
            output_dir: cli.output_dir.clone(),
            jsonl: cli.jsonl,
            written: 0,
        }
    }

    async fn write(&mut self, page: &OutputDocument) -> Result<()> {
        if let Some(ref dir) = self.output_dir {
            write_page_file(page, dir).await?;
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            if self.jsonl {
                let line = serde_json::to_string(page).context("Failed to serialise page")?;
                writeln!(handle, "{line}").context("Failed to write to stdout")?;
            } else {
                if self.written > 0 {
                    writeln!(handle).context("Failed to write to stdout")?;
                }
                writeln!(handle, "<!-- page {} -->", page.metadata.page_label)
                    .and_then(|_| handle.write_all(page.content.as_bytes()))
                    .context("Failed to write to stdout")?;
            }
        }
        self.written += 1;
        Ok(())
    }
}

async fn write_page_file(page: &OutputDocument, dir: &Path) -> Result<()> {
    let path = page
        .write_to_dir(dir)
        .await
        .with_context(|| format!("Failed to write page {}", page.metadata.page))?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

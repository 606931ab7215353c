//! CLI binary for docmd-translate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the URL list, and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use docmd_translate::{
    convert_all, read_url_list, ConversionProgressCallback, EmptyOutputPolicy, PageError,
    PageReport, PipelineConfig, ProgressCallback, PromptSet, RunSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the URL list, one line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Passthrough chunks on the current page.
    chunks_degraded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:40.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Translating");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunks_degraded: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_urls: usize) {
        self.bar.set_length(total_urls as u64);
    }

    fn on_page_start(&self, _page_num: usize, _total: usize, url: &str) {
        self.chunks_degraded.store(0, Ordering::SeqCst);
        self.bar.set_message(url.to_string());
    }

    fn on_chunk_complete(&self, index: usize, total_chunks: usize, degraded: bool) {
        let failed = if degraded {
            self.chunks_degraded.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.chunks_degraded.load(Ordering::SeqCst)
        };
        let msg = format!("chunk {}/{}", index + 1, total_chunks);
        self.bar.set_message(if failed > 0 {
            format!("{msg} ({failed} passthrough)")
        } else {
            msg
        });
    }

    fn on_page_complete(&self, page_num: usize, total: usize, report: &PageReport) {
        let mark = if report.degraded_chunks > 0 || report.conversion_degraded.is_some() {
            yellow("⚠")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}",
            mark,
            page_num,
            total,
            report.url,
            dim(&format!(
                "{} chunk(s), {} passthrough, {:.1}s",
                report.chunk_count,
                report.degraded_chunks,
                report.duration_ms as f64 / 1000.0
            )),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_num: usize, total: usize, error: &PageError) {
        let msg = error.to_string();
        let msg = match msg.char_indices().nth(100) {
            Some((i, _)) => format!("{}\u{2026}", &msg[..i]),
            None => msg,
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}",
            red("✗"),
            page_num,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _total_urls: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate every URL in output/vault-urls.txt into markdown_output/
  docmd

  # Another URL list and output directory
  docmd --urls urls.txt -o docs_ja

  # Translate to French with a custom prompt
  docmd --lang fr --translate-prompt prompts/english_markdown_to_french.txt

  # Machine-readable summary
  docmd --json --no-progress > summary.json

OUTPUT LAYOUT:
  <out>/original/<host>/<path>.md   converted Markdown (before translation)
  <out>/<lang>/<host>/<path>.md     translated Markdown

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY                   API key (without it, content passes through untranslated)
  OPENROUTER_MODEL_NAME                Model id (default openai/gpt-3.5-turbo)
  HTML_TO_ENGLISH_PROMPT_FILE_PATH     HTML → Markdown prompt template
  ENGLISH_TO_JAPANESE_PROMPT_FILE_PATH Markdown translation prompt template
  DO_NOT_TRANSLATE_FILE_PATH           Newline-delimited term list
  RUST_LOG                             Overrides the stderr log filter
"#;

/// Scrape documentation pages, convert them to Markdown and translate them.
#[derive(Parser, Debug)]
#[command(
    name = "docmd",
    version,
    about = "Scrape documentation pages, convert them to Markdown and translate them",
    long_about = "Fetch each URL in a list, extract its main content, convert it to Markdown \
with a chat-completion model, then translate the Markdown chunk by chunk (split at headings). \
Failed remote calls pass the original content through instead of aborting.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Newline-delimited list of URLs to process.
    #[arg(long, env = "DOCMD_URLS", default_value = "output/vault-urls.txt")]
    urls: PathBuf,

    /// Root output directory.
    #[arg(short, long, env = "DOCMD_OUTPUT_DIR", default_value = "markdown_output")]
    output: PathBuf,

    /// Model id sent to the chat-completion endpoint.
    #[arg(long, env = "OPENROUTER_MODEL_NAME", default_value = docmd_translate::config::DEFAULT_MODEL)]
    model: String,

    /// API key for the chat-completion endpoint.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat-completions endpoint URL (any OpenAI-compatible service).
    #[arg(long, env = "DOCMD_ENDPOINT", default_value = docmd_translate::pipeline::transform::OPENROUTER_ENDPOINT)]
    endpoint: String,

    /// HTML → Markdown prompt template.
    #[arg(
        long,
        env = "HTML_TO_ENGLISH_PROMPT_FILE_PATH",
        default_value = "prompts/html_to_english_markdown.txt"
    )]
    html_prompt: PathBuf,

    /// Markdown translation prompt template.
    #[arg(
        long,
        env = "ENGLISH_TO_JAPANESE_PROMPT_FILE_PATH",
        default_value = "prompts/english_markdown_to_japanese.txt"
    )]
    translate_prompt: PathBuf,

    /// Terms the model must leave untranslated, one per line.
    #[arg(
        long,
        env = "DO_NOT_TRANSLATE_FILE_PATH",
        default_value = "dictionaries/do_not_translate.txt"
    )]
    do_not_translate: PathBuf,

    /// Maximum translation chunk size in characters.
    #[arg(long, env = "DOCMD_CHUNK_SIZE", default_value_t = 5000,
          value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,

    /// Per-request timeout for remote calls, in seconds.
    #[arg(long, env = "DOCMD_API_TIMEOUT", default_value_t = 180,
          value_parser = clap::value_parser!(u64).range(1..))]
    api_timeout: u64,

    /// Page fetch timeout, in milliseconds.
    #[arg(long, env = "DOCMD_FETCH_TIMEOUT_MS", default_value_t = 3000)]
    fetch_timeout_ms: u64,

    /// `id` of the element holding the page's main content.
    #[arg(long, env = "DOCMD_CONTENT_ID", default_value = "main")]
    content_id: String,

    /// Target language code; also the translated output subdirectory.
    #[arg(long, env = "DOCMD_LANG", default_value = "ja")]
    lang: String,

    /// Write empty results instead of skipping them.
    #[arg(long, env = "DOCMD_WRITE_EMPTY")]
    write_empty: bool,

    /// Pass failed content through without an explanatory note.
    #[arg(long, env = "DOCMD_NO_ANNOTATE")]
    no_annotate: bool,

    /// Append-only diagnostic log file.
    #[arg(long, env = "DOCMD_LOG_FILE", default_value = "logs/docmd.log")]
    log_file: PathBuf,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "DOCMD_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "DOCMD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level logs on stderr.
    #[arg(short, long, env = "DOCMD_VERBOSE")]
    verbose: bool,

    /// Suppress all stderr output except errors.
    #[arg(short, long, env = "DOCMD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines on stderr; the log file always
    // gets the full record.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    init_logging(&cli.log_file, filter)?;

    if let Err(e) = run(&cli, show_progress).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let urls = read_url_list(&cli.urls)
        .await
        .context("Failed to read URL list")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb).await?;
    let summary = convert_all(&urls, &config)
        .await
        .context("Pipeline failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&summary, &cli.output);
    }
    Ok(())
}

/// Stderr layer filtered by `RUST_LOG` (or `filter`), plus an ANSI-free layer
/// appending to `log_file`.
fn init_logging(log_file: &Path, filter: &str) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
    );
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new("info,docmd_translate=debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let prompts = PromptSet::load(
        Some(cli.html_prompt.as_path()),
        Some(cli.translate_prompt.as_path()),
        Some(cli.do_not_translate.as_path()),
    )
    .await;

    let mut builder = PipelineConfig::builder()
        .model(&cli.model)
        .endpoint(&cli.endpoint)
        .prompts(prompts)
        .max_chunk_size(usize::try_from(cli.chunk_size).context("--chunk-size is too large")?)
        .api_timeout_secs(cli.api_timeout)
        .fetch_timeout_ms(cli.fetch_timeout_ms)
        .content_id(&cli.content_id)
        .target_lang(&cli.lang)
        .output_dir(&cli.output)
        .annotate_degraded(!cli.no_annotate)
        .empty_output(if cli.write_empty {
            EmptyOutputPolicy::WriteEmpty
        } else {
            EmptyOutputPolicy::Skip
        });

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &RunSummary, output_dir: &Path) {
    let written = summary.pages.len();
    let skipped = summary.skipped.len();
    let degraded = summary.degraded_chunks()
        + summary
            .pages
            .iter()
            .filter(|p| p.conversion_degraded.is_some())
            .count();

    let mark = if skipped == 0 && degraded == 0 {
        green("✔")
    } else if written == 0 && summary.total_urls > 0 {
        red("✘")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{} {}/{} pages written to {}  {}",
        mark,
        bold(&written.to_string()),
        summary.total_urls,
        bold(&output_dir.display().to_string()),
        dim(&format!("{}ms", summary.duration_ms)),
    );
    if skipped > 0 {
        eprintln!("   {} page(s) skipped", red(&skipped.to_string()));
    }
    if degraded > 0 {
        eprintln!(
            "   {} remote call(s) passed content through untranslated",
            yellow(&degraded.to_string())
        );
    }
}

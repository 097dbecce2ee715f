//! CLI binary for ocr-audit.
//!
//! A thin shim over the library crate: each subcommand maps its flags to the
//! matching config type, runs one pipeline stage (or the whole audit) and
//! prints the result as text or JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use ocr_audit::audit::{write_text, ArtifactPaths};
use ocr_audit::pipeline::{encode, render};
use ocr_audit::{
    audit_page, compare_sources, inspect, locate, AuditConfig, AuditProgressCallback,
    CloudOcrClient, CloudOcrConfig, CompletionCheck, ComparisonReport, ExportFormat, JobStatus,
    LocatorConfig, MatchReport, ProgressCallback, SearchQuery, Stage,
};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the pipeline stages and every OCR poll.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl AuditProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_job_submitted(&self, job_id: &str) {
        self.bar
            .println(format!("  {} OCR job {}", cyan("◆"), bold(job_id)));
        self.bar.set_message("waiting for the service…");
    }

    fn on_poll(&self, job_id: &str, attempt: u32, status: JobStatus) {
        let status = match status {
            JobStatus::Failed => red(&status.to_string()),
            JobStatus::Finished => green(&status.to_string()),
            _ => status.to_string(),
        };
        self.bar
            .set_message(format!("{job_id}: {status} {}", dim(&format!("(poll {attempt})"))));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Search an archive and list hits with their snippets
  ocr-audit search --url https://archive.example.edu/search "James Meredith"

  # Page 3 metadata (no credentials needed)
  ocr-audit inspect https://archive.example.edu/pdf/1962-10-01.pdf

  # Render a page and its embedded text into ./work
  ocr-audit render scan.pdf --page 3 --work-dir work

  # Run cloud OCR on an image
  ocr-audit ocr work/page-3.png -o work/page-3.ocr.txt

  # Compare two texts for a phrase
  ocr-audit compare work/page-3.baseline.txt work/page-3.ocr.txt --phrase "James Meredith"

  # Everything at once
  ocr-audit audit scan.pdf --page 3 --phrase "James Meredith" --json

ENVIRONMENT VARIABLES:
  CLOUD_OCR_APPLICATION_ID    Cloud OCR application id
  CLOUD_OCR_SECRET            Cloud OCR secret
  CLOUD_OCR_POLL_INTERVAL_MS  Delay between status polls (default 3000)
  CLOUD_OCR_TIMEOUT_MS        Upper bound on the OCR wait (default 120000)
  PDFIUM_LIB_PATH             Path to libpdfium (else ./ then the system library)
  RUST_LOG                    Log filter, overrides --verbose/--quiet
"#;

/// Audit the OCR quality of scanned newspaper pages.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-audit",
    version,
    about = "Compare a scanned page's embedded OCR text against a cloud OCR service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR_AUDIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OCR_AUDIT_QUIET")]
    quiet: bool,

    /// Print results as JSON.
    #[arg(long, global = true, env = "OCR_AUDIT_JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit an archive's search form and list the hits.
    Search(SearchArgs),
    /// Print PDF metadata.
    Inspect {
        /// Local PDF path or HTTP/HTTPS URL.
        document: String,
        #[command(flatten)]
        work: WorkArgs,
    },
    /// Render one page to PNG and save its embedded text.
    Render {
        /// Local PDF path or HTTP/HTTPS URL.
        document: String,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        work: WorkArgs,
    },
    /// Run cloud OCR on an image file.
    Ocr {
        /// Image to recognise (PNG is uploaded as is; other formats are converted).
        image: PathBuf,
        /// Write the result here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Count a phrase in two text files.
    Compare {
        /// Embedded (archive) text.
        baseline: PathBuf,
        /// Cloud OCR text.
        cloud_ocr: PathBuf,
        #[command(flatten)]
        phrase: PhraseArgs,
    },
    /// Render, OCR and compare one page end to end.
    Audit {
        /// Local PDF path or HTTP/HTTPS URL.
        document: String,
        #[command(flatten)]
        page: PageArgs,
        #[command(flatten)]
        phrase: PhraseArgs,
        #[command(flatten)]
        work: WorkArgs,
        #[command(flatten)]
        ocr: OcrArgs,
        /// HTTP download timeout in seconds.
        #[arg(long, env = "OCR_AUDIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Page hosting the archive's search form.
    #[arg(long, env = "OCR_AUDIT_ARCHIVE_URL")]
    url: String,
    /// Free-text keywords.
    keywords: String,
    /// Field scope submitted with the keywords.
    #[arg(long, default_value = "all")]
    field: String,
    /// CSS selector for candidate search forms.
    #[arg(long, default_value = "form")]
    form_selector: String,
    /// Name of the keyword input.
    #[arg(long, default_value = "q")]
    keyword_field: String,
    /// Name of the field-scope input.
    #[arg(long, default_value = "field")]
    scope_field: String,
    /// CSS selector for the results container.
    #[arg(long, default_value = "#results")]
    results_selector: String,
    /// CSS selector for one hit inside the container.
    #[arg(long, default_value = ".result")]
    item_selector: String,
    /// CSS selector for the snippet inside a hit.
    #[arg(long, default_value = ".snippet")]
    context_selector: String,
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 1-indexed page number.
    #[arg(short, long, default_value_t = 1)]
    page: usize,
    /// Longest edge of the rendered image in pixels.
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u32).range(100..=10000))]
    max_pixels: u32,
    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR_AUDIT_PASSWORD")]
    password: Option<String>,
}

#[derive(Args, Debug)]
struct PhraseArgs {
    /// Literal, case-sensitive phrase to count.
    #[arg(long)]
    phrase: String,
    /// Characters of context on each side of a match.
    #[arg(long, default_value_t = 10)]
    window: usize,
}

#[derive(Args, Debug)]
struct WorkArgs {
    /// Directory for downloads and artifacts.
    #[arg(long, env = "OCR_AUDIT_WORK_DIR", default_value = "ocr-audit-work")]
    work_dir: PathBuf,
}

/// Flags override the `CLOUD_OCR_*` environment variables.
#[derive(Args, Debug)]
struct OcrArgs {
    /// Cloud OCR application id.
    #[arg(long)]
    app_id: Option<String>,
    /// Cloud OCR secret.
    #[arg(long)]
    secret: Option<String>,
    /// Delay between status polls in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Upper bound on the whole OCR wait in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Service base URL.
    #[arg(long, env = "CLOUD_OCR_ENDPOINT")]
    endpoint: Option<String>,
    /// Recognition language.
    #[arg(long, default_value = "English")]
    language: String,
    /// Result format.
    #[arg(long, value_enum, default_value = "txt")]
    export_format: ExportFormatArg,
    /// How job completion is detected.
    #[arg(long, value_enum, default_value = "task-status")]
    completion: CompletionArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportFormatArg {
    Txt,
    Xml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(v: ExportFormatArg) -> Self {
        match v {
            ExportFormatArg::Txt => ExportFormat::Txt,
            ExportFormatArg::Xml => ExportFormat::Xml,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompletionArg {
    TaskStatus,
    FinishedList,
}

impl From<CompletionArg> for CompletionCheck {
    fn from(v: CompletionArg) -> Self {
        match v {
            CompletionArg::TaskStatus => CompletionCheck::TaskStatus,
            CompletionArg::FinishedList => CompletionCheck::FinishedTaskList,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.json;
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

    match cli.command {
        Command::Search(ref args) => run_search(&cli, args).await,
        Command::Inspect {
            ref document,
            ref work,
        } => run_inspect(&cli, document, &work.work_dir).await,
        Command::Render {
            ref document,
            ref page,
            ref work,
        } => run_render(&cli, document, page, &work.work_dir).await,
        Command::Ocr {
            ref image,
            ref output,
            ref ocr,
        } => run_ocr(&cli, image, output.as_deref(), ocr, show_progress).await,
        Command::Compare {
            ref baseline,
            ref cloud_ocr,
            ref phrase,
        } => run_compare(&cli, baseline, cloud_ocr, phrase).await,
        Command::Audit {
            ref document,
            ref page,
            ref phrase,
            ref work,
            ref ocr,
            download_timeout,
        } => {
            run_audit(
                &cli,
                document,
                page,
                phrase,
                &work.work_dir,
                ocr,
                download_timeout,
                show_progress,
            )
            .await
        }
    }
}

async fn run_search(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let locator = LocatorConfig {
        form_selector: args.form_selector.clone(),
        keyword_field: args.keyword_field.clone(),
        scope_field: args.scope_field.clone(),
        results_selector: args.results_selector.clone(),
        item_selector: args.item_selector.clone(),
        context_selector: args.context_selector.clone(),
        ..LocatorConfig::default()
    };
    let query = SearchQuery::new(&args.url, &args.keywords, &args.field);
    let results = locate(&query, &locator)
        .await
        .with_context(|| format!("Search on {} failed", args.url))?;

    if cli.json {
        return print_json(&results);
    }
    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. {}", i + 1, bold(&r.url));
        if !r.context.is_empty() {
            println!("     {}", dim(&r.context));
        }
    }
    if !cli.quiet {
        eprintln!("{} {} result(s)", green("✔"), results.len());
    }
    Ok(())
}

async fn run_inspect(cli: &Cli, document: &str, work_dir: &Path) -> Result<()> {
    let meta = inspect(document, work_dir, &LocatorConfig::default())
        .await
        .context("Failed to inspect PDF")?;

    if cli.json {
        return print_json(&meta);
    }
    println!("File:         {}", document);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    if let Some(ref p) = meta.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = meta.creator {
        println!("Creator:      {}", c);
    }
    Ok(())
}

async fn run_render(cli: &Cli, document: &str, page: &PageArgs, work_dir: &Path) -> Result<()> {
    let pdf = ocr_audit::pipeline::input::resolve_document(
        document,
        work_dir,
        &LocatorConfig::default(),
    )
    .await
    .with_context(|| format!("Failed to open {document}"))?;

    let rendered = render::render_page(&pdf, page.page, page.max_pixels, page.password.as_deref())
        .await
        .with_context(|| format!("Failed to render page {}", page.page))?;

    let paths = ArtifactPaths::new(work_dir, page.page, ExportFormat::Txt);
    let png = encode::encode_png(&rendered.image).context("Failed to encode PNG")?;
    encode::save_png(&png, &paths.image)
        .await
        .context("Failed to save page image")?;
    write_text(&paths.baseline, &rendered.baseline_text)
        .await
        .context("Failed to save baseline text")?;

    if cli.json {
        #[derive(Serialize)]
        struct Rendered<'a> {
            image_path: &'a Path,
            baseline_path: &'a Path,
            width: u32,
            height: u32,
            baseline_chars: usize,
        }
        return print_json(&Rendered {
            image_path: &paths.image,
            baseline_path: &paths.baseline,
            width: rendered.image.width(),
            height: rendered.image.height(),
            baseline_chars: rendered.baseline_text.chars().count(),
        });
    }
    if !cli.quiet {
        eprintln!(
            "{} page {} → {} ({}x{}), {}",
            green("✔"),
            page.page,
            bold(&paths.image.display().to_string()),
            rendered.image.width(),
            rendered.image.height(),
            paths.baseline.display(),
        );
    }
    Ok(())
}

async fn run_ocr(
    cli: &Cli,
    image: &Path,
    output: Option<&Path>,
    args: &OcrArgs,
    show_progress: bool,
) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let png = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        bytes
    } else {
        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("{} is not a readable image", image.display()))?;
        encode::encode_png(&img).context("Failed to encode PNG")?
    };

    let progress = show_progress.then(CliProgressCallback::new);
    let mut client = build_ocr_client(args)?;
    if let Some(ref p) = progress {
        client = client.with_progress(p.clone() as ProgressCallback);
    }
    let result = client.recognize(&png).await;
    if let Some(p) = progress {
        p.finish();
    }
    let recognized = result.context("Cloud OCR failed")?;

    match output {
        Some(path) => {
            write_text(path, &recognized.text)
                .await
                .context("Failed to save OCR result")?;
            if cli.json {
                print_json(&recognized)?;
            } else if !cli.quiet {
                eprintln!(
                    "{} job {} → {}",
                    green("✔"),
                    recognized.job_id,
                    bold(&path.display().to_string())
                );
            }
        }
        None if cli.json => print_json(&recognized)?,
        None => println!("{}", recognized.text),
    }
    Ok(())
}

async fn run_compare(
    cli: &Cli,
    baseline: &Path,
    cloud_ocr: &Path,
    phrase: &PhraseArgs,
) -> Result<()> {
    let baseline_text = tokio::fs::read_to_string(baseline)
        .await
        .with_context(|| format!("Failed to read {}", baseline.display()))?;
    let cloud_text = tokio::fs::read_to_string(cloud_ocr)
        .await
        .with_context(|| format!("Failed to read {}", cloud_ocr.display()))?;

    let report = compare_sources(&baseline_text, &cloud_text, &phrase.phrase, phrase.window);
    if cli.json {
        return print_json(&report);
    }
    print_comparison(&report);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_audit(
    cli: &Cli,
    document: &str,
    page: &PageArgs,
    phrase: &PhraseArgs,
    work_dir: &Path,
    ocr: &OcrArgs,
    download_timeout: u64,
    show_progress: bool,
) -> Result<()> {
    let client = build_ocr_client(ocr)?;
    let progress = show_progress.then(CliProgressCallback::new);

    let mut builder = AuditConfig::builder()
        .page(page.page)
        .phrase(&phrase.phrase)
        .context_window(phrase.window)
        .work_dir(work_dir)
        .max_rendered_pixels(page.max_pixels)
        .download_timeout_secs(download_timeout);
    if let Some(ref pwd) = page.password {
        builder = builder.password(pwd);
    }
    let client = match progress {
        Some(ref p) => {
            builder = builder.progress_callback(p.clone() as ProgressCallback);
            client.with_progress(p.clone() as ProgressCallback)
        }
        None => client,
    };
    let config = builder.build().context("Invalid configuration")?;

    let result = audit_page(document, &config, &client, &LocatorConfig::default()).await;
    if let Some(p) = progress {
        p.finish();
    }
    let output = result.context("Audit failed")?;

    if cli.json {
        return print_json(&output);
    }
    print_comparison(&output.comparison);
    if !cli.quiet {
        eprintln!(
            "{} page {}  job {}  {}ms total  →  {}",
            green("✔"),
            output.page_number,
            output.job_id,
            output.stats.total_duration_ms,
            bold(&work_dir.display().to_string()),
        );
    }
    Ok(())
}

/// Environment first, then any flag that was given.
fn build_ocr_client(args: &OcrArgs) -> Result<CloudOcrClient> {
    let mut config = CloudOcrConfig::from_env().context("Invalid CLOUD_OCR_* environment")?;
    if let Some(ref id) = args.app_id {
        config.application_id = Some(id.clone());
    }
    if let Some(ref secret) = args.secret {
        config.secret = Some(secret.clone());
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout_ms = ms;
    }
    if let Some(ref endpoint) = args.endpoint {
        config.endpoint = endpoint.trim_end_matches('/').to_string();
    }
    config.language = args.language.clone();
    config.export_format = args.export_format.into();
    config.completion_check = args.completion.into();

    CloudOcrClient::http(config).context("Cloud OCR is not configured")
}

fn print_comparison(report: &ComparisonReport) {
    println!("Phrase: {}", bold(&report.phrase));
    for (label, matches, profile) in [
        ("baseline ", &report.baseline, &report.baseline_profile),
        ("cloud OCR", &report.cloud_ocr, &report.cloud_ocr_profile),
    ] {
        println!(
            "\n{} {}  {}",
            cyan("◆"),
            bold(label),
            dim(&format!(
                "{} chars, {} words, {} unknown, {} spaced runs",
                profile.char_count,
                profile.word_count,
                profile.unknown_markers,
                profile.spaced_letter_runs
            ))
        );
        print_matches(matches);
    }
}

fn print_matches(report: &MatchReport) {
    if report.is_empty() {
        println!("  {} no matches", red("✗"));
        return;
    }
    println!("  {} {} match(es)", green("✓"), report.len());
    for m in &report.matches {
        println!(
            "    …{}{}{}…",
            dim(&m.preceding_context.replace('\n', " ")),
            bold(&m.matched_phrase),
            dim(&m.following_context.replace('\n', " ")),
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

use std::fs::File;
use std::path::PathBuf;
use std::thread;

use clap::{Args, Parser, Subcommand};
use serde_json::Value as Json;
use te_core::IngestConfig;
use te_ingest::{IngestSummary, ProgressReader, progress_channel};
use te_sqlite::{Store, StoreOptions, default_db_path};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Page size used by `browse elements` when `--limit` is not given.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Longest summary printed for one element.
const MAX_SUMMARY: usize = 120;

/// Longest single value inside a generic summary.
const MAX_SUMMARY_VALUE: usize = 40;

/// Keys that identify an element well enough on their own, best first.
const SUMMARY_KEYS: [&str; 4] = ["sid", "description", "code", "descriptionPeriod.sid"];

/// Capacity of the progress channel; samples beyond it are dropped.
const PROGRESS_CAPACITY: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "te")]
#[command(about = "Load TARIC XML exports into SQLite and browse them")]
#[command(version)]
struct Cli {
    /// Log progress details (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse an XML export into the element database.
    Parse(ParseArgs),
    /// Inspect a previously loaded element database.
    Browse(BrowseArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Path to the TARIC XML export.
    input: PathBuf,
    /// Database file path (default: user cache dir, te/tariff.db).
    #[arg(long)]
    db: Option<PathBuf>,
    /// YAML file with ingest settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fail on duplicate or missing hjid values.
    #[arg(long)]
    strict: bool,
    /// Rows per committed transaction.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Depth of the persisted elements, counting the root as 1.
    #[arg(long)]
    target_depth: Option<usize>,
    /// Deepest element nesting accepted below a persisted element.
    #[arg(long)]
    max_nesting: Option<usize>,
    /// Do not print a progress indicator.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Args)]
struct BrowseArgs {
    /// Database file path (default: user cache dir, te/tariff.db).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    view: BrowseView,
}

#[derive(Debug, Subcommand)]
enum BrowseView {
    /// List element types with their row counts.
    Types,
    /// List one page of elements of a type.
    Elements(ElementsArgs),
    /// Print the stored payload of one element.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct ElementsArgs {
    /// Element type, as listed by `browse types`.
    element_type: String,
    /// Maximum number of elements to list.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    limit: usize,
    /// Number of elements to skip.
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Identifier of the element.
    hjid: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Browse(args) => run_browse(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// parse command
// ---------------------------------------------------------------------------

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let config = resolve_config(&args)?;
    let db = args.db.clone().unwrap_or_else(default_db_path);

    let file = File::open(&args.input)
        .map_err(|e| format!("Failed to open '{}': {e}", args.input.display()))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut store = Store::open_with(&db, StoreOptions::from(&config))
        .map_err(|e| format!("Failed to open store '{}': {e}", db.display()))?;
    let parser = te_ingest::Parser::new(config);

    let result = if args.quiet {
        parser.parse(file, &mut store)
    } else {
        parse_with_progress(&parser, file, total, &mut store)
    };

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            if let Err(close_err) = store.close() {
                warn!(error = %close_err, "Failed to close store after aborted run");
            }
            return Err(format!("Parsing '{}' failed: {err}", args.input.display()));
        }
    };
    store
        .close()
        .map_err(|e| format!("Failed to close store '{}': {e}", db.display()))?;

    print_summary(&summary, &db);
    Ok(())
}

/// Loads `--config` if given, then applies the individual flag overrides.
fn resolve_config(args: &ParseArgs) -> Result<IngestConfig, String> {
    let mut config = match &args.config {
        Some(path) => IngestConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => IngestConfig::default(),
    };
    if args.strict {
        config.strict = true;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(target_depth) = args.target_depth {
        config.target_depth = target_depth;
    }
    if let Some(max_nesting) = args.max_nesting {
        config.max_nesting = max_nesting;
    }
    config.validate().map_err(|e| format!("Invalid settings: {e}"))?;
    Ok(config)
}

/// Runs the parser on a worker thread and draws a percentage on stderr.
///
/// The channel closes when the worker drops its reader, which ends the
/// drawing loop.
fn parse_with_progress(
    parser: &te_ingest::Parser,
    file: File,
    total: u64,
    store: &mut Store,
) -> te_ingest::Result<IngestSummary> {
    let (sender, receiver) = progress_channel(PROGRESS_CAPACITY);
    let reader = ProgressReader::new(file, total, sender);

    thread::scope(|scope| {
        let worker = scope.spawn(move || parser.parse(reader, store));

        let mut shown: Option<u32> = None;
        for fraction in receiver {
            let percent = progress_percent(fraction);
            // Samples may be dropped, so only ever move forward.
            if shown.is_none_or(|last| percent > last) {
                eprint!("\rParsing... {percent}%");
                shown = Some(percent);
            }
        }
        if shown.is_some() {
            eprintln!();
        }

        worker
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    })
}

fn progress_percent(fraction: f64) -> u32 {
    (fraction.clamp(0.0, 1.0) * 100.0).floor() as u32
}

fn print_summary(summary: &IngestSummary, db: &std::path::Path) {
    let seconds = summary.elapsed().num_milliseconds() as f64 / 1000.0;
    println!(
        "Parsed {} elements of {} types in {seconds:.1}s into '{}'.",
        summary.records,
        summary.by_type.len(),
        db.display()
    );
    if summary.missing_identifiers > 0 {
        println!(
            "  {} elements had no hjid and were stored under '{}'.",
            summary.missing_identifiers,
            te_ingest::MISSING_IDENTIFIER
        );
    }
}

// ---------------------------------------------------------------------------
// browse command
// ---------------------------------------------------------------------------

fn run_browse(args: BrowseArgs) -> Result<(), String> {
    let db = args.db.unwrap_or_else(default_db_path);
    let store = Store::open_read_only(&db)
        .map_err(|e| format!("Failed to open store '{}': {e}", db.display()))?;

    let result = match args.view {
        BrowseView::Types => browse_types(&store),
        BrowseView::Elements(view) => browse_elements(&store, view),
        BrowseView::Show(view) => browse_show(&store, &view.hjid),
    };

    if let Err(err) = store.close() {
        warn!(error = %err, "Failed to close read-only store");
    }
    result
}

fn browse_types(store: &Store) -> Result<(), String> {
    let counts = store
        .type_counts()
        .map_err(|e| format!("Failed to list types: {e}"))?;
    if counts.is_empty() {
        println!("No elements stored.");
        return Ok(());
    }

    let width = counts
        .iter()
        .map(|c| c.element_type.len())
        .max()
        .unwrap_or(0)
        .max("TYPE".len());
    println!("{:<width$}  {:>10}", "TYPE", "COUNT");
    for count in &counts {
        println!("{:<width$}  {:>10}", count.element_type, count.count);
    }
    Ok(())
}

fn browse_elements(store: &Store, view: ElementsArgs) -> Result<(), String> {
    let total = store
        .element_count(&view.element_type)
        .map_err(|e| format!("Failed to count '{}' elements: {e}", view.element_type))?;
    let page = store
        .elements(&view.element_type, view.limit, view.offset)
        .map_err(|e| format!("Failed to list '{}' elements: {e}", view.element_type))?;

    let width = page.iter().map(|e| e.hjid.len()).max().unwrap_or(0);
    for element in &page {
        println!("{:<width$}  {}", element.hjid, summarise(&element.data));
    }
    println!("{}", page_footer(view.offset, page.len(), total));
    Ok(())
}

fn browse_show(store: &Store, hjid: &str) -> Result<(), String> {
    let element = store
        .element(hjid)
        .map_err(|e| format!("Failed to load element: {e}"))?;
    let data: Json = serde_json::from_str(&element.data)
        .map_err(|e| format!("Stored payload of '{hjid}' is not JSON: {e}"))?;
    let pretty = serde_json::to_string_pretty(&data)
        .map_err(|e| format!("Failed to format payload of '{hjid}': {e}"))?;

    println!("{} {}", element.element_type, element.hjid);
    println!("{pretty}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One-line description of a stored payload for element listings.
///
/// Prefers a single well-known identifying key; otherwise shows the first
/// three attributes other than `hjid` and the content marker.
fn summarise(data: &str) -> String {
    let Ok(Json::Object(object)) = serde_json::from_str::<Json>(data) else {
        return truncate(data, MAX_SUMMARY);
    };

    for key in SUMMARY_KEYS {
        if let Some(value) = object.get(key) {
            return truncate(&format!("{key}={}", display_value(value)), MAX_SUMMARY);
        }
    }

    let parts: Vec<String> = object
        .iter()
        .filter(|(key, _)| key.as_str() != te_core::CONTENT_KEY && key.as_str() != te_ingest::IDENTIFIER_KEY)
        .take(3)
        .map(|(key, value)| {
            let value = display_value(value);
            if value.chars().count() > MAX_SUMMARY_VALUE {
                format!("{key}={}...", truncate(&value, MAX_SUMMARY_VALUE))
            } else {
                format!("{key}={value}")
            }
        })
        .collect();
    truncate(&parts.join(", "), MAX_SUMMARY)
}

fn display_value(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn page_footer(offset: usize, shown: usize, total: usize) -> String {
    if shown == 0 {
        return format!("showing 0 of {total}");
    }
    format!("showing {}-{} of {total}", offset + 1, offset + shown)
}

//! Headertrack CLI.
//!
//! Observation intake, flush/upload cycles, local export, settings, and
//! the collector ingestion server. Command payloads go to stdout; all
//! logging goes to stderr.

use clap::{Args, Parser, Subcommand};
use ht_common::sorted_by_count;
use ht_core::aggregator::Aggregator;
use ht_core::collector::{CollectorConfig, CollectorServer};
use ht_core::exit_codes::ExitCode;
use ht_core::export::export_stats;
use ht_core::ingest::read_observations;
use ht_core::logging::{init_logging, LogFormat};
use ht_core::scheduler::UploadScheduler;
use ht_core::settings;
use ht_core::store::{self, JsonFileStore};
use ht_core::upload::HttpTransport;
use ht_redact::{HeaderCandidate, SecrecyClassifier};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Headertrack - privacy-safe HTTP header statistics
#[derive(Parser)]
#[command(name = "ht-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Override the data directory
    #[arg(long, global = true, env = "HT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    log_format: LogFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest observation JSON lines from stdin, uploading periodically
    Run,

    /// Run one flush/upload cycle and report the outcome
    Tick,

    /// Show the persisted table status
    Status {
        /// Number of top entries to include
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Export the persisted table as a timestamped JSON file
    Export {
        /// Directory the export file is written to
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Clear all collected statistics
    Clear,

    /// Classify a single header (diagnostic)
    Classify {
        /// Header name
        #[arg(long)]
        name: String,
        /// Header value (defaults to empty)
        #[arg(long, default_value = "")]
        value: String,
    },

    /// Show or change collection settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run the collector ingestion server
    Collector {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// File the collector persists its table to
        #[arg(long, default_value = "stats.json")]
        data_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Set the collector endpoint (blank disables collection)
    SetEndpoint { endpoint: String },
    /// Set the upload interval in minutes
    SetFrequency { minutes: u64 },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.log_format, cli.global.verbose, cli.global.quiet);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, code = err.code(), category = %err.category(), "command failed");
            ExitCode::from_error(&err)
        }
    };
    std::process::exit(code.into());
}

fn run(cli: Cli) -> ht_common::Result<ExitCode> {
    let open_store = || -> ht_common::Result<JsonFileStore> {
        match &cli.global.data_dir {
            Some(dir) => Ok(JsonFileStore::open_in(dir)),
            None => JsonFileStore::open_default(),
        }
    };

    match cli.command {
        Commands::Run => cmd_run(open_store()?),
        Commands::Tick => cmd_tick(open_store()?),
        Commands::Status { top } => cmd_status(open_store()?, top),
        Commands::Export { dir } => cmd_export(open_store()?, &dir),
        Commands::Clear => cmd_clear(open_store()?),
        Commands::Classify { name, value } => cmd_classify(&name, &value),
        Commands::Config { action } => cmd_config(open_store()?, action),
        Commands::Collector {
            bind,
            port,
            data_file,
        } => cmd_collector(CollectorConfig {
            bind,
            port,
            data_file,
        }),
    }
}

/// Capture loop: observations from stdin, uploads on a background thread.
fn cmd_run(store: JsonFileStore) -> ht_common::Result<ExitCode> {
    let store = Arc::new(store);
    let aggregator = Arc::new(Aggregator::new(SecrecyClassifier::default()));
    let scheduler = Arc::new(UploadScheduler::new(
        aggregator.clone(),
        store.clone(),
        HttpTransport::new()?,
    ));
    let shutdown = Arc::new(AtomicBool::new(false));

    let upload_thread = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        std::thread::Builder::new()
            .name("ht-upload".to_string())
            .spawn(move || scheduler.run_loop(&shutdown))?
    };

    info!("header capture enabled, reading observations from stdin");
    let stdin = std::io::stdin();
    let recorded = read_observations(stdin.lock(), &aggregator)?;
    info!(recorded, "observation stream ended");

    shutdown.store(true, Ordering::SeqCst);
    let _ = upload_thread.join();

    // Final cycle so short runs still persist and ship what they saw.
    let outcome = scheduler.run_cycle()?;
    info!(%outcome, "final upload cycle finished");
    Ok(ExitCode::Success)
}

fn cmd_tick(store: JsonFileStore) -> ht_common::Result<ExitCode> {
    let aggregator = Arc::new(Aggregator::new(SecrecyClassifier::default()));
    let scheduler = UploadScheduler::new(aggregator, Arc::new(store), HttpTransport::new()?);
    let outcome = scheduler.run_cycle()?;
    println!("{}", outcome);
    Ok(ExitCode::Success)
}

fn cmd_status(store: JsonFileStore, top: usize) -> ht_common::Result<ExitCode> {
    let table = store::load_table(&store)?;
    let sorted = sorted_by_count(&table);
    let top_entries = &sorted[..sorted.len().min(top)];

    let status = serde_json::json!({
        "totalEntries": table.len(),
        "serverEndpoint": store::load_endpoint(&store)?,
        "uploadFrequency": store::load_upload_frequency(&store)?,
        "top": top_entries,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(ExitCode::Success)
}

fn cmd_export(store: JsonFileStore, dir: &std::path::Path) -> ht_common::Result<ExitCode> {
    let aggregator = Aggregator::new(SecrecyClassifier::default());
    let path = export_stats(&aggregator, &store, dir)?;
    println!("{}", path.display());
    Ok(ExitCode::Success)
}

fn cmd_clear(store: JsonFileStore) -> ht_common::Result<ExitCode> {
    store::clear_table(&store)?;
    info!("all header statistics cleared");
    println!(r#"{{"cleared":true}}"#);
    Ok(ExitCode::Success)
}

fn cmd_classify(name: &str, value: &str) -> ht_common::Result<ExitCode> {
    let classifier = SecrecyClassifier::default();
    let verdict = classifier
        .classify(&HeaderCandidate { name, value })
        .map_err(|_| ht_common::Error::MissingHeaderName)?;

    let report = serde_json::json!({
        "name": name,
        "redact": verdict.is_some(),
        "rule": verdict,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::Success)
}

fn cmd_config(store: JsonFileStore, action: ConfigAction) -> ht_common::Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let config = serde_json::json!({
                "serverEndpoint": store::load_endpoint(&store)?,
                "uploadFrequency": store::load_upload_frequency(&store)?,
            });
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::SetEndpoint { endpoint } => {
            settings::set_endpoint(&store, &endpoint)?;
        }
        ConfigAction::SetFrequency { minutes } => {
            settings::set_upload_frequency(&store, minutes)?;
        }
    }
    Ok(ExitCode::Success)
}

fn cmd_collector(config: CollectorConfig) -> ht_common::Result<ExitCode> {
    let server = CollectorServer::start(&config)?;
    info!(addr = %server.addr(), "collector running, press Ctrl-C to stop");

    // The serve loop lives on its own thread; park here until the process
    // is terminated.
    loop {
        std::thread::park();
    }
}

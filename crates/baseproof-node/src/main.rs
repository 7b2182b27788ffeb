//! BaseProof Replay Node
//!
//! Drives an in-memory reputation ledger from newline-delimited JSON
//! commands. Reads from a file or stdin, writes one JSON reply per command
//! to stdout and logs to stderr.

mod commands;

use anyhow::{Context, Result};
use baseproof_reputation::{
    InMemoryStore, LedgerConfig, LedgerConfigBuilder, ManualClock, ReputationLedger,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// BaseProof Replay Node
///
/// Replays vouch commands against the reputation ledger.
#[derive(Parser, Debug)]
#[command(name = "baseproof-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// Command file (newline-delimited JSON). Reads stdin when omitted.
    #[arg(short, long, env = "BASEPROOF_INPUT")]
    input: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BASEPROOF_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "BASEPROOF_LOG_FORMAT", default_value = "plain")]
    log_format: String,

    /// Vouches a sender may issue per calendar day
    #[arg(long, env = "BASEPROOF_DAILY_LIMIT", default_value = "5")]
    daily_limit: u32,

    /// Vouches a sender may issue per weekly window
    #[arg(long, env = "BASEPROOF_WEEKLY_LIMIT", default_value = "35")]
    weekly_limit: u32,

    /// UTC offset in seconds of the zone whose midnight ends a day
    #[arg(long, env = "BASEPROOF_DAY_OFFSET_SECS", default_value = "0", allow_hyphen_values = true)]
    day_offset_secs: i32,

    /// Commit retries on storage conflict
    #[arg(long, env = "BASEPROOF_MAX_COMMIT_RETRIES", default_value = "3")]
    max_commit_retries: u32,

    /// Replay clock start (RFC 3339). Defaults to the current time.
    #[arg(long, env = "BASEPROOF_START")]
    start: Option<String>,
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

/// Build ledger configuration from CLI arguments
fn build_config(args: &Args) -> Result<LedgerConfig> {
    LedgerConfigBuilder::new()
        .with_daily_limit(args.daily_limit)
        .with_weekly_limit(args.weekly_limit)
        .with_day_boundary_offset_secs(args.day_offset_secs)
        .with_max_commit_retries(args.max_commit_retries)
        .build_validated()
        .context("Invalid ledger configuration")
}

fn parse_start(start: Option<&str>) -> Result<DateTime<Utc>> {
    match start {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid start time: {raw}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

async fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, &args.log_format)?;

    let config = build_config(&args)?;
    let start = parse_start(args.start.as_deref())?;
    let clock = Arc::new(ManualClock::new(start));
    let ledger = ReputationLedger::with_config(
        Arc::new(InMemoryStore::new()),
        clock.clone(),
        config,
    )
    .context("Failed to initialize ledger")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        start = %start,
        daily_limit = args.daily_limit,
        weekly_limit = args.weekly_limit,
        day_offset_secs = args.day_offset_secs,
        "Starting BaseProof replay node"
    );

    let mut lines = open_input(args.input.as_ref()).await?.lines();
    let mut out = tokio::io::stdout();
    let mut line_no = 0u64;
    let mut failed = 0u64;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let reply = commands::handle_line(&ledger, &clock, &line).await;
        if reply.ok {
            debug!(line = line_no, "Command applied");
        } else {
            failed += 1;
            warn!(
                line = line_no,
                code = reply.code.unwrap_or("unknown"),
                error = reply.error.as_deref().unwrap_or_default(),
                "Command failed"
            );
        }

        let mut encoded = serde_json::to_vec(&reply).context("Failed to encode reply")?;
        encoded.push(b'\n');
        out.write_all(&encoded)
            .await
            .context("Failed to write reply")?;
    }
    out.flush().await.context("Failed to flush output")?;

    info!(
        lines = line_no,
        failed,
        profiles = ledger.store().profile_count(),
        vouches = ledger.store().vouch_count(),
        "Replay finished"
    );
    Ok(())
}

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use strand::attempt::AttemptRecord;
use strand::committer::BackgroundCommitter;
use strand::config::{parse_prohibited_json, StrandConfig};
use strand::contracts::Committer;
use strand::fuzzer::Fuzzer;
use strand::generator::{Attempts, RendererKind};
use strand::metrics::MetricsRegistry;
use strand::sink::DurableSink;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "strand", version, about = "Generate fuzz strings and record their outcomes")]
struct Cli {
    /// SQLite database (overrides STRAND_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Record table (overrides STRAND_TABLE)
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the record table
    Init,
    /// Print attempts, one per line
    Generate(GenerateArgs),
    /// Follow the record table as JSON lines
    Tail(TailArgs),
    /// Row counts per outcome
    Stats,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    length: Option<usize>,

    #[arg(long)]
    minimum: Option<u32>,

    #[arg(long)]
    maximum: Option<u32>,

    /// JSON array of one-character strings, e.g. '["\\n", "\\u0000"]'
    #[arg(long)]
    prohibited: Option<String>,

    /// Template containing `{fuzzed_string}` once
    #[arg(long)]
    format: Option<String>,

    #[arg(long)]
    renderer: Option<RendererKind>,

    /// Draw random attempts instead of enumerating
    #[arg(long)]
    random: bool,

    /// Stop after this many attempts
    #[arg(long)]
    limit: Option<u64>,

    /// Record every printed attempt with this outcome
    #[arg(long, value_enum)]
    record: Option<RecordAs>,
}

#[derive(clap::Args, Debug)]
struct TailArgs {
    /// Only rows with this outcome
    #[arg(long, value_enum)]
    only: Option<RecordAs>,

    #[arg(long, default_value_t = strand::tail::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Start after this attempt_id instead of replaying the table
    #[arg(long, default_value_t = 0)]
    after: i64,

    /// Exit once caught up instead of following
    #[arg(long)]
    once: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RecordAs {
    Success,
    Failure,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("strand=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = StrandConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(table) = cli.table {
        config.table = table;
    }

    let sink = Arc::new(DurableSink::open(&config.database, config.sink.clone())?);
    tracing::info!(
        database = %config.database.display(),
        table = %config.table,
        "Opened database"
    );
    let fuzzer = Fuzzer::new(Arc::clone(&sink), &config.table);

    match cli.command {
        Command::Init => {
            if fuzzer.initialize()? {
                tracing::info!(table = %config.table, "Initialized record table");
            } else {
                tracing::info!(table = %config.table, "Record table already exists");
            }
        }
        Command::Generate(args) => generate(fuzzer, config, args).await?,
        Command::Tail(args) => tail(fuzzer, config, args).await?,
        Command::Stats => {
            let counts = sink.outcome_counts(&config.table)?;
            let report = serde_json::json!({
                "table": config.table,
                "success": counts.success,
                "failure": counts.failure,
                "unset": counts.unset,
                "total": counts.total(),
            });
            println!("{}", report);
        }
    }

    Ok(())
}

async fn generate(fuzzer: Fuzzer, config: StrandConfig, args: GenerateArgs) -> Result<(), BoxError> {
    let mut generation = config.generation;
    if let Some(length) = args.length {
        generation.length = length;
    }
    if let Some(minimum) = args.minimum {
        generation.minimum = minimum;
    }
    if let Some(maximum) = args.maximum {
        generation.maximum = maximum;
    }
    if let Some(raw) = args.prohibited {
        generation.prohibited = parse_prohibited_json(&raw)?;
    }
    if let Some(format) = args.format {
        generation.output_format = format;
    }
    if let Some(renderer) = args.renderer {
        generation.renderer = renderer;
    }
    generation.random |= args.random;
    if args.limit.is_some() {
        generation.limit = args.limit;
    }

    let spec = generation.to_spec()?;
    let attempts = if generation.random {
        Attempts::Random(fuzzer.random(&spec)?)
    } else {
        Attempts::Sequential(fuzzer.sequential(&spec)?)
    };
    let limit = generation.limit.unwrap_or(u64::MAX);

    let committer = match args.record {
        Some(_) => {
            fuzzer.initialize()?;
            let committer = BackgroundCommitter::new(Arc::clone(fuzzer.sink()), config.committer);
            committer.start().await?;
            Some(committer)
        }
        None => None,
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, finishing up");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    let record = args.record;
    let emitted = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        emit(attempts, BufWriter::new(stdout.lock()), limit, record, &interrupted)
    })
    .await
    .map_err(BoxError::from)
    .and_then(|emitted| emitted);

    // Marked attempts still pooled must be committed even if emitting failed.
    if let Some(committer) = committer {
        let result = committer.stop().await?;
        tracing::info!(
            committed = result.entries_committed,
            remaining = result.pool_remaining,
            "Recorded attempts"
        );
        let registry = MetricsRegistry {
            sink: fuzzer.sink().metrics(),
            committer: committer.metrics(),
        };
        eprint!("{}", registry.format_prometheus());
    }

    let emitted = emitted?;
    tracing::info!(emitted, "Generation finished");

    Ok(())
}

/// Writes each attempt, then records its outcome, until `limit`, an interrupt
/// or a closed pipe. An attempt that could not be written is not recorded.
fn emit<W: Write>(
    attempts: impl Iterator<Item = AttemptRecord>,
    mut out: W,
    limit: u64,
    record: Option<RecordAs>,
    interrupted: &AtomicBool,
) -> Result<u64, BoxError> {
    let mut emitted = 0u64;
    for attempt in attempts {
        if emitted >= limit || interrupted.load(Ordering::Relaxed) {
            break;
        }
        match writeln!(out, "{}", attempt.value()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!(emitted, "Output closed");
                return Ok(emitted);
            }
            Err(e) => return Err(e.into()),
        }
        match record {
            Some(RecordAs::Success) => {
                attempt.mark_success()?;
            }
            Some(RecordAs::Failure) => {
                attempt.mark_failure()?;
            }
            None => {}
        }
        emitted += 1;
    }
    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(emitted),
    }
}

async fn tail(fuzzer: Fuzzer, config: StrandConfig, args: TailArgs) -> Result<(), BoxError> {
    let mut tail = fuzzer
        .tail()
        .batch_size(args.batch_size)
        .starting_after(args.after);
    if let Some(only) = args.only {
        tail = tail.only(only == RecordAs::Success);
    }

    loop {
        let rows = tail.poll()?;
        if !rows.is_empty() {
            let mut out = std::io::stdout().lock();
            for row in &rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
            out.flush()?;
            continue;
        }
        if args.once {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(config.tail_poll) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!(watermark = tail.watermark(), "Tail stopped");
    Ok(())
}

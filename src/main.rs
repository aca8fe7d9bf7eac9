//! wal2redis - forward change records to Redis
//!
//! Reads newline-delimited JSON change records (from a file or stdin) and
//! pushes each one through the Redis delivery sink. Configuration comes from
//! the environment, see `SinkConfig::from_env`.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use wal2redis::metrics::{FAILED_MESSAGE_METER, SUCCEEDED_MESSAGE_METER};
use wal2redis::{
    DeliveryMetrics, EventSink, MetricsRegistry, PositionCursor, RedisEventSink, RowRecord,
    SinkConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "wal2redis",
    about = "Deliver change records to a Redis list or channel",
    version = "0.1.0"
)]
struct Args {
    /// File of newline-delimited JSON change records (defaults to stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Seconds between delivery rate reports
    #[arg(long, default_value_t = 10)]
    report_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }

    let config = SinkConfig::from_env().context("invalid sink configuration")?;

    let registry = Arc::new(MetricsRegistry::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested, stopping after the current record");
            signal.store(true, Ordering::SeqCst);
        }
    });

    let reporter = tokio::spawn(report_rates(
        registry.clone(),
        Duration::from_secs(args.report_interval_secs.max(1)),
    ));

    let result = run_sink(config, args.input, registry.clone(), shutdown).await;
    reporter.abort();

    let snapshot = registry.snapshot();
    match &result {
        Ok(()) => info!("Sink finished: {}", serde_json::to_string(&snapshot)?),
        Err(e) => error!("Sink failed: {:#} ({})", e, serde_json::to_string(&snapshot)?),
    }
    result
}

async fn run_sink(
    config: SinkConfig,
    input: Option<PathBuf>,
    registry: Arc<MetricsRegistry>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    // The sink is synchronous, run it on a blocking thread
    tokio::task::spawn_blocking(move || -> Result<()> {
        let reader: Box<dyn BufRead> = match &input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
            )),
            None => Box::new(BufReader::new(io::stdin())),
        };

        let cursor = Arc::new(PositionCursor::new());
        let mut sink = RedisEventSink::connect(
            &config,
            cursor.clone(),
            DeliveryMetrics::register(&registry),
        )?;

        for (index, line) in reader.lines().enumerate() {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: RowRecord = serde_json::from_str(&line)
                .with_context(|| format!("invalid change record on line {}", index + 1))?;
            sink.push(&record)?;
        }

        let task = sink.stoppable_task();
        task.request_stop();
        task.await_stop(Duration::from_secs(5))?;

        match cursor.position() {
            Some(position) => info!("Resume position: {}", position),
            None => info!("No commit boundary reached, resume position unchanged"),
        }
        Ok(())
    })
    .await??;

    Ok(())
}

async fn report_rates(registry: Arc<MetricsRegistry>, every: Duration) {
    let succeeded = registry.meter(SUCCEEDED_MESSAGE_METER);
    let failed = registry.meter(FAILED_MESSAGE_METER);

    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        info!(
            "Delivered {} message(s), {} failed in the last {:?} (mean {:.1}/s)",
            succeeded.take_interval_count(),
            failed.take_interval_count(),
            every,
            succeeded.mean_rate()
        );
    }
}

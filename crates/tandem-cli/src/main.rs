//! tandem demo: runs a chain of randomized-timer tasks through a TaskQueue.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use eyre::{Context, Result, eyre};
use rand::Rng;
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

use tandem_core::{
    AlwaysContinue, Completion, QueueConfig, StopOnError, TaskBuilder, TaskError, TaskQueue,
    WeakTaskQueue,
};

/// Run a chain of simulated asynchronous tasks one at a time.
#[derive(Parser, Debug)]
#[command(name = "tandem", about = "Sequential task executor demo")]
struct Cli {
    /// Number of tasks to push before running
    #[arg(short = 'n', long, default_value_t = 5)]
    tasks: usize,

    /// Lower bound of each task's simulated delay
    #[arg(long, default_value_t = 50)]
    min_delay_ms: u64,

    /// Upper bound of each task's simulated delay
    #[arg(long, default_value_t = 250)]
    max_delay_ms: u64,

    /// Probability (0.0..=1.0) that a task reports an error
    #[arg(long, default_value_t = 0.0)]
    fail_rate: f64,

    /// Continue the chain after a failed task
    #[arg(long)]
    keep_going: bool,

    /// Re-push a failed task once at the tail of the queue
    #[arg(long, conflicts_with = "keep_going")]
    requeue_failed: bool,

    /// Path to a JSON queue config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Shared run state: what the tasks did so far.
#[derive(Debug, Default, Serialize)]
struct Progress {
    finished: Vec<String>,
    total_delay_ms: u64,
}

type Shared = Arc<Mutex<Progress>>;

#[derive(Debug, Clone, Copy)]
struct Timing {
    min_delay_ms: u64,
    max_delay_ms: u64,
    fail_rate: f64,
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

impl Progress {
    /// Record a finished task. A panic elsewhere while holding the lock does
    /// not lose the entry.
    fn record(progress: &Shared, label: String, delay_ms: u64) {
        let mut p = progress.lock().unwrap_or_else(PoisonError::into_inner);
        p.finished.push(label);
        p.total_delay_ms += delay_ms;
    }
}

/// A task that sleeps for a random delay, then succeeds with the delay or
/// fails with probability `fail_rate`. A retry never fails.
///
/// The task is left unlabeled so the queue names it `<prefix>-<id>`; the body
/// recovers that name from its completion handle.
fn simulated(labels: Arc<QueueConfig>, timing: Timing, retry: bool) -> TaskBuilder<Shared, u64> {
    TaskBuilder::new().body(move |progress: Shared, done: Completion<u64>| {
        let label = labels.label_for(done.task_id());
        // ThreadRng is not Send, so draw before spawning.
        let mut rng = rand::thread_rng();
        let delay_ms = rng.gen_range(timing.min_delay_ms..=timing.max_delay_ms);
        let fails = !retry && rng.gen_bool(timing.fail_rate);

        tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            if fails {
                done.fail(TaskError::new(format!("{label} gave up after {delay_ms}ms")));
                return;
            }
            Progress::record(&progress, label, delay_ms);
            done.succeed(delay_ms);
        });
    })
}

fn with_policy(
    builder: TaskBuilder<Shared, u64>,
    cli: &Cli,
    queue: WeakTaskQueue<Shared, u64>,
    labels: &Arc<QueueConfig>,
    timing: Timing,
) -> TaskBuilder<Shared, u64> {
    if cli.keep_going {
        return builder.policy(AlwaysContinue);
    }
    if !cli.requeue_failed {
        return builder.policy(StopOnError);
    }
    let labels = Arc::clone(labels);
    builder.policy_fn(move |_, outcome| {
        let Err(err) = outcome else {
            return true;
        };
        let Some(queue) = queue.upgrade() else {
            return false;
        };
        match queue.push(simulated(Arc::clone(&labels), timing, true)) {
            Ok(id) => {
                warn!(%err, retry = %labels.label_for(id), "requeueing failed task");
                true
            }
            Err(e) => {
                warn!(%e, "requeue rejected");
                false
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if cli.min_delay_ms > cli.max_delay_ms {
        return Err(eyre!("--min-delay-ms must not exceed --max-delay-ms"));
    }
    if !(0.0..=1.0).contains(&cli.fail_rate) {
        return Err(eyre!("--fail-rate must be within 0.0..=1.0"));
    }

    let config = match &cli.config {
        Some(path) => QueueConfig::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => QueueConfig::named("demo"),
    };
    info!(queue = %config.name, tasks = cli.tasks, "tandem: starting");

    let timing = Timing {
        min_delay_ms: cli.min_delay_ms,
        max_delay_ms: cli.max_delay_ms,
        fail_rate: cli.fail_rate,
    };
    let labels = Arc::new(config.clone());
    let queue: TaskQueue<Shared, u64> = TaskQueue::with_config(config);
    for _ in 0..cli.tasks {
        let builder = simulated(Arc::clone(&labels), timing, false);
        queue.push(with_policy(builder, &cli, queue.downgrade(), &labels, timing))?;
    }

    let progress: Shared = Arc::new(Mutex::new(Progress::default()));
    let report = queue
        .run_with(Arc::clone(&progress), |report| {
            info!(reason = %report.reason, "tandem: run finished");
        })
        .await?;

    let progress = progress.lock().unwrap_or_else(PoisonError::into_inner);
    let summary = serde_json::json!({
        "reason": report.reason,
        "error": report.error(),
        "result": report.result(),
        "progress": &*progress,
        "pending": queue.pending(),
        "counts": queue.counts(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

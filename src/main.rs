use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sandkit::config::{BackendKind, RuntimeSettings};
use sandkit::dispatcher::Dispatcher;
use sandkit::job::ExecutionConfig;
use sandkit::pool::WorkerPool;
use sandkit::queue::filesystem::FileSystemQueue;
use sandkit::queue::redis::RedisQueue;
use sandkit::queue::TaskQueue;
use sandkit::sandbox::SandboxDriver;
use sandkit::store::filesystem::FileSystemStore;
use sandkit::store::redis::RedisStore;
use sandkit::store::ResultStore;
use sandkit::worker::Worker;
use sandkit::RuntimeRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "sandkit", version, about = "Multi-language code execution sandbox")]
struct Cli {
    /// Filesystem data directory backend. Mutually exclusive with --redis-url.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Redis URL to use the broker backend instead of the filesystem one.
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Sentinel file whose presence tells a worker to stop claiming new
    /// jobs. Set by the pool when re-execing child workers; not meant to be
    /// passed by hand.
    #[arg(long, global = true, hide = true)]
    shutdown_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single worker loop in this process. This is what the pool
    /// re-execs as a child process; run it directly only for debugging.
    Worker,
    /// Start a foreground pool of worker processes and block until Ctrl-C.
    Pool {
        #[arg(long, default_value_t = num_cpus::get().max(1))]
        workers: usize,
    },
    /// Submit one job and print its result.
    Submit {
        #[arg(long)]
        language: String,
        /// Source file to read; reads stdin if omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        timeout: u64,
        /// Enqueue and poll instead of executing inline.
        #[arg(long)]
        r#async: bool,
    },
}

/// Builds `RuntimeSettings` from the flags common to every subcommand.
/// `worker_count` is only meaningful to `pool` but lives on the settings
/// struct regardless, per its own default.
fn settings_from_cli(cli: &Cli, worker_count: usize) -> RuntimeSettings {
    let backend = match &cli.redis_url {
        Some(url) => BackendKind::Broker { redis_url: url.clone() },
        None => BackendKind::Filesystem { data_dir: cli.data_dir.clone() },
    };
    RuntimeSettings { backend, worker_count }
}

async fn build_backend(backend: &BackendKind) -> Result<(Arc<dyn TaskQueue>, Arc<dyn ResultStore>)> {
    match backend {
        BackendKind::Broker { redis_url } => {
            let store: Arc<dyn ResultStore> = Arc::new(RedisStore::new(redis_url)?);
            let queue: Arc<dyn TaskQueue> = Arc::new(RedisQueue::new(redis_url, store.clone())?);
            Ok((queue, store))
        }
        BackendKind::Filesystem { data_dir } => {
            let store: Arc<dyn ResultStore> = Arc::new(FileSystemStore::new(data_dir).await?);
            let queue: Arc<dyn TaskQueue> =
                Arc::new(FileSystemQueue::new(data_dir.clone(), store.clone()).await?);
            Ok((queue, store))
        }
    }
}

fn backend_args(backend: &BackendKind) -> Vec<String> {
    match backend {
        BackendKind::Broker { redis_url } => vec!["--redis-url".to_string(), redis_url.clone()],
        BackendKind::Filesystem { data_dir } => {
            vec!["--data-dir".to_string(), data_dir.to_string_lossy().to_string()]
        }
    }
}

/// Dispatches before entering an async runtime so a `worker` invocation gets
/// the single-threaded scheduler its claim-execute loop is specified to run
/// on, while `pool`/`submit` keep the default multi-threaded one.
fn main() -> Result<()> {
    sandkit::logging::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Worker => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build the worker's current-thread runtime")?
            .block_on(run_worker(&cli)),
        Commands::Pool { workers } => tokio::runtime::Runtime::new()
            .context("failed to build the pool's runtime")?
            .block_on(run_pool(&cli, *workers)),
        Commands::Submit { language, file, timeout, r#async } => tokio::runtime::Runtime::new()
            .context("failed to build the submit runtime")?
            .block_on(run_submit(&cli, language, file.as_ref(), *timeout, *r#async)),
    }
}

async fn run_worker(cli: &Cli) -> Result<()> {
    let settings = settings_from_cli(cli, 1);
    let (queue, store) = build_backend(&settings.backend).await?;
    let sandbox = Arc::new(SandboxDriver::new().await.context("failed to connect to the sandbox backend")?);
    let registry = Arc::new(RuntimeRegistry::with_defaults(&sandbox).await);

    let worker = Worker::new(queue, store, registry, sandbox);
    let running = Arc::new(AtomicBool::new(true));

    let shutdown = running.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.store(false, Ordering::Relaxed);
    });

    worker.run(running, cli.shutdown_file.clone()).await;
    Ok(())
}

async fn run_pool(cli: &Cli, workers: usize) -> Result<()> {
    let settings = settings_from_cli(cli, workers);
    let (queue, store) = build_backend(&settings.backend).await?;
    let args = backend_args(&settings.backend);
    let mut pool = WorkerPool::new(args, queue, store)?;

    pool.start(settings.worker_count).await?;
    info!(workers = settings.worker_count, "worker pool running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    pool.stop(true, Duration::from_secs(10)).await;
    Ok(())
}

async fn run_submit(
    cli: &Cli,
    language: &str,
    file: Option<&PathBuf>,
    timeout_secs: u64,
    is_async: bool,
) -> Result<()> {
    let code = match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?,
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?,
    };

    let sandbox = Arc::new(SandboxDriver::new().await.context("failed to connect to the sandbox backend")?);
    let registry = Arc::new(RuntimeRegistry::with_defaults(&sandbox).await);
    let mut dispatcher = Dispatcher::new(registry, sandbox);

    let config = ExecutionConfig {
        timeout_secs,
        ..ExecutionConfig::default()
    };

    if is_async {
        let settings = settings_from_cli(cli, 1);
        let (queue, store) = build_backend(&settings.backend).await?;
        dispatcher = dispatcher.with_async_backend(queue, store);
        let id = dispatcher.submit_async(&code, language, config).await?;
        println!("{id}");
    } else {
        let result = dispatcher.execute_sync(&code, language, config).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use mapreduce_worker::{
    config::{DEFAULT_SOCKET, DEFAULT_WAIT_MS},
    map_reduce_apps::{Indexer, WordCount},
    rpc::RpcClient,
    MapReduceApp, Worker, WorkerConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum App {
    Wc,
    Indexer,
}

/// MapReduce worker: pulls map and reduce tasks from the coordinator until the job is done.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Coordinator socket
    #[arg(long, default_value = DEFAULT_SOCKET)]
    socket: PathBuf,

    /// Directory for intermediate and output files
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Map/reduce application to run
    #[arg(long, value_enum, default_value_t = App::Wc)]
    app: App,

    /// Milliseconds to sleep when there is no work yet
    #[arg(long, default_value_t = DEFAULT_WAIT_MS)]
    wait_ms: u64,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!("{:?}", args);

    std::fs::create_dir_all(&args.work_dir)
        .with_context(|| format!("failed to create work dir {:?}", args.work_dir))?;

    let app: Arc<dyn MapReduceApp> = match args.app {
        App::Wc => Arc::new(WordCount::new()),
        App::Indexer => Arc::new(Indexer::new()),
    };
    let config = WorkerConfig {
        socket: args.socket,
        work_dir: args.work_dir,
        wait_interval: Duration::from_millis(args.wait_ms),
    };

    let client = RpcClient::new(config.socket.clone());
    let mut worker = Worker::new(client, app, config);
    // any error here leaves the current task unreported for the coordinator to reassign
    if let Err(e) = worker.run().await {
        error!("worker {} stopping: {}", worker.id, e);
        return Err(e).context("worker aborted");
    }
    Ok(())
}

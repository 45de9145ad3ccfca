use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use newswire_common::Config;
use newswire_store::Store;
use newswire_worker::{Runtime, Worker};

/// How long cooperative shutdown may stall before the watchdog hard-exits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Newswire scrape worker")]
struct Args {
    /// Resume jobs from previous sessions instead of cancelling them on boot.
    #[arg(long)]
    resume_jobs: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    info!("Newswire worker starting...");

    let config = match Config::worker_from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Missing required configuration");
            std::process::exit(1);
        }
    };
    config.log_redacted();

    let store = match Store::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to connect to Postgres");
            std::process::exit(1);
        }
    };

    if let Err(e) = store.migrate().await {
        error!(error = %e, "Migration failed");
        std::process::exit(1);
    }

    // Startup sweep: stale QUEUED/IN_PROGRESS rows from a previous worker
    // would otherwise sit in the queue forever.
    if args.resume_jobs {
        info!("Resuming jobs from previous sessions (--resume-jobs)");
    } else {
        match store.cancel_stale_jobs().await {
            Ok(0) => info!("No stale jobs to clean up"),
            Ok(count) => info!(count, "Cancelled stale jobs from previous sessions"),
            Err(e) => warn!(error = %e, "Stale-job cleanup failed, continuing startup"),
        }
    }

    let runtime = Arc::new(Runtime::new(config, store));
    let running = Arc::new(AtomicBool::new(true));

    let worker = Worker::new(runtime, running.clone());
    let mut worker_task = tokio::spawn(worker.run());

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            running.store(false, Ordering::SeqCst);

            // Watchdog: if cooperative shutdown stalls, exit hard.
            tokio::spawn(async {
                tokio::time::sleep(SHUTDOWN_GRACE).await;
                warn!("Force exiting after shutdown timeout");
                std::process::exit(1);
            });

            worker_task.abort();
            let _ = worker_task.await;
        }
        result = &mut worker_task => {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    error!(error = %e, "Worker task failed");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("Worker stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install interrupt handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

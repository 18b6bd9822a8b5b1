//! `wenda`: weekly agenda in the terminal.
//!
//! Reads one shell command per line from stdin and prints the selected
//! week after each change. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/wenda/config.toml`).
//!
//! ```bash
//! # Offline, tasks kept in memory
//! cargo run --bin wenda
//!
//! # Against a task service
//! cargo run --bin wenda -- --service-url https://agenda.example.com/api --user alice
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use wenda::config::{CliArgs, ClientConfig};
use wenda::gateway::http::HttpGateway;
use wenda::gateway::memory::InMemoryGateway;
use wenda::shell::{HELP, Reply, Shell};
use wenda::store::AgendaStore;
use wenda::sync::{self, SyncOutcome, SyncRequest};

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load configuration: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("wenda starting");

    let (sync_tx, sync_rx) = start_sync(&config);
    let store = AgendaStore::new(sync_tx.clone(), config.store_options());
    let result = run_shell(Shell::new(store), sync_rx).await;

    let _ = sync_tx.send(SyncRequest::Shutdown).await;
    tracing::info!("wenda exiting");
    result
}

/// Initialize file-based logging.
///
/// Logs go to a file so they never interleave with shell output. Returns a
/// [`WorkerGuard`] that must be held until shutdown to flush buffered
/// entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("wenda.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Spawns the sync worker against the configured service, or against an
/// in-memory service when none is configured or the client cannot be built.
fn start_sync(config: &ClientConfig) -> (mpsc::Sender<SyncRequest>, mpsc::Receiver<SyncOutcome>) {
    if let Some(url) = config.service_url.clone() {
        match HttpGateway::new(url, config.request_timeout) {
            Ok(gateway) => {
                tracing::info!(service = %gateway.base(), user = %config.user, "using task service");
                return sync::spawn_sync(
                    Arc::new(gateway),
                    config.user.clone(),
                    config.channel_capacity,
                );
            }
            Err(e) => {
                eprintln!("Warning: {e}; running offline");
                tracing::warn!(error = %e, "task service unavailable, running offline");
            }
        }
    }
    println!("offline mode: tasks are kept in memory");
    sync::spawn_sync(
        Arc::new(InMemoryGateway::new()),
        config.user.clone(),
        config.channel_capacity,
    )
}

/// Main loop: stdin lines and sync outcomes, one at a time.
async fn run_shell(mut shell: Shell, mut outcomes: mpsc::Receiver<SyncOutcome>) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Err(e) = shell.store_mut().request_refresh() {
        println!("error: {e}");
    }
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match shell.handle_line(&line) {
                    Ok(Reply::Text(text)) => println!("{text}"),
                    Ok(Reply::Quiet) => {}
                    Ok(Reply::Quit) => break,
                    Err(e) => println!("error: {e}"),
                }
            }
            Some(outcome) = outcomes.recv() => {
                let refreshed = matches!(outcome, SyncOutcome::Fetched(Ok(_)));
                match shell.store_mut().resolve(outcome) {
                    Err(e) => println!("error: {e}"),
                    Ok(()) if refreshed => {
                        if let Reply::Text(text) = shell.render() {
                            println!("{text}");
                        }
                    }
                    Ok(()) => {}
                }
            }
        }
    }

    Ok(())
}

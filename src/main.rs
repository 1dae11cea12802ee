//! snapcache - A bounded key/value cache
//!
//! Reads commands from stdin, one per line, and answers on stdout:
//!
//! ```text
//! put <key> <value>   store a value
//! get <key>           print the value or "(absent)"
//! del <key>           remove and print the value or "(absent)"
//! keys                list keys, most recently used first
//! stats               print hit/miss/eviction counters
//! flush               write a snapshot now
//! quit                write a final snapshot and exit
//! ```

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapcache::{spawn_flush_task, Config, PersistMode, PersistentCache};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging (stderr)
/// 2. Load configuration from environment variables
/// 3. Open the cache, restoring the last snapshot if there is one
/// 4. Start the background flush task in interval mode
/// 5. Serve stdin commands until EOF, `quit`, SIGINT or SIGTERM
/// 6. Write a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting snapcache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, snapshot_path={}, persist_mode={:?}",
        config.capacity,
        config.snapshot_path.display(),
        config.persist_mode
    );

    let cache = Arc::new(PersistentCache::open(&config).context("failed to open cache")?);
    info!(entries = cache.len(), "Cache ready");

    let flush_handle = match config.persist_mode {
        PersistMode::Interval(interval) => Some(spawn_flush_task(cache.clone(), interval)),
        _ => None,
    };

    let lines = spawn_line_reader(io::stdin()).context("failed to start stdin reader")?;

    tokio::select! {
        result = serve_commands(cache.clone(), lines) => {
            if let Err(e) = result {
                error!(error = %e, "Command loop failed");
            }
        }
        _ = shutdown_signal() => {}
    }

    if let Some(handle) = flush_handle {
        handle.abort();
        warn!("Flush task aborted");
    }

    tokio::task::spawn_blocking(move || cache.close())
        .await
        .context("final snapshot task failed")?
        .context("failed to write final snapshot")?;
    info!("Shutdown complete");
    Ok(())
}

/// Parsed stdin command.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Get(u32),
    Put(u32, u32),
    Delete(u32),
    Keys,
    Stats,
    Flush,
    Quit,
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        bail!("empty command");
    };
    let mut arg = |name: &str| -> anyhow::Result<u32> {
        let raw = parts
            .next()
            .with_context(|| format!("missing <{}>", name))?;
        raw.parse()
            .with_context(|| format!("<{}> must be an unsigned 32-bit integer", name))
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "get" => Command::Get(arg("key")?),
        "put" | "set" => Command::Put(arg("key")?, arg("value")?),
        "del" | "delete" => Command::Delete(arg("key")?),
        "keys" => Command::Keys,
        "stats" => Command::Stats,
        "flush" => Command::Flush,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command: {}", other),
    };
    Ok(command)
}

/// Reads lines on a dedicated thread and forwards them to the returned
/// channel.
///
/// The thread is detached from the runtime; a read blocked on an idle
/// terminal does not delay exit.
fn spawn_line_reader<R>(reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in BufReader::new(reader).lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Runs commands until the input ends or `quit`.
///
/// Cache calls lock and may write a snapshot, so each one runs on the
/// blocking pool.
async fn serve_commands(
    cache: Arc<PersistentCache>,
    mut lines: mpsc::Receiver<io::Result<String>>,
) -> anyhow::Result<()> {
    while let Some(line) = lines.recv().await {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("error: {:#}", e);
                continue;
            }
        };

        let cache = cache.clone();
        let reply = tokio::task::spawn_blocking(move || execute(&cache, command))
            .await
            .context("command task failed")?;
        match reply {
            Some(reply) => println!("{}", reply),
            None => break,
        }
    }
    Ok(())
}

/// Applies one command and returns the reply line, `None` for `quit`.
fn execute(cache: &PersistentCache, command: Command) -> Option<String> {
    let reply = match command {
        Command::Get(key) => format_value(cache.get(key)),
        Command::Put(key, value) => {
            cache.put(key, value);
            "ok".to_string()
        }
        Command::Delete(key) => format_value(cache.delete(key)),
        Command::Keys => {
            let keys: Vec<String> = cache.keys().iter().map(u32::to_string).collect();
            keys.join(" ")
        }
        Command::Stats => {
            let stats = cache.stats();
            format!(
                "entries={} hits={} misses={} evictions={} expirations={} hit_rate={:.2}",
                stats.total_entries,
                stats.hits,
                stats.misses,
                stats.evictions,
                stats.expirations,
                stats.hit_rate()
            )
        }
        Command::Flush => match cache.flush() {
            Ok(()) => "ok".to_string(),
            Err(e) => format!("error: {}", e),
        },
        Command::Quit => return None,
    };
    Some(reply)
}

fn format_value(value: Option<u32>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(absent)".to_string(),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferry_core::impls::{FileStore, HttpProbe, HttpSubmitter, ManualConnectivity, ProbeHandle};
use ferry_core::ports::Connectivity;
use ferry_core::{
    AutoSync, DrainReport, FerryBuilder, FerryConfig, QueueItem, QueueManager, SubmitOutcome,
    SyncKind,
};

#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(about = "Offline outbox: queue records locally, deliver them when online", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/ferry/ferry.toml)
    #[arg(long, env = "FERRY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides remote.base_url
    #[arg(long, env = "FERRY_API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token, overrides remote.token
    #[arg(long, env = "FERRY_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Where the queue is stored (default: <data dir>/ferry)
    #[arg(long, env = "FERRY_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Treat the network as unavailable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a record for later delivery
    Enqueue {
        /// quiz-result, game-result or generic
        kind: SyncKind,
        /// Payload as JSON
        payload: String,
    },
    /// Send a record now, or queue it if that is not possible
    Submit {
        kind: SyncKind,
        payload: String,
    },
    /// Show queued records, oldest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show queue counters
    Stats,
    /// Try to deliver everything that is queued
    Drain,
    /// Drop every queued record
    Clear,
    /// Drop records that reached the retry limit
    ClearExhausted,
    /// Deliver automatically whenever the backend becomes reachable
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = load_config(&cli)?;
    let (connectivity, probe) = pick_connectivity(&cli, &config)?;
    let manager = Arc::new(build_manager(&cli, &config, connectivity).await?);

    match cli.command {
        Command::Enqueue { kind, payload } => {
            let payload = parse_payload(&payload)?;
            let id = manager
                .enqueue(kind, payload)
                .await
                .context("record could not be stored")?;
            println!("{id}");
        }
        Command::Submit { kind, payload } => {
            let payload = parse_payload(&payload)?;
            match manager.submit(kind, payload).await {
                SubmitOutcome::Sent => println!("sent"),
                SubmitOutcome::Queued(id) => println!("queued {id}"),
                SubmitOutcome::Lost => anyhow::bail!("record could not be sent or stored"),
            }
        }
        Command::List { json } => {
            let items = manager.list().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_items(&items, manager.policy().max_retries);
            }
        }
        Command::Stats => {
            let stats = manager.stats().await;
            println!("pending:   {}", stats.pending);
            println!("retrying:  {}", stats.retrying);
            println!("exhausted: {}", stats.exhausted);
        }
        Command::Drain => match manager.drain().await {
            DrainReport::Completed(summary) => println!(
                "attempted {}, succeeded {}, failed {}, skipped {}",
                summary.attempted, summary.succeeded, summary.failed, summary.skipped
            ),
            DrainReport::Offline => println!("offline; nothing sent"),
            DrainReport::AlreadyRunning => println!("a drain is already running"),
        },
        Command::Clear => {
            manager.clear().await;
            println!("cleared");
        }
        Command::ClearExhausted => {
            let removed = manager.clear_exhausted().await;
            println!("removed {removed}");
        }
        Command::Watch => watch(manager, &config, probe).await?,
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<FerryConfig> {
    let mut config = match &cli.config {
        Some(path) => FerryConfig::load(path)?,
        None => match dirs::config_dir() {
            Some(dir) => FerryConfig::load_or_default(&dir.join("ferry").join("ferry.toml"))?,
            None => FerryConfig::default(),
        },
    };

    if let Some(url) = &cli.api_url {
        config.remote.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.remote.token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|d| d.join("ferry"))
        .context("no data directory; pass --data-dir or set FERRY_DATA_DIR")
}

/// `--offline` pins the state; otherwise reachability of the backend decides.
fn pick_connectivity(
    cli: &Cli,
    config: &FerryConfig,
) -> Result<(Arc<dyn Connectivity>, Option<Arc<HttpProbe>>)> {
    if cli.offline {
        let pinned: Arc<dyn Connectivity> = Arc::new(ManualConnectivity::new(false));
        return Ok((pinned, None));
    }
    let probe = Arc::new(HttpProbe::new(config.probe_url(), config.request_timeout())?);
    let connectivity: Arc<dyn Connectivity> = probe.clone();
    Ok((connectivity, Some(probe)))
}

async fn build_manager(
    cli: &Cli,
    config: &FerryConfig,
    connectivity: Arc<dyn Connectivity>,
) -> Result<QueueManager> {
    let dir = data_dir(cli)?;
    let store = FileStore::open(dir.clone())
        .await
        .with_context(|| format!("failed to open queue storage in {}", dir.display()))?;

    let mut submitter = HttpSubmitter::new(&config.remote.base_url, config.request_timeout())?;
    if let Some(token) = &config.remote.token {
        submitter = submitter.with_token(token.clone());
    }

    let manager = FerryBuilder::from_config(config)
        .store(Arc::new(store))
        .submitter(Arc::new(submitter))
        .connectivity(connectivity)
        .build()?;
    Ok(manager)
}

fn parse_payload(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("payload must be valid JSON")
}

fn print_items(items: &[QueueItem], max_retries: u32) {
    if items.is_empty() {
        println!("queue is empty");
        return;
    }
    for item in items {
        let state = if item.is_exhausted(max_retries) {
            "exhausted"
        } else if item.is_retrying() {
            "retrying"
        } else {
            "pending"
        };
        println!(
            "{}  {:<12}  {:<9}  retries {}/{}  {}",
            item.id,
            item.kind.label(),
            state,
            item.retry_count,
            max_retries,
            item.enqueued_at.to_rfc3339(),
        );
        if let Some(error) = &item.last_error {
            println!("    last error: {error}");
        }
    }
}

async fn watch(
    manager: Arc<QueueManager>,
    config: &FerryConfig,
    probe: Option<Arc<HttpProbe>>,
) -> Result<()> {
    let _probe_task: Option<ProbeHandle> = probe.map(|p| p.spawn(config.probe_interval()));
    let auto = AutoSync::spawn(manager, config.retry_interval());
    let mut status = auto.status();
    info!("watching; press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = *status.borrow_and_update();
                println!(
                    "{}{}  pending {}  retrying {}  exhausted {}",
                    if s.online { "online" } else { "offline" },
                    if s.syncing { " (syncing)" } else { "" },
                    s.stats.pending,
                    s.stats.retrying,
                    s.stats.exhausted,
                );
            }
        }
    }

    auto.shutdown_and_join().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_kind_slugs_and_global_flags() {
        let cli = Cli::try_parse_from([
            "ferry",
            "submit",
            "quiz-result",
            r#"{"quizId":"q1"}"#,
            "--offline",
        ])
        .unwrap();
        assert!(cli.offline);
        assert!(matches!(
            cli.command,
            Command::Submit { kind: SyncKind::QuizResult, .. }
        ));

        assert!(Cli::try_parse_from(["ferry", "enqueue", "homework", "{}"]).is_err());
    }

    #[test]
    fn payload_must_be_json() {
        assert!(parse_payload(r#"{"score": 3}"#).is_ok());
        assert!(parse_payload("score=3").is_err());
    }
}

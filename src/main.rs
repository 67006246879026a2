//! nav-router CLI
//!
//! Loads a route table from a TOML file and drives the router from the
//! command line, printing results as JSON.
//!
//! ```text
//!   --config routes.toml
//!        │
//!        ▼
//!   ┌──────────┐   resolve <target>      ┌─────────┐
//!   │  loader  │────────────────────────▶│ matcher │──▶ Route (JSON)
//!   │+validate │   navigate <a> <b> ...  ├─────────┤
//!   └────┬─────┘────────────────────────▶│ engine  │──▶ outcome per step
//!        │         routes                └─────────┘
//!        │────────────────────────────────────────────▶ record listing
//!        │         watch
//!        └──▶ watcher ──▶ Router::follow_config ──────▶ reload log
//! ```

use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use nav_router::config::watcher::ConfigWatcher;
use nav_router::config::{load_config, RouterConfig};
use nav_router::observability::logging;
use nav_router::routing::RecordSummary;
use nav_router::{HistoryBackend, RawLocation, Router};

#[derive(Parser)]
#[command(name = "nav-router")]
#[command(about = "Resolve and navigate a route table", long_about = None)]
struct Cli {
    /// Route table (TOML). Without it the router starts empty.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a target without navigating
    Resolve {
        target: String,
        /// Route to resolve relative targets against
        #[arg(long)]
        from: Option<String>,
        /// Resolve relative paths below the current one
        #[arg(long)]
        append: bool,
    },
    /// Navigate through the given targets in order
    Navigate {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// List registered records in match priority order
    Routes,
    /// Watch the config file and register new routes as they appear
    Watch,
}

/// History that only records what the router asked for.
#[derive(Default)]
struct MemoryHistory {
    entries: Mutex<Vec<String>>,
}

impl HistoryBackend for MemoryHistory {
    fn current_location(&self) -> String {
        self.entries.lock().last().cloned().unwrap_or_else(|| "/".to_string())
    }

    fn go(&self, n: i32) {
        tracing::info!(n, "History traversal is not supported by the CLI");
    }

    fn push_url(&self, full_path: &str) {
        self.entries.lock().push(full_path.to_string());
    }

    fn replace_url(&self, full_path: &str) {
        let mut entries = self.entries.lock();
        entries.pop();
        entries.push(full_path.to_string());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    logging::init(&config.observability);

    let router = Router::from_config(&config)?;
    tracing::info!(
        records = router.routes().len(),
        sensitive = config.matching.sensitive,
        strict = config.matching.strict,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Resolve { target, from, append } => {
            if let Some(from) = from {
                if let Err(e) = router.navigate(from.as_str()).await {
                    tracing::warn!(error = %e, "Could not establish the starting route");
                }
            }
            let resolved = router.resolve(RawLocation::from(target), append);
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Commands::Navigate { targets } => {
            let history = Arc::new(MemoryHistory::default());
            router.set_history(history.clone());
            for target in targets {
                let outcome = match router.push(target.as_str()).await {
                    Ok(route) => json!({ "target": target, "committed": route.as_ref() }),
                    Err(failure) => json!({
                        "target": target,
                        "failure": failure.label(),
                        "reason": failure.to_string(),
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            let entries = history.entries.lock().clone();
            println!("{}", serde_json::to_string_pretty(&json!({ "history": entries }))?);
        }
        Commands::Routes => {
            let records: Vec<RecordSummary> = router
                .routes()
                .iter()
                .map(|record| RecordSummary::from(record.as_ref()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Watch => {
            let Some(path) = cli.config else {
                return Err("watch requires --config".into());
            };
            let (_handle, updates) = ConfigWatcher::new(&path).spawn()?;
            tokio::select! {
                _ = router.follow_config(updates) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                }
            }
        }
    }

    Ok(())
}

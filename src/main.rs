//! `topic-router`: register static routes from a TOML file and dispatch
//! topics against them.
//!
//! ```text
//! topic-router --config routes.toml routes
//! topic-router --config routes.toml publish user.42.login --payload '{"ok":true}'
//! topic-router --config routes.toml publish user.42.login --dry-run
//! topic-router --config routes.toml listen --watch   # "<topic> [payload]" per stdin line
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use topic_router::config::{load_config, AppConfig};
use topic_router::config::watcher::ConfigWatcher;
use topic_router::lifecycle::Shutdown;
use topic_router::observability::{logging, LogTracer, Tracer};
use topic_router::registry::{self, StaticRoutes};
use topic_router::routing::{Context, Subscription};

#[derive(Parser)]
#[command(name = "topic-router")]
#[command(about = "Hierarchical topic subscription router", long_about = None)]
struct Cli {
    /// Route configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source name attached to dispatched messages.
    #[arg(short, long, default_value = "cli")]
    source: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered patterns
    Routes,
    /// Dispatch a single topic
    Publish {
        topic: String,
        #[arg(short, long, default_value = "")]
        payload: String,
        /// Print matched routes and captures instead of delivering
        #[arg(long)]
        dry_run: bool,
    },
    /// Dispatch "<topic> [payload]" lines read from stdin
    Listen {
        /// Reload routes when the config file changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    logging::init_logging(&config.observability)?;

    tracing::info!(
        separator = %config.router.separator,
        routes = config.routes.len(),
        "topic-router v0.1.0 starting"
    );

    if let Commands::Publish {
        topic,
        dry_run: true,
        ..
    } = &cli.command
    {
        let outcome = registry::dry_run(&config.router, &config.routes, topic, &cli.source)?;
        for matched in &outcome.matches {
            println!("{}", serde_json::to_string(matched)?);
        }
        for diagnostic in &outcome.diagnostics {
            println!("{}", serde_json::json!({ "diagnostic": diagnostic }));
        }
        tracing::info!(
            topic = %topic,
            matches = outcome.matches.len(),
            skipped_routes = ?outcome.failed,
            "Dry run complete"
        );
        return Ok(());
    }

    let tracer: Arc<dyn Tracer> = Arc::new(LogTracer);
    let router = Subscription::with_config(config.router.clone(), Some(tracer))?;
    let mut static_routes = StaticRoutes::new();
    let summary = static_routes.reconcile(&router, &config.routes);
    if !summary.failed.is_empty() {
        tracing::warn!(failed = ?summary.failed, "Some routes could not be registered");
    }

    match cli.command {
        Commands::Routes => {
            for route in router.routes() {
                println!("{route}");
            }
        }
        Commands::Publish { topic, payload, .. } => {
            let report = router.dispatch(&Context::new(), &topic, payload.into_bytes(), &cli.source);
            tracing::info!(
                topic = %topic,
                delivered = report.delivered,
                failed = report.failed,
                "Published"
            );
        }
        Commands::Listen { watch } => {
            listen(&router, &mut static_routes, &cli, watch).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn listen(
    router: &Subscription,
    static_routes: &mut StaticRoutes,
    cli: &Cli,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_watcher, mut config_updates) = match (&cli.config, watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(rx))
        }
        (None, true) => {
            tracing::warn!("--watch requires --config; route reload disabled");
            (None, None)
        }
        _ => (None, None),
    };

    let shutdown = Shutdown::new();
    let _ctrl_c = shutdown.trigger_on_ctrl_c();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    shutdown.trigger();
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let (topic, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
                router.handle(&Context::new(), topic, payload.trim().as_bytes(), &cli.source);
            }
            Some(new_config) = recv_update(&mut config_updates) => {
                if new_config.router != *router.config() {
                    tracing::warn!("Router settings changed; restart to apply them");
                }
                let summary = static_routes.reconcile(router, &new_config.routes);
                tracing::info!(
                    added = ?summary.added,
                    removed = ?summary.removed,
                    failed = ?summary.failed,
                    "Routes reloaded"
                );
            }
            _ = shutdown.wait() => {
                tracing::info!("Stopping listener");
                break;
            }
        }
    }
    Ok(())
}

async fn recv_update(
    rx: &mut Option<tokio::sync::mpsc::UnboundedReceiver<AppConfig>>,
) -> Option<AppConfig> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

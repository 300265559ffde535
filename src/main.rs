//! Taproot CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "taproot")]
#[command(about = "Codebase knowledge graph: dependency search and impact analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph in the background and serve queries over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Seconds between periodic rebuilds (0 disables them)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Build the graph, persist it and exit
    Index,
    /// Keyword search over the graph, printed as JSON
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Blast radius of a file, printed as JSON
    Impact {
        /// Repository-relative path of the node
        path: String,

        /// incoming, outgoing or both
        #[arg(long, default_value = "incoming")]
        direction: String,

        #[arg(long)]
        max_depth: Option<u32>,

        /// Only follow these relations (repeatable)
        #[arg(long = "relation")]
        relations: Vec<String>,
    },
    /// Clear the cache
    Clear,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taproot={level},tower_http={level}")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env next to the repository first, then the working directory
    dotenvy::from_path(cli.root.join(".env")).ok();
    dotenvy::dotenv().ok();

    init_logging(cli.verbose);

    tracing::debug!("Taproot v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Repository root: {}", cli.root.display());

    let mut settings = Settings::load(&cli.root)?;

    match cli.command {
        Commands::Serve { port, host, interval } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(interval) = interval {
                settings.rebuild.interval_secs = interval;
            }
            commands::serve(cli.root, settings).await
        }
        Commands::Index => commands::index(cli.root, settings).await,
        Commands::Search { terms, limit, offset } => {
            commands::search(cli.root, settings, terms.join(" "), limit, offset).await
        }
        Commands::Impact { path, direction, max_depth, relations } => {
            commands::impact(cli.root, settings, path, direction, max_depth, relations).await
        }
        Commands::Clear => commands::clear(cli.root),
    }
}

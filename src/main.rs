//! concept_graph CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use concept_graph::analytics::CommunityStrategy;
use concept_graph::commands::{analyze, extract, merge, paths};
use concept_graph::merge::MergeMode;
use concept_graph::{commands, metrics, Config};
use tracing::warn;

#[derive(Parser)]
#[command(name = "concept_graph")]
#[command(about = "Consolidate concept extractions into one graph and analyse it", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Config file (defaults to config.yml, then ../config.yml)
    #[arg(long, env = "CONCEPT_GRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract concepts from text, CSV and partial-graph files and consolidate them
    Extract {
        /// Files or directories to read
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output document (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stored graph document to merge into
        #[arg(long)]
        existing: Option<PathBuf>,

        /// append | update | replace
        #[arg(long, default_value = "update")]
        mode: MergeMode,

        /// Request id for the result cache
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Merge partial graphs or graph documents
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        existing: Option<PathBuf>,

        #[arg(long, default_value = "update")]
        mode: MergeMode,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Structural report: metrics, centrality, communities, gaps
    Analyze {
        input: PathBuf,

        /// type | components
        #[arg(long, default_value = "type")]
        strategy: CommunityStrategy,

        /// Entries per centrality list
        #[arg(long)]
        top: Option<usize>,

        /// BFS depth bound for closeness
        #[arg(long)]
        max_depth: Option<usize>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Paths between two concepts
    Paths {
        input: PathBuf,

        /// Start node id or label
        from: String,

        /// End node id or label
        to: String,

        /// Enumerate every simple path instead of one shortest path
        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long)]
        max_hops: Option<usize>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Extract { .. } => "extract",
            Commands::Merge { .. } => "merge",
            Commands::Analyze { .. } => "analyze",
            Commands::Paths { .. } => "paths",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("concept_graph=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new(),
    };

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command, &config).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Extract {
            inputs,
            output,
            existing,
            mode,
            request_id,
        } => {
            commands::extract_run(
                extract::ExtractArgs {
                    inputs,
                    output,
                    existing,
                    mode,
                    request_id,
                },
                config,
            )
            .await?;
        }
        Commands::Merge {
            inputs,
            existing,
            mode,
            output,
        } => {
            commands::merge_run(
                merge::MergeArgs {
                    inputs,
                    existing,
                    mode,
                    output,
                },
                config,
            )?;
        }
        Commands::Analyze {
            input,
            strategy,
            top,
            max_depth,
            output,
        } => {
            commands::analyze_run(
                analyze::AnalyzeArgs {
                    input,
                    strategy,
                    top,
                    max_depth,
                    output,
                },
                config,
            )?;
        }
        Commands::Paths {
            input,
            from,
            to,
            all,
            max_hops,
            output,
        } => {
            commands::paths_run(
                paths::PathsArgs {
                    input,
                    from,
                    to,
                    all,
                    max_hops,
                    output,
                },
                config,
            )?;
        }
    }
    Ok(())
}

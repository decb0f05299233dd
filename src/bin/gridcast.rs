use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use gridcast::{AppConfig, AppState, WorkerManager};

#[derive(Parser, Debug)]
#[command(name = "gridcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP control plane.
    Serve(ServeArgs),
    /// Resolve the configuration and print the pipeline description.
    Graph(GraphArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Pipeline configuration YAML.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// Where client SDP offers are persisted.
    #[arg(long, default_value = "client_offer.sdp")]
    offer_path: PathBuf,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Pipeline configuration YAML.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured composite selection (repeatable).
    #[arg(long = "composite", value_name = "NAME")]
    composite: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Graph(args) => cmd_graph(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    // Feeds, composite and transport settings are re-read per request; the
    // worker settings bind the manager for the lifetime of the process.
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;

    let manager = Arc::new(WorkerManager::new(
        config.worker.launcher.clone(),
        Duration::from_secs(config.worker.stop_timeout_secs),
    ));
    let state = AppState {
        manager,
        config_path: args.config.clone(),
        offer_path: args.offer_path.clone(),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(args.listen)
            .await
            .with_context(|| format!("bind '{}'", args.listen))?;
        tracing::info!(listen = %args.listen, "control api listening");
        axum::serve(listener, gridcast::server::router(state))
            .await
            .context("serve control api")?;
        Ok(())
    })
}

fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;

    let selection = if args.composite.is_empty() {
        config.composite.clone()
    } else {
        args.composite.clone()
    };

    let planned = gridcast::layout::plan(&config.feeds, &selection)?;
    let graph = gridcast::graph::build(&planned, &config.webrtc)?;
    println!("{}", graph.description());
    Ok(())
}

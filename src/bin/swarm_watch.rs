//! SwarmLambda cluster watcher
//!
//! Terminal front-end for the topology engine.
//!
//! # Usage
//!
//! ```bash
//! # Follow the live topology
//! swarm_watch watch
//!
//! # One-shot view of the reconciled graph as JSON
//! swarm_watch --gateway http://10.0.0.2:8787 snapshot -o json
//!
//! # Inspect one node, or keep it open while watching
//! swarm_watch node 3f9a0c1d2e4b
//! swarm_watch watch --open 3f9a0c1d2e4b
//!
//! # Deploy and invoke a function (both re-poll the cluster afterwards)
//! swarm_watch deploy --name hello --handler index.handler --file index.js
//! swarm_watch invoke --name hello --payload '{"name":"world"}'
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use swarm_topology::config::{ENV_GATEWAY_URL, ENV_POLL_INTERVAL_MS};
use swarm_topology::format::{detail_rows, http_label, short_key, time_ago, NONE_MARK};
use swarm_topology::types::{ClusterSnapshot, DeployRequest};
use swarm_topology::{
    reconcile, ClusterSession, GatewayClient, GatewayConfig, MonitorView, Selection,
    TopologyGraph, VisualNode,
};

#[derive(Parser)]
#[command(name = "swarm_watch")]
#[command(version = "0.1.0")]
#[command(about = "Live topology view of a SwarmLambda cluster")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gateway base URL
    #[arg(long, global = true, env = ENV_GATEWAY_URL)]
    gateway: Option<String>,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and redraw the node table on every change
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, env = ENV_POLL_INTERVAL_MS)]
        interval_ms: Option<u64>,

        /// Show the detail panel for this node id below the table
        #[arg(long)]
        open: Option<String>,
    },

    /// Fetch one snapshot and print the reconciled graph
    Snapshot,

    /// Fetch one snapshot and print the details of a single node
    Node {
        /// Node id (the node's public key)
        id: String,
    },

    /// Deploy a function from a single source file
    Deploy {
        #[arg(long)]
        name: String,

        /// Handler entry point, e.g. index.handler
        #[arg(long, default_value = "index.handler")]
        handler: String,

        /// Source file; stored under its file name
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, default_value = swarm_topology::types::DEFAULT_RUNTIME)]
        runtime: String,
    },

    /// Invoke a function and print the response body verbatim
    Invoke {
        #[arg(long)]
        name: String,

        /// JSON payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("swarm_topology=info,swarm_watch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = GatewayConfig::from_env();
    if let Some(url) = cli.gateway.as_deref() {
        config = config.with_base_url(url)?;
    }

    match cli.command {
        Commands::Watch { interval_ms, open } => {
            if let Some(ms) = interval_ms {
                config = config.poll_interval(Duration::from_millis(ms))?;
            }
            let mut selection = Selection::new();
            if let Some(id) = open {
                selection.open(id);
            }
            watch(config, selection, cli.format).await
        }
        Commands::Snapshot => snapshot(config, cli.format).await,
        Commands::Node { id } => node(config, id, cli.format).await,
        Commands::Deploy {
            name,
            handler,
            file,
            runtime,
        } => deploy(config, name, handler, file, runtime).await,
        Commands::Invoke { name, payload } => invoke(config, name, payload).await,
    }
}

async fn watch(config: GatewayConfig, selection: Selection, format: OutputFormat) -> Result<()> {
    let session = ClusterSession::start(&config)?;
    let mut revisions = session.monitor().subscribe();

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = session.monitor().view().await;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&view.graph)?),
                    OutputFormat::Pretty => {
                        print!("\x1b[2J\x1b[H");
                        print_view(session.base_url(), &view);
                        if let Some(id) = selection.opened() {
                            println!();
                            match selection.resolve(&view.graph) {
                                Some(node) => print_details(node),
                                None => println!("  {} {}", "not in cluster:".yellow(), id),
                            }
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop().await;
    Ok(())
}

async fn fetch_graph(config: &GatewayConfig) -> Result<(TopologyGraph, ClusterSnapshot)> {
    let client = GatewayClient::from_config(config).context("building HTTP client")?;
    let snapshot = client.fetch_snapshot().await?;
    let graph = reconcile(TopologyGraph::new(), &snapshot, config.staleness);
    Ok((graph, snapshot))
}

async fn snapshot(config: GatewayConfig, format: OutputFormat) -> Result<()> {
    let (graph, snapshot) = fetch_graph(&config).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&graph)?),
        OutputFormat::Pretty => {
            let view = MonitorView {
                graph,
                reachable: true,
                cluster_id: Some(snapshot.cluster_id),
                captured_at_ms: Some(snapshot.captured_at_ms),
                functions: snapshot.functions,
                ..Default::default()
            };
            print_view(&config.base_url, &view);
        }
    }
    Ok(())
}

async fn node(config: GatewayConfig, id: String, format: OutputFormat) -> Result<()> {
    let (graph, _) = fetch_graph(&config).await?;

    let mut selection = Selection::new();
    selection.open(id);
    let Some(node) = selection.resolve(&graph) else {
        anyhow::bail!("node '{}' is not in the cluster", selection.opened().unwrap_or_default());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(node)?),
        OutputFormat::Pretty => {
            print_details(node);
            println!();
            println!("  {}", "RAW".bold());
            for line in serde_json::to_string_pretty(node)?.lines() {
                println!("  {}", line.dimmed());
            }
        }
    }
    Ok(())
}

async fn deploy(
    config: GatewayConfig,
    name: String,
    handler: String,
    file: PathBuf,
    runtime: String,
) -> Result<()> {
    let source = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index.js".to_string());

    let request = DeployRequest::new(&name, handler)
        .with_runtime(runtime)
        .with_file(file_name, source);

    let session = ClusterSession::start(&config)?;
    let outcome = session.deploy(&request).await;
    session.stop().await;
    let view = outcome?;

    println!("{} deployed {}", "✓".green().bold(), name.bold());
    if view.reachable {
        print_functions(&view);
    } else if let Some(err) = &view.last_error {
        println!("  {} {}", "could not re-read cluster:".yellow(), err);
    }
    Ok(())
}

async fn invoke(config: GatewayConfig, name: String, payload: String) -> Result<()> {
    let session = ClusterSession::start(&config)?;
    let outcome = session.invoke_text(&name, &payload).await;
    session.stop().await;

    println!("{}", outcome?.body);
    Ok(())
}

fn print_view(gateway: &str, view: &MonitorView) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let graph = &view.graph;

    let status = if view.reachable {
        "reachable".green()
    } else {
        "unreachable".red()
    };
    println!(
        "{}  {}  {}  {}/{} online",
        view.cluster_id.as_deref().unwrap_or(NONE_MARK).bold(),
        gateway.dimmed(),
        status,
        graph.online_count(),
        graph.nodes.len()
    );
    if let Some(err) = &view.last_error {
        println!("  {}", err.yellow());
    }
    println!();

    println!(
        "  {:<2} {:<20} {:<10} {:<14} {:<22} {:<10} {}",
        "", "NAME", "REGION", "KEY", "HTTP", "SEEN", "LINK"
    );
    for node in &graph.nodes {
        let dot = if node.attributes.online {
            "●".green()
        } else {
            "●".dimmed()
        };
        let link = if node.is_center {
            "center".cyan().to_string()
        } else if graph.edges.iter().any(|e| e.target == node.id) {
            "↔".to_string()
        } else {
            "".to_string()
        };
        println!(
            "  {:<2} {:<20} {:<10} {:<14} {:<22} {:<10} {}",
            dot,
            node.attributes.name,
            node.attributes.region,
            short_key(&node.id),
            http_label(node.attributes.http.as_ref()),
            time_ago(node.attributes.last_seen_at_ms, now_ms),
            link
        );
    }

    print_functions(view);
}

fn print_functions(view: &MonitorView) {
    if view.functions.is_empty() {
        return;
    }
    println!();
    println!("  {}", "FUNCTIONS".bold());
    for f in &view.functions {
        println!(
            "  {:<20} v{:<6} {:<20} {}",
            f.name,
            f.latest_version.as_deref().unwrap_or(NONE_MARK),
            f.handler.as_deref().unwrap_or(NONE_MARK),
            f.runtime.as_deref().unwrap_or(NONE_MARK)
        );
    }
}

fn print_details(node: &VisualNode) {
    let now_ms = chrono::Utc::now().timestamp_millis();
    println!("  {}", node.attributes.name.bold());
    for (label, value) in detail_rows(node, now_ms) {
        println!("  {:<10} {}", label.dimmed(), value);
    }
}

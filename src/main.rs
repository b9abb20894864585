use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use neo4j_conn::smoke::SmokeTester;
use neo4j_conn::{ConnectionConfig, Neo4jConnector};

/// Check that a Neo4j server is reachable: connect, create a test node, read
/// it back, link it inside a transaction, then delete it.
///
/// Anything not given on the command line comes from NEO4J_URI, NEO4J_USER
/// and NEO4J_PASSWORD (or a `.env` file).
#[derive(Parser, Debug)]
#[command(name = "neo4j-smoke", version)]
struct Cli {
    /// Bolt URI, e.g. bolt://localhost:7687
    uri: Option<String>,

    /// User name
    user: Option<String>,

    /// Password
    password: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // ── Tracing ───────────────────────────────────────────────────────────────
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("neo4j_conn=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // ── Config ────────────────────────────────────────────────────────────────
    let config = ConnectionConfig::from_env()
        .map(|config| config.with_overrides(cli.uri, cli.user, cli.password))
        .and_then(|config| config.check().map(|()| config))
        .map_err(|e| {
            error!("Configuration error: {}", e);
            e
        })?;

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut tester = SmokeTester::new(config, Neo4jConnector);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = tester.run_all(&mut out).await?;
    out.flush()?;

    Ok(ExitCode::from(report.exit_code()))
}

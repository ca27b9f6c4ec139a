use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vexdb::aof::AofConfig;
use vexdb::server::{self, ServerConfig};

/// In-memory key/value store with AOF durability and vector search.
#[derive(Parser, Debug)]
#[command(name = "vexdb", version, about)]
struct Args {
    /// TCP port to listen on
    #[arg(long, default_value_t = 6379)]
    port: u16,

    /// Path to the append-only log file
    #[arg(long, default_value = "vexdb.aof")]
    aof: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("vexdb starting...");

    let config = ServerConfig {
        addr: format!("0.0.0.0:{}", args.port),
        aof: AofConfig {
            path: args.aof,
            ..AofConfig::default()
        },
    };

    server::run(config).await
}

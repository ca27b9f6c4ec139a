//! TCP server
//!
//! Accepts connections and hands each to its own task; all of them share
//! one dispatcher behind a mutex, so commands apply to the store one at a
//! time and each mutation reaches the log before the next command runs. A
//! background interval sweeps expired keys even when no traffic arrives.

mod connection;

pub use connection::Connection;

use crate::aof::AofConfig;
use crate::dispatch::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// How often the expired-key sweep runs with or without I/O activity.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Server configuration, supplied by the process boundary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub aof: AofConfig,
}

/// Replay the log, bind, and serve until externally terminated.
///
/// Fails fatally when the log cannot be opened for append.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let dispatcher = Arc::new(Mutex::new(Dispatcher::with_aof(&config.aof)?));
    let listener = TcpListener::bind(&config.addr).await?;
    info!("vexdb listening on {}", config.addr);
    serve(listener, dispatcher).await
}

/// Accept loop over an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Mutex<Dispatcher>>,
) -> anyhow::Result<()> {
    let sweeper = dispatcher.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await; // the first tick fires immediately
        loop {
            interval.tick().await;
            let removed = sweeper.lock().await.store_mut().cleanup_expired_keys();
            if removed > 0 {
                debug!("expiry sweep removed {} keys", removed);
            }
        }
    });

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("new connection from {}", addr);

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut connection = Connection::new(socket);
            if let Err(e) = connection.handle(dispatcher).await {
                error!("connection error from {}: {}", addr, e);
            }
            info!("connection closed: {}", addr);
        });
    }
}

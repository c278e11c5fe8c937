//! Fire-and-forget TCP delivery of serialized batches.
//!
//! Each flush gets its own transient connection. The caller never waits on
//! the outcome; completion is observed through `DeliveryStats` and the
//! selector's dead-host state. Connect and write share one timeout so a
//! hung endpoint cannot hold a task indefinitely.

use crate::core::{unix_now, RelayError, Result};
use crate::protocol::LineSerializer;
use crate::relay::pool::{Endpoint, HostSelector};
use crate::relay::DeliveryStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Pushes wire batches to the currently selected endpoint.
#[derive(Debug)]
pub struct DeliveryClient {
    selector: Arc<HostSelector>,
    stats: Arc<DeliveryStats>,
    serializer: Arc<LineSerializer>,
    connect_timeout: Duration,
}

impl DeliveryClient {
    /// Build a client over a shared selector and stats.
    pub fn new(
        selector: Arc<HostSelector>,
        stats: Arc<DeliveryStats>,
        serializer: Arc<LineSerializer>,
        connect_timeout: Duration,
    ) -> Self {
        DeliveryClient {
            selector,
            stats,
            serializer,
            connect_timeout,
        }
    }

    /// Deliver a batch, best-effort.
    ///
    /// Spawns a detached task and returns immediately; concurrent flushes
    /// each get an independent connection. Returns the task handle so tests
    /// can await completion; production callers drop it. `None` when no
    /// endpoint is selectable (the selector already logged it).
    pub fn deliver(&self, batch: String) -> Option<JoinHandle<()>> {
        let endpoint = self.selector.select()?;

        let selector = Arc::clone(&self.selector);
        let stats = Arc::clone(&self.stats);
        let serializer = Arc::clone(&self.serializer);
        let connect_timeout = self.connect_timeout;

        Some(tokio::spawn(async move {
            match send(&endpoint, batch, &serializer, &stats, connect_timeout).await {
                Ok(()) => {
                    tracing::debug!(endpoint = %endpoint, "batch delivered");
                },
                Err(e) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        category = e.category(),
                        error = %e,
                        "delivery failed, batch dropped"
                    );
                    selector.mark_dead(&endpoint);
                    stats.record_exception(unix_now());
                },
            }
        }))
    }
}

/// One delivery attempt: connect, append the health trailer, write, close.
async fn send(
    endpoint: &Endpoint,
    mut batch: String,
    serializer: &LineSerializer,
    stats: &DeliveryStats,
    connect_timeout: Duration,
) -> Result<()> {
    let (last_flush, last_exception) = stats.snapshot();

    let attempt = async {
        let mut stream = TcpStream::connect(endpoint.address()).await?;
        batch.push_str(&serializer.health_trailer(unix_now(), last_flush, last_exception));
        stream.write_all(batch.as_bytes()).await?;
        stream.shutdown().await?;
        Ok::<(), RelayError>(())
    };

    timeout(connect_timeout, attempt)
        .await
        .map_err(|_| RelayError::Timeout {
            timeout_ms: connect_timeout.as_millis() as u64,
        })??;

    stats.record_flush(unix_now());
    Ok(())
}

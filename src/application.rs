//! Event-loop wiring between the aggregation host and the backend.
//!
//! The host process drives the relay through a typed channel instead of a
//! stringly event bus: flush events carry a timestamp and snapshot, status
//! events carry a reply channel.

use crate::core::{unix_now, Config, MetricSnapshot, RelayError, Result};
use crate::relay::{OpenTsdbBackend, StatusEntry};
use tokio::sync::{mpsc, oneshot};

/// Events the host process sends to the relay.
#[derive(Debug)]
pub enum RelayEvent {
    /// One flush interval's snapshot, stamped by the aggregation engine
    Flush {
        /// Flush timestamp, unix seconds
        timestamp: u64,
        /// The pre-aggregated metrics
        snapshot: MetricSnapshot,
    },
    /// Request for the backend's delivery stats
    Status {
        /// Where the entries are sent
        reply: oneshot::Sender<Vec<StatusEntry>>,
    },
}

/// Host-facing handle for submitting events.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayEvent>,
}

impl RelayHandle {
    /// Submit a flush event.
    pub async fn flush(&self, timestamp: u64, snapshot: MetricSnapshot) -> Result<()> {
        self.tx
            .send(RelayEvent::Flush {
                timestamp,
                snapshot,
            })
            .await
            .map_err(|_| RelayError::ChannelSend)
    }

    /// Request the current status entries.
    pub async fn status(&self) -> Result<Vec<StatusEntry>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RelayEvent::Status { reply })
            .await
            .map_err(|_| RelayError::ChannelSend)?;
        rx.await.map_err(|_| RelayError::ChannelReceive)
    }
}

/// The relay application: consumes events, drives the backend.
#[derive(Debug)]
pub struct Application {
    backend: OpenTsdbBackend,
    rx: mpsc::Receiver<RelayEvent>,
}

impl Application {
    /// Build the application and the handle the host uses to reach it.
    pub fn new(config: Config) -> Result<(Self, RelayHandle)> {
        let backend = OpenTsdbBackend::new(&config, unix_now())?;
        let (tx, rx) = mpsc::channel(64);
        Ok((Application { backend, rx }, RelayHandle { tx }))
    }

    /// Consume events until every handle is dropped.
    ///
    /// A flush never fails the loop: delivery problems stay inside the
    /// backend. Status replies to a dropped requester are discarded.
    pub async fn run(mut self) {
        tracing::info!("relay event loop started");
        while let Some(event) = self.rx.recv().await {
            match event {
                RelayEvent::Flush {
                    timestamp,
                    snapshot,
                } => {
                    let _ = self.backend.on_flush(timestamp, &snapshot);
                },
                RelayEvent::Status { reply } => {
                    let _ = reply.send(self.backend.status());
                },
            }
        }
        tracing::info!("event channel closed, relay stopping");
    }

    /// The backend, for direct (non-channel) embedding.
    pub fn backend(&self) -> &OpenTsdbBackend {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;

    #[tokio::test]
    async fn test_status_round_trip() {
        let config = ConfigBuilder::new().endpoint("localhost", 4242).build().unwrap();
        let (app, handle) = Application::new(config).unwrap();
        let loop_handle = tokio::spawn(app.run());

        let entries = handle.status().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.name == "last_flush"));

        drop(handle);
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_loop_stops_when_handles_dropped() {
        let config = ConfigBuilder::new().endpoint("localhost", 4242).build().unwrap();
        let (app, handle) = Application::new(config).unwrap();
        let loop_handle = tokio::spawn(app.run());
        drop(handle);
        loop_handle.await.unwrap();
    }
}

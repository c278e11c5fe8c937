//! Endpoint pool with dead-host tracking and failover selection.
//!
//! Not a load balancer: selection pins to one endpoint until it fails, and
//! the scan lets the last live candidate win. Dead endpoints rejoin the
//! pool once their cooldown elapses.

use crate::core::config::HostPort;
use crate::core::unix_now;
use parking_lot::Mutex;
use std::time::Duration;

/// A deliverable `host:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Endpoint {
    /// The `host:port` address string for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
struct PoolEntry {
    endpoint: Endpoint,
    dead_since: Option<u64>,
}

#[derive(Debug)]
struct PoolState {
    entries: Vec<PoolEntry>,
    /// Cached selection, reused until a failure clears it
    selected: Option<usize>,
}

/// Chooses a live endpoint per delivery attempt and tracks dead hosts.
///
/// A pool of one degenerates to no failover logic: the endpoint is always
/// selected and failures are never recorded against it.
#[derive(Debug)]
pub struct HostSelector {
    state: Mutex<PoolState>,
    retry: Duration,
    single: bool,
}

impl HostSelector {
    /// Build a selector over the configured pool.
    pub fn new(endpoints: Vec<HostPort>, dead_host_retry: Duration) -> Self {
        let single = endpoints.len() == 1;
        let entries = endpoints
            .into_iter()
            .map(|hp| PoolEntry {
                endpoint: Endpoint {
                    host: hp.host,
                    port: hp.port,
                },
                dead_since: None,
            })
            .collect();

        HostSelector {
            state: Mutex::new(PoolState {
                entries,
                selected: None,
            }),
            retry: dead_host_retry,
            single,
        }
    }

    /// Pick an endpoint for the next delivery attempt.
    pub fn select(&self) -> Option<Endpoint> {
        self.select_at(unix_now())
    }

    /// Selection with an injected clock.
    ///
    /// The cached selection is reused when present. Otherwise every entry is
    /// scanned: each live entry, and each dead entry whose cooldown has
    /// elapsed (which is revived), becomes the candidate in turn, so the
    /// last eligible entry wins.
    pub fn select_at(&self, now: u64) -> Option<Endpoint> {
        let mut state = self.state.lock();

        if self.single {
            return state.entries.first().map(|e| e.endpoint.clone());
        }

        if let Some(idx) = state.selected {
            return state.entries.get(idx).map(|e| e.endpoint.clone());
        }

        let retry_secs = self.retry.as_secs();
        let mut selected = None;
        for (idx, entry) in state.entries.iter_mut().enumerate() {
            match entry.dead_since {
                None => selected = Some(idx),
                Some(since) if now.saturating_sub(since) >= retry_secs => {
                    tracing::debug!(endpoint = %entry.endpoint, "retrying endpoint after cooldown");
                    entry.dead_since = None;
                    selected = Some(idx);
                },
                Some(_) => {},
            }
        }

        state.selected = selected;
        match selected {
            Some(idx) => Some(state.entries[idx].endpoint.clone()),
            None => {
                tracing::warn!("no live OpenTSDB endpoint available, dropping this flush");
                None
            },
        }
    }

    /// Record a delivery failure against an endpoint.
    pub fn mark_dead(&self, endpoint: &Endpoint) {
        self.mark_dead_at(endpoint, unix_now());
    }

    /// Dead-marking with an injected clock. Clears the cached selection so
    /// the next attempt re-scans the pool. No-op for a pool of one.
    pub fn mark_dead_at(&self, endpoint: &Endpoint, now: u64) {
        if self.single {
            tracing::debug!(endpoint = %endpoint, "single-endpoint pool, not marking dead");
            return;
        }

        let mut state = self.state.lock();
        state.selected = None;
        for entry in &mut state.entries {
            if entry.endpoint == *endpoint {
                entry.dead_since = Some(now);
                tracing::info!(
                    endpoint = %endpoint,
                    retry_secs = self.retry.as_secs(),
                    "endpoint marked dead"
                );
            }
        }
    }

    /// Number of endpoints in the pool
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True for an empty pool
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(hosts: &[&str]) -> HostSelector {
        let endpoints = hosts
            .iter()
            .map(|h| HostPort {
                host: h.to_string(),
                port: 4242,
            })
            .collect();
        HostSelector::new(endpoints, Duration::from_secs(15))
    }

    #[test]
    fn test_last_live_wins() {
        let selector = pool(&["a", "b"]);
        assert_eq!(selector.select_at(100).unwrap().host, "b");
    }

    #[test]
    fn test_failover_to_remaining_live() {
        let selector = pool(&["a", "b"]);
        let b = selector.select_at(100).unwrap();
        selector.mark_dead_at(&b, 100);
        assert_eq!(selector.select_at(100).unwrap().host, "a");
    }

    #[test]
    fn test_dead_host_revived_after_cooldown() {
        let selector = pool(&["a", "b"]);
        let b = selector.select_at(100).unwrap();
        selector.mark_dead_at(&b, 100);

        // Still inside the cooldown window.
        assert_eq!(selector.select_at(110).unwrap().host, "a");

        // Marking a dead again clears the cache; b's cooldown has elapsed
        // so it is revived and wins the scan.
        let a = selector.select_at(110).unwrap();
        selector.mark_dead_at(&a, 110);
        assert_eq!(selector.select_at(115).unwrap().host, "b");
    }

    #[test]
    fn test_selection_cached_until_failure() {
        let selector = pool(&["a", "b"]);
        let first = selector.select_at(100).unwrap();
        // Repeated selection sticks to the same endpoint.
        assert_eq!(selector.select_at(100).unwrap(), first);
        assert_eq!(selector.select_at(200).unwrap(), first);
    }

    #[test]
    fn test_all_dead_yields_none() {
        let selector = pool(&["a", "b"]);
        let b = selector.select_at(100).unwrap();
        selector.mark_dead_at(&b, 100);
        let a = selector.select_at(100).unwrap();
        selector.mark_dead_at(&a, 100);
        assert!(selector.select_at(105).is_none());

        // Both revive once the cooldown elapses.
        assert!(selector.select_at(115).is_some());
    }

    #[test]
    fn test_single_endpoint_short_circuits() {
        let selector = pool(&["only"]);
        let ep = selector.select_at(100).unwrap();
        assert_eq!(ep.host, "only");

        // Dead-marking is a no-op for a pool of one.
        selector.mark_dead_at(&ep, 100);
        assert_eq!(selector.select_at(101).unwrap().host, "only");
    }

    #[test]
    fn test_mark_dead_matches_host_and_port() {
        let endpoints = vec![
            HostPort {
                host: "a".to_string(),
                port: 4242,
            },
            HostPort {
                host: "a".to_string(),
                port: 4243,
            },
        ];
        let selector = HostSelector::new(endpoints, Duration::from_secs(15));
        let second = selector.select_at(100).unwrap();
        assert_eq!(second.port, 4243);
        selector.mark_dead_at(&second, 100);
        let next = selector.select_at(100).unwrap();
        assert_eq!(next.port, 4242);
    }
}

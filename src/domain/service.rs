use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{decode_subscription, FetchError, NodeCache, NodeDescriptor, ProbeCoordinator, Result};
use crate::ports::SubscriptionSourcePort;

/// Serves random reachable nodes, refreshing the pool from the subscription
/// when the cache has gone stale.
pub struct NodeService {
    source: Arc<dyn SubscriptionSourcePort>,
    coordinator: ProbeCoordinator,
    cache: NodeCache,
    refresh_gate: Mutex<()>,
    refresh_rounds: AtomicU64,
}

impl NodeService {
    pub fn new(source: Arc<dyn SubscriptionSourcePort>, coordinator: ProbeCoordinator, cache: NodeCache) -> Self {
        Self {
            source,
            coordinator,
            cache,
            refresh_gate: Mutex::new(()),
            refresh_rounds: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    /// Return a random reachable node, or `None` if none could be found.
    pub async fn get_node(&self) -> Option<NodeDescriptor> {
        if let Some(node) = self.cached_node() {
            return Some(node);
        }

        // Only one caller refreshes at a time. Callers that queued behind a
        // refresh share its outcome, including a failure.
        let seen = self.refresh_rounds.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;
        if let Some(node) = self.cached_node() {
            return Some(node);
        }
        if self.refresh_rounds.load(Ordering::SeqCst) != seen {
            debug!("Refresh finished while waiting and found no node");
            return None;
        }

        let outcome = self.refresh().await;
        self.refresh_rounds.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(node) => {
                info!("Selected node {}", node);
                Some(node)
            }
            Err(e @ FetchError::Download(_)) => {
                error!("{}", e);
                None
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn cached_node(&self) -> Option<NodeDescriptor> {
        if !self.cache.is_valid(Instant::now()) {
            return None;
        }
        let node = self.cache.pick_random()?;
        info!("Selected cached node {}", node);
        Some(node)
    }

    /// Download, decode and probe the subscription, then store the reachable set.
    ///
    /// The cache is left untouched on every failure path.
    async fn refresh(&self) -> Result<NodeDescriptor> {
        info!("Node cache is stale, refreshing subscription");

        let raw = self.source.fetch().await?;
        let nodes = decode_subscription(&raw)?;
        let reachable = self.coordinator.check_all(nodes).await;

        let node = self.cache_and_pick(reachable)?;
        info!("Cached {} reachable nodes", self.cache.len());
        Ok(node)
    }

    fn cache_and_pick(&self, reachable: Vec<NodeDescriptor>) -> Result<NodeDescriptor> {
        if reachable.is_empty() {
            return Err(FetchError::NoReachableNodes);
        }
        self.cache.replace(reachable, Instant::now());
        self.cache.pick_random().ok_or(FetchError::NoReachableNodes)
    }
}

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{NodeDescriptor, ProbeOutcome};
use crate::ports::ReachabilityPort;

pub const DEFAULT_PROBE_LIMIT: usize = 20;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// A node paired with its in-flight probe.
struct ProbeTask {
    node: NodeDescriptor,
    handle: JoinHandle<ProbeOutcome>,
}

/// Fans reachability probes out over a capped prefix of the candidates.
#[derive(Clone)]
pub struct ProbeCoordinator {
    prober: Arc<dyn ReachabilityPort>,
    limit: usize,
    timeout: Duration,
}

impl ProbeCoordinator {
    pub fn new(prober: Arc<dyn ReachabilityPort>) -> Self {
        Self {
            prober,
            limit: DEFAULT_PROBE_LIMIT,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe the first `limit` nodes concurrently and return the reachable ones.
    ///
    /// Waits for every probe to settle. The result keeps the input order.
    pub async fn check_all(&self, nodes: Vec<NodeDescriptor>) -> Vec<NodeDescriptor> {
        let round = Uuid::new_v4();

        if nodes.len() > self.limit {
            info!(%round, "Probe limit reached ({}), skipping {} nodes", self.limit, nodes.len() - self.limit);
        }

        let tasks: Vec<ProbeTask> = nodes
            .into_iter()
            .take(self.limit)
            .map(|node| self.spawn_probe(node))
            .collect();

        if tasks.is_empty() {
            warn!(%round, "No nodes to probe");
            return Vec::new();
        }
        info!(%round, "Probing {} nodes", tasks.len());

        let (nodes, handles): (Vec<_>, Vec<_>) = tasks.into_iter().map(|t| (t.node, t.handle)).unzip();
        let outcomes = join_all(handles).await.into_iter().map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::Faulted(e.to_string()),
        });

        let reachable: Vec<NodeDescriptor> = nodes
            .into_iter()
            .zip(outcomes)
            .filter_map(|(node, outcome)| match outcome {
                ProbeOutcome::Reachable => {
                    debug!(%round, node = node.display_name(), "Node reachable");
                    Some(node)
                }
                ProbeOutcome::Unreachable => None,
                ProbeOutcome::Faulted(reason) => {
                    warn!(%round, node = node.display_name(), "Probe faulted: {}", reason);
                    None
                }
            })
            .collect();

        info!(%round, "Probe round finished, {} reachable nodes", reachable.len());
        reachable
    }

    fn spawn_probe(&self, node: NodeDescriptor) -> ProbeTask {
        let prober = self.prober.clone();
        let deadline = self.timeout;
        let host = node.address().to_string();
        let port = node.port();

        // The outer timeout drops the probe future, and with it any socket,
        // even if the prober ignores its own deadline.
        let handle = tokio::spawn(async move {
            match timeout(deadline, prober.probe(&host, port, deadline)).await {
                Ok(reachable) => ProbeOutcome::from(reachable),
                Err(_) => ProbeOutcome::Unreachable,
            }
        });

        ProbeTask { node, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Reachable iff the port is listed; records every probed port.
    struct ScriptedProber {
        reachable_ports: Vec<u16>,
        probed: Mutex<Vec<u16>>,
    }

    impl ScriptedProber {
        fn new(reachable_ports: Vec<u16>) -> Self {
            Self {
                reachable_ports,
                probed: Mutex::new(Vec::new()),
            }
        }

        fn probed(&self) -> Vec<u16> {
            let mut probed = self.probed.lock().unwrap().clone();
            probed.sort_unstable();
            probed
        }
    }

    #[async_trait]
    impl ReachabilityPort for ScriptedProber {
        async fn probe(&self, _host: &str, port: u16, _timeout: Duration) -> bool {
            self.probed.lock().unwrap().push(port);
            self.reachable_ports.contains(&port)
        }
    }

    struct PanickingProber;

    #[async_trait]
    impl ReachabilityPort for PanickingProber {
        async fn probe(&self, _host: &str, port: u16, _timeout: Duration) -> bool {
            if port == 666 {
                panic!("probe blew up");
            }
            true
        }
    }

    struct HangingProber;

    #[async_trait]
    impl ReachabilityPort for HangingProber {
        async fn probe(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
            tokio::time::sleep(Duration::from_secs(30)).await;
            true
        }
    }

    fn nodes_on_ports(ports: impl IntoIterator<Item = u16>) -> Vec<NodeDescriptor> {
        ports.into_iter().map(|p| NodeDescriptor::new("127.0.0.1", p)).collect()
    }

    #[tokio::test]
    async fn test_only_probes_up_to_limit() {
        let prober = Arc::new(ScriptedProber::new((1..=10).collect()));
        let coordinator = ProbeCoordinator::new(prober.clone()).with_limit(3);

        let reachable = coordinator.check_all(nodes_on_ports(1..=10)).await;

        assert_eq!(prober.probed(), vec![1, 2, 3]);
        let ports: Vec<u16> = reachable.iter().map(|n| n.port()).collect();
        assert_eq!(ports, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_keeps_input_order_of_reachable_nodes() {
        let prober = Arc::new(ScriptedProber::new(vec![9, 4, 7]));
        let coordinator = ProbeCoordinator::new(prober);

        let reachable = coordinator.check_all(nodes_on_ports(vec![7, 1, 9, 2, 4])).await;

        let ports: Vec<u16> = reachable.iter().map(|n| n.port()).collect();
        assert_eq!(ports, vec![7, 9, 4]);
    }

    #[tokio::test]
    async fn test_all_unreachable_returns_empty() {
        let prober = Arc::new(ScriptedProber::new(vec![]));
        let coordinator = ProbeCoordinator::new(prober.clone());

        assert!(coordinator.check_all(nodes_on_ports(1..=5)).await.is_empty());
        assert_eq!(prober.probed().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty() {
        let coordinator = ProbeCoordinator::new(Arc::new(ScriptedProber::new(vec![80])));
        assert!(coordinator.check_all(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_faulted_probe_counts_as_unreachable() {
        let coordinator = ProbeCoordinator::new(Arc::new(PanickingProber));

        let reachable = coordinator.check_all(nodes_on_ports(vec![443, 666, 8443])).await;

        let ports: Vec<u16> = reachable.iter().map(|n| n.port()).collect();
        assert_eq!(ports, vec![443, 8443]);
    }

    #[tokio::test]
    async fn test_hanging_probe_is_abandoned_after_timeout() {
        let coordinator = ProbeCoordinator::new(Arc::new(HangingProber)).with_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        let reachable = coordinator.check_all(nodes_on_ports(vec![1, 2])).await;

        assert!(reachable.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

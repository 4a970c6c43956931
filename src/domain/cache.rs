use rand::seq::SliceRandom;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use super::NodeDescriptor;

pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3600);

#[derive(Debug, Default)]
struct CacheState {
    nodes: Vec<NodeDescriptor>,
    built_at: Option<Instant>,
}

/// Last known good set of reachable nodes.
///
/// All operations are synchronous; the lock is only held for the duration of
/// a clone or a swap and never across an await point.
#[derive(Debug)]
pub struct NodeCache {
    state: RwLock<CacheState>,
    duration: Duration,
}

impl NodeCache {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            duration,
        }
    }

    /// True iff the cache holds at least one node built less than `duration` before `now`.
    pub fn is_valid(&self, now: Instant) -> bool {
        let state = self.read();
        match state.built_at {
            Some(built_at) if !state.nodes.is_empty() => now.saturating_duration_since(built_at) < self.duration,
            _ => false,
        }
    }

    pub fn pick_random(&self) -> Option<NodeDescriptor> {
        self.read().nodes.choose(&mut rand::thread_rng()).cloned()
    }

    /// Swap in a freshly probed node set.
    pub fn replace(&self, nodes: Vec<NodeDescriptor>, now: Instant) {
        let mut state = self.write();
        state.nodes = nodes;
        state.built_at = Some(now);
    }

    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }

    pub fn snapshot(&self) -> Vec<NodeDescriptor> {
        self.read().nodes.clone()
    }

    // A panic while holding the lock cannot leave the state half written,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DURATION)
    }
}

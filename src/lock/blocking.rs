/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::RedLockConfig;
use crate::errors::{RedLockError, RedLockResult};
use crate::lock::{validate_acquire_args, Attempt, Lock};
use crate::node::{NodeHandle, RedisNode};
use crate::util::{calculate_drift, calculate_quorum, generate_token, num_milliseconds};

/// === RedLock (blocking quorum lock) ===
///
/// Grants a mutually-exclusive, TTL-bounded lock over a named resource by
/// writing the same token to a majority of independent Redis nodes. The
/// node list is immutable after construction, so one instance may serve
/// many threads; every call keeps its own token and counters.
pub struct RedLock {
    nodes: Vec<Arc<dyn NodeHandle>>,
    quorum: usize,
    retry_count: u32,
    retry_delay: Duration,
    drift_factor: f64,
    drift_offset: Duration,
}

impl RedLock {
    /// Opens a pooled handle per configured node, probes each once, and
    /// fails when fewer than quorum answer.
    pub fn connect(config: &RedLockConfig) -> RedLockResult<Self> {
        config.validate()?;
        let mut handles: Vec<Arc<dyn NodeHandle>> = Vec::with_capacity(config.nodes.len());
        for node in &config.nodes {
            handles.push(Arc::new(RedisNode::new(node, config)?));
        }
        Self::with_nodes(handles, config)
    }

    /// Builds the instance over pre-built node handles. The quorum is fixed
    /// from the number of handles supplied, not from how many respond;
    /// nodes that fail the probe are dropped from the working set.
    pub fn with_nodes(
        nodes: Vec<Arc<dyn NodeHandle>>,
        config: &RedLockConfig,
    ) -> RedLockResult<Self> {
        if config.retry_count == 0 {
            return Err(RedLockError::ConfigError(
                "retry count cannot be zero".to_string(),
            ));
        }

        let requested = nodes.len();
        let quorum = calculate_quorum(requested);

        let mut healthy: Vec<Arc<dyn NodeHandle>> = Vec::with_capacity(requested);
        for node in nodes {
            if node.probe() {
                info!(node = node.name(), "node answered the construction probe");
                healthy.push(node);
            } else {
                error!(node = node.name(), "node failed the construction probe");
            }
        }

        if healthy.len() < quorum {
            let retained: Vec<&str> = healthy.iter().map(|n| n.name()).collect();
            return Err(RedLockError::Condition(format!(
                "only {}/{} nodes are reachable ({:?}); quorum of {} cannot be met",
                healthy.len(),
                requested,
                retained,
                quorum
            )));
        }

        info!(
            healthy = healthy.len(),
            requested, quorum, "red lock instance ready"
        );
        Ok(Self {
            nodes: healthy,
            quorum,
            retry_count: config.retry_count,
            retry_delay: config.retry_delay,
            drift_factor: config.drift_factor,
            drift_offset: config.drift_offset,
        })
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Attempts to take the lock, retrying up to the configured count.
    ///
    /// `Ok((lock, true))` means the lock is held for roughly
    /// `lock.validity` more milliseconds. `Ok((_, false))` means every
    /// attempt fell short of quorum or validity — a normal outcome the
    /// caller must handle, not an error. `Err(RedLockError::Lock(_))` is
    /// raised when an attempt reached quorum while some node still failed.
    pub fn acquire(&self, resource: &str, ttl: Duration) -> RedLockResult<(Lock, bool)> {
        self.acquire_until(resource, ttl, None)
    }

    /// Same as [`acquire`](Self::acquire), but gives up early instead of
    /// sleeping past `deadline`.
    pub fn acquire_until(
        &self,
        resource: &str,
        ttl: Duration,
        deadline: Option<Instant>,
    ) -> RedLockResult<(Lock, bool)> {
        validate_acquire_args(resource, ttl)?;

        let ttl_ms = num_milliseconds(&ttl) as i64;
        let drift_ms =
            num_milliseconds(&calculate_drift(ttl, self.drift_factor, self.drift_offset)) as i64;

        let mut last_token = String::new();
        for attempt in 1..=self.retry_count {
            // Fresh token per attempt, never reused.
            let token = generate_token();
            last_token = token.clone();

            let outcome = self.try_once(resource, &token, ttl, ttl_ms, drift_ms);

            if outcome.validity > 0 && outcome.successes >= self.quorum {
                if !outcome.errors.is_empty() {
                    // Quorum was reached, but a node still failed: the
                    // acquisition as a whole is reported as failed.
                    return Err(RedLockError::Lock(outcome.errors));
                }
                let lock = Lock {
                    validity: outcome.validity,
                    resource: resource.to_string(),
                    token,
                };
                info!(
                    resource,
                    validity_ms = lock.validity,
                    "lock acquired, handing over to the caller"
                );
                return Ok((lock, true));
            }

            // Roll the token back wherever it may have landed before the
            // next round.
            self.rollback(resource, &token);
            debug!(
                resource,
                attempt,
                successes = outcome.successes,
                validity_ms = outcome.validity,
                "attempt fell short, backing off"
            );

            if let Some(deadline) = deadline {
                if Instant::now() + self.retry_delay >= deadline {
                    debug!(resource, "deadline reached, giving up early");
                    break;
                }
            }
            thread::sleep(self.retry_delay);
        }

        info!(resource, "all attempts exhausted without taking the lock");
        Ok((
            Lock {
                validity: 0,
                resource: resource.to_string(),
                token: last_token,
            },
            false,
        ))
    }

    /// One pass over every node. A node failure is recorded and never
    /// prevents the remaining nodes from being attempted.
    fn try_once(
        &self,
        resource: &str,
        token: &str,
        ttl: Duration,
        ttl_ms: i64,
        drift_ms: i64,
    ) -> Attempt {
        let start = Instant::now();
        let mut successes = 0;
        let mut errors = Vec::new();

        for node in &self.nodes {
            match node.set_if_absent(resource, token, ttl) {
                Ok(true) => {
                    debug!(node = node.name(), resource, "node accepted the lock");
                    successes += 1;
                }
                Ok(false) => {
                    debug!(node = node.name(), resource, "resource already locked on node");
                }
                Err(e) => {
                    let description = format!("node [{}]: {}", node.name(), e);
                    warn!(node = node.name(), resource, error = %e, "lock attempt failed on node");
                    errors.push(description);
                }
            }
        }

        let elapsed_ms = num_milliseconds(&start.elapsed()) as i64;
        Attempt {
            validity: ttl_ms - elapsed_ms - drift_ms,
            successes,
            errors,
        }
    }

    /// Best-effort removal of this attempt's token from every node.
    fn rollback(&self, resource: &str, token: &str) {
        for node in &self.nodes {
            if let Err(e) = node.compare_and_delete(resource, token) {
                warn!(node = node.name(), resource, error = %e, "rollback failed on node");
            }
        }
    }

    /// Releases a held lock on every node, unconditionally. Zero affected
    /// rows on a node means the lease already expired there — a normal
    /// outcome. Per-node failures are collected across the full set and
    /// surfaced together.
    pub fn release(&self, lock: &Lock) -> RedLockResult<()> {
        let mut errors = Vec::new();
        for node in &self.nodes {
            match node.compare_and_delete(&lock.resource, &lock.token) {
                Ok(removed) => {
                    debug!(
                        node = node.name(),
                        resource = %lock.resource,
                        removed,
                        "release executed on node"
                    );
                }
                Err(e) => {
                    warn!(node = node.name(), resource = %lock.resource, error = %e, "release failed on node");
                    errors.push(format!("node [{}]: {}", node.name(), e));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RedLockError::Lock(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<String, (String, Instant)>>,
    }

    struct MemoryNode {
        label: String,
        store: Arc<MemoryStore>,
        fail_writes: AtomicBool,
        fail_deletes: AtomicBool,
    }

    impl MemoryNode {
        fn new(label: String, store: Arc<MemoryStore>) -> Arc<Self> {
            Arc::new(Self {
                label,
                store,
                fail_writes: AtomicBool::new(false),
                fail_deletes: AtomicBool::new(false),
            })
        }

        fn holds(&self, key: &str, value: &str) -> bool {
            let entries = self.store.entries.lock().unwrap();
            entries
                .get(key)
                .is_some_and(|(v, expires)| v == value && *expires > Instant::now())
        }
    }

    impl NodeHandle for MemoryNode {
        fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> RedLockResult<bool> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RedLockError::PoolError("connection refused".to_string()));
            }
            let mut entries = self.store.entries.lock().unwrap();
            match entries.get(key) {
                Some((_, expires)) if *expires > Instant::now() => Ok(false),
                _ => {
                    entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
                    Ok(true)
                }
            }
        }

        fn compare_and_delete(&self, key: &str, expected: &str) -> RedLockResult<u64> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(RedLockError::PoolError("connection refused".to_string()));
            }
            let mut entries = self.store.entries.lock().unwrap();
            match entries.get(key) {
                Some((value, expires)) if value == expected && *expires > Instant::now() => {
                    entries.remove(key);
                    Ok(1)
                }
                _ => Ok(0),
            }
        }

        fn name(&self) -> &str {
            &self.label
        }
    }

    fn stores(count: usize) -> Vec<Arc<MemoryStore>> {
        (0..count).map(|_| Arc::new(MemoryStore::default())).collect()
    }

    fn nodes_over(stores: &[Arc<MemoryStore>]) -> Vec<Arc<MemoryNode>> {
        stores
            .iter()
            .enumerate()
            .map(|(i, store)| MemoryNode::new(format!("node-{i}"), store.clone()))
            .collect()
    }

    fn handles(nodes: &[Arc<MemoryNode>]) -> Vec<Arc<dyn NodeHandle>> {
        nodes
            .iter()
            .map(|n| n.clone() as Arc<dyn NodeHandle>)
            .collect()
    }

    fn test_config() -> RedLockConfig {
        RedLockConfig::default()
            .with_retry_count(3)
            .with_retry_delay(Duration::from_millis(20))
    }

    #[test]
    fn acquire_grants_lock_with_positive_validity() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();

        let (lock, acquired) = redlock
            .acquire("jobs:refresh", Duration::from_secs(10))
            .unwrap();
        assert!(acquired);
        assert!(lock.validity > 0 && lock.validity <= 10_000);
        for node in &nodes {
            assert!(node.holds("jobs:refresh", &lock.token));
        }
    }

    #[test]
    fn contended_resource_exhausts_retries_without_error() {
        let stores = stores(3);
        let first = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();
        let second = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();

        let (held, acquired) = first.acquire("reports", Duration::from_secs(30)).unwrap();
        assert!(acquired);

        let started = Instant::now();
        let (lost, acquired) = second.acquire("reports", Duration::from_secs(30)).unwrap();
        assert!(!acquired);
        assert_eq!(lost.validity, 0);
        assert_eq!(lost.resource, "reports");
        assert!(!lost.token.is_empty());
        assert_ne!(lost.token, held.token);
        // three attempts, each followed by the configured back-off
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn acquire_succeeds_after_holder_releases() {
        let stores = stores(3);
        let first = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();
        let second = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();

        let (lock, acquired) = first.acquire("res-A", Duration::from_secs(10)).unwrap();
        assert!(acquired);
        let (_, acquired) = second.acquire("res-A", Duration::from_secs(10)).unwrap();
        assert!(!acquired);

        first.release(&lock).unwrap();
        let (relock, acquired) = second.acquire("res-A", Duration::from_secs(10)).unwrap();
        assert!(acquired);
        assert!(relock.validity > 0);
    }

    #[test]
    fn expired_hold_no_longer_blocks_acquisition() {
        let stores = stores(3);
        let first = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();
        let second = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();

        let (_, acquired) = first.acquire("flash", Duration::from_millis(30)).unwrap();
        assert!(acquired);
        thread::sleep(Duration::from_millis(40));

        let (lock, acquired) = second.acquire("flash", Duration::from_secs(5)).unwrap();
        assert!(acquired);
        assert!(lock.validity > 0);
    }

    #[test]
    fn release_clears_every_node_and_is_repeatable() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();

        let (lock, acquired) = redlock.acquire("cleanup", Duration::from_secs(10)).unwrap();
        assert!(acquired);
        redlock.release(&lock).unwrap();
        for node in &nodes {
            assert!(!node.holds("cleanup", &lock.token));
        }
        // zero affected rows everywhere is a normal outcome
        redlock.release(&lock).unwrap();
    }

    #[test]
    fn release_with_foreign_token_leaves_holder_in_place() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();

        for node in &nodes {
            assert!(node
                .set_if_absent("shared", "someone-else", Duration::from_secs(60))
                .unwrap());
        }
        let foreign = Lock {
            validity: 1_000,
            resource: "shared".to_string(),
            token: "not-the-holder".to_string(),
        };
        redlock.release(&foreign).unwrap();
        for node in &nodes {
            assert!(node.holds("shared", "someone-else"));
        }
    }

    #[test]
    fn release_aggregates_node_failures_after_trying_all() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();

        let (lock, acquired) = redlock.acquire("billing", Duration::from_secs(10)).unwrap();
        assert!(acquired);

        nodes[1].fail_deletes.store(true, Ordering::SeqCst);
        match redlock.release(&lock) {
            Err(RedLockError::Lock(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("node-1"));
            }
            other => panic!("expected aggregated lock error, got {:?}", other.err()),
        }
        // the failing node never blocked the remaining ones
        assert!(!nodes[0].holds("billing", &lock.token));
        assert!(!nodes[2].holds("billing", &lock.token));
    }

    #[test]
    fn node_error_despite_quorum_fails_the_acquisition() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();

        nodes[2].fail_writes.store(true, Ordering::SeqCst);
        match redlock.acquire("strict", Duration::from_secs(10)) {
            Err(RedLockError::Lock(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("node-2"));
            }
            other => panic!("expected aggregated lock error, got {:?}", other),
        }
        // the healthy majority keeps the token until the TTL lapses
        let entries = stores[0].entries.lock().unwrap();
        assert!(entries.contains_key("strict"));
    }

    #[test]
    fn construction_fails_below_quorum() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        nodes[0].fail_writes.store(true, Ordering::SeqCst);
        nodes[1].fail_writes.store(true, Ordering::SeqCst);

        match RedLock::with_nodes(handles(&nodes), &test_config()) {
            Err(RedLockError::Condition(reason)) => {
                assert!(reason.contains("1/3"));
            }
            other => panic!("expected condition error, got {:?}", other.err()),
        }
    }

    #[test]
    fn construction_tolerates_minority_probe_failure() {
        let stores = stores(3);
        let nodes = nodes_over(&stores);
        nodes[0].fail_writes.store(true, Ordering::SeqCst);

        let redlock = RedLock::with_nodes(handles(&nodes), &test_config()).unwrap();
        assert_eq!(redlock.quorum(), 2);
        let (lock, acquired) = redlock.acquire("partial", Duration::from_secs(10)).unwrap();
        assert!(acquired);
        assert!(nodes[1].holds("partial", &lock.token));
        assert!(nodes[2].holds("partial", &lock.token));
    }

    #[test]
    fn acquire_rejects_empty_resource_and_zero_ttl() {
        let stores = stores(3);
        let redlock = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();

        assert!(matches!(
            redlock.acquire("", Duration::from_secs(1)),
            Err(RedLockError::InvalidOperation(_))
        ));
        assert!(matches!(
            redlock.acquire("key", Duration::ZERO),
            Err(RedLockError::InvalidOperation(_))
        ));
    }

    #[test]
    fn deadline_cuts_the_retry_loop_short() {
        let stores = stores(3);
        let first = RedLock::with_nodes(handles(&nodes_over(&stores)), &test_config()).unwrap();
        let config = test_config().with_retry_count(10).with_retry_delay(Duration::from_millis(50));
        let second = RedLock::with_nodes(handles(&nodes_over(&stores)), &config).unwrap();

        let (_, acquired) = first.acquire("busy", Duration::from_secs(30)).unwrap();
        assert!(acquired);

        let started = Instant::now();
        let deadline = started + Duration::from_millis(120);
        let (_, acquired) = second
            .acquire_until("busy", Duration::from_secs(30), Some(deadline))
            .unwrap();
        assert!(!acquired);
        // ten retries at 50ms would sleep 500ms; the deadline stops well short
        assert!(started.elapsed() < Duration::from_millis(400));
    }
}

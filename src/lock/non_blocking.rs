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
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::RedLockConfig;
use crate::errors::{RedLockError, RedLockResult};
use crate::lock::{validate_acquire_args, Attempt, Lock};
use crate::node::{AsyncNodeHandle, AsyncRedisNode};
use crate::util::{calculate_drift, calculate_quorum, generate_token, num_milliseconds};

/// === AsyncRedLock (asynchronous quorum lock) ===
///
/// Same algorithm as [`RedLock`](crate::RedLock); per-node calls within an
/// attempt are fanned out concurrently, which shortens the attempt and so
/// widens the validity margin.
pub struct AsyncRedLock {
    nodes: Vec<Arc<dyn AsyncNodeHandle>>,
    quorum: usize,
    retry_count: u32,
    retry_delay: Duration,
    drift_factor: f64,
    drift_offset: Duration,
}

impl AsyncRedLock {
    pub async fn connect(config: &RedLockConfig) -> RedLockResult<Self> {
        config.validate()?;
        let mut handles: Vec<Arc<dyn AsyncNodeHandle>> = Vec::with_capacity(config.nodes.len());
        for node in &config.nodes {
            handles.push(Arc::new(AsyncRedisNode::new(node, config)?));
        }
        Self::with_nodes(handles, config).await
    }

    /// Builds the instance over pre-built node handles; the quorum is fixed
    /// from the number supplied, not from how many answer the probe.
    pub async fn with_nodes(
        nodes: Vec<Arc<dyn AsyncNodeHandle>>,
        config: &RedLockConfig,
    ) -> RedLockResult<Self> {
        if config.retry_count == 0 {
            return Err(RedLockError::ConfigError(
                "retry count cannot be zero".to_string(),
            ));
        }

        let requested = nodes.len();
        let quorum = calculate_quorum(requested);

        let mut healthy: Vec<Arc<dyn AsyncNodeHandle>> = Vec::with_capacity(requested);
        for node in nodes {
            if node.probe().await {
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

    pub async fn acquire(&self, resource: &str, ttl: Duration) -> RedLockResult<(Lock, bool)> {
        self.acquire_until(resource, ttl, None).await
    }

    /// Same as [`acquire`](Self::acquire), but gives up early instead of
    /// sleeping past `deadline`.
    pub async fn acquire_until(
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

            let outcome = self.try_once(resource, &token, ttl, ttl_ms, drift_ms).await;

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

            self.rollback(resource, &token).await;
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
            sleep(self.retry_delay).await;
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

    /// One pass over every node, fanned out concurrently. Results are
    /// collected in node order; one node's failure never cancels the rest.
    async fn try_once(
        &self,
        resource: &str,
        token: &str,
        ttl: Duration,
        ttl_ms: i64,
        drift_ms: i64,
    ) -> Attempt {
        let start = Instant::now();

        let mut tasks = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let node = node.clone();
            let resource = resource.to_string();
            let token = token.to_string();
            tasks.push(tokio::spawn(async move {
                let result = node.set_if_absent(&resource, &token, ttl).await;
                (node.name().to_string(), result)
            }));
        }

        // Collecting results
        let mut successes = 0;
        let mut errors = Vec::new();
        for (i, task) in tasks.into_iter().enumerate() {
            match task.await {
                Ok((node, Ok(true))) => {
                    debug!(node = %node, resource, "node accepted the lock");
                    successes += 1;
                }
                Ok((node, Ok(false))) => {
                    debug!(node = %node, resource, "resource already locked on node");
                }
                Ok((node, Err(e))) => {
                    warn!(node = %node, resource, error = %e, "lock attempt failed on node");
                    errors.push(format!("node [{}]: {}", node, e));
                }
                Err(e) => {
                    let node = self.nodes[i].name();
                    warn!(node, resource, error = %e, "node task failed");
                    errors.push(format!("node [{}]: {}", node, RedLockError::from(e)));
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
    async fn rollback(&self, resource: &str, token: &str) {
        let mut tasks = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let node = node.clone();
            let resource = resource.to_string();
            let token = token.to_string();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = node.compare_and_delete(&resource, &token).await {
                    warn!(node = node.name(), resource = %resource, error = %e, "rollback failed on node");
                }
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Releases a held lock on every node, unconditionally. Zero affected
    /// rows on a node means the lease already expired there — a normal
    /// outcome. Per-node failures are collected across the full set and
    /// surfaced together.
    pub async fn release(&self, lock: &Lock) -> RedLockResult<()> {
        let mut tasks = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let node = node.clone();
            let resource = lock.resource.clone();
            let token = lock.token.clone();
            tasks.push(tokio::spawn(async move {
                let result = node.compare_and_delete(&resource, &token).await;
                (node.name().to_string(), result)
            }));
        }

        let mut errors = Vec::new();
        for (i, task) in tasks.into_iter().enumerate() {
            match task.await {
                Ok((node, Ok(removed))) => {
                    debug!(node = %node, resource = %lock.resource, removed, "release executed on node");
                }
                Ok((node, Err(e))) => {
                    warn!(node = %node, resource = %lock.resource, error = %e, "release failed on node");
                    errors.push(format!("node [{}]: {}", node, e));
                }
                Err(e) => {
                    let node = self.nodes[i].name();
                    warn!(node, resource = %lock.resource, error = %e, "node task failed");
                    errors.push(format!("node [{}]: {}", node, RedLockError::from(e)));
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

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
use std::time::Duration;
use uuid::Uuid;

use crate::config::{NodeConfig, RedLockConfig};
use crate::connection::SyncNodeConnectionManager;
use crate::errors::RedLockResult;
use crate::scripts;
use crate::util::num_milliseconds;

/// Capability of one independent store, the only boundary the lock core
/// depends on.
pub trait NodeHandle: Send + Sync {
    /// `SET key value NX PX ttl` — set only while the key is absent, with
    /// the TTL applied in the same atomic step.
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> RedLockResult<bool>;

    /// Delete `key` only while its value equals `expected`, as a single
    /// server-side operation. Returns the number of keys removed; zero is
    /// a normal outcome, not an error.
    fn compare_and_delete(&self, key: &str, expected: &str) -> RedLockResult<u64>;

    /// Address used in logs and aggregated error messages.
    fn name(&self) -> &str;

    /// Throwaway write proving the node can round-trip an atomic set.
    fn probe(&self) -> bool {
        let key = format!("redlock:probe:{}", Uuid::new_v4());
        self.set_if_absent(&key, "1", Duration::from_secs(1))
            .unwrap_or(false)
    }
}

/// === RedisNode (one pooled Redis server) ===
pub struct RedisNode {
    manager: SyncNodeConnectionManager,
    address: String,
}

impl RedisNode {
    pub fn new(node: &NodeConfig, config: &RedLockConfig) -> RedLockResult<Self> {
        Ok(Self {
            manager: SyncNodeConnectionManager::new(node, config)?,
            address: node.address(),
        })
    }
}

impl NodeHandle for RedisNode {
    fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> RedLockResult<bool> {
        let mut conn = self.manager.get_connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(num_milliseconds(&ttl))
            .query(&mut conn)?;
        Ok(reply.is_some())
    }

    fn compare_and_delete(&self, key: &str, expected: &str) -> RedLockResult<u64> {
        let mut conn = self.manager.get_connection()?;
        let removed: u64 = scripts::RELEASE_SCRIPT
            .key(key)
            .arg(expected)
            .invoke(&mut conn)?;
        Ok(removed)
    }

    fn name(&self) -> &str {
        &self.address
    }
}

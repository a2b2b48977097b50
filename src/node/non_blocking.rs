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
use crate::connection::AsyncNodeConnectionManager;
use crate::errors::RedLockResult;
use crate::scripts;
use crate::util::num_milliseconds;

/// Asynchronous counterpart of [`NodeHandle`](crate::NodeHandle).
#[async_trait::async_trait]
pub trait AsyncNodeHandle: Send + Sync {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> RedLockResult<bool>;

    async fn compare_and_delete(&self, key: &str, expected: &str) -> RedLockResult<u64>;

    fn name(&self) -> &str;

    async fn probe(&self) -> bool {
        let key = format!("redlock:probe:{}", Uuid::new_v4());
        self.set_if_absent(&key, "1", Duration::from_secs(1))
            .await
            .unwrap_or(false)
    }
}

/// === AsyncRedisNode (one pooled Redis server) ===
pub struct AsyncRedisNode {
    manager: AsyncNodeConnectionManager,
    address: String,
}

impl AsyncRedisNode {
    pub fn new(node: &NodeConfig, config: &RedLockConfig) -> RedLockResult<Self> {
        Ok(Self {
            manager: AsyncNodeConnectionManager::new(node, config)?,
            address: node.address(),
        })
    }
}

#[async_trait::async_trait]
impl AsyncNodeHandle for AsyncRedisNode {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> RedLockResult<bool> {
        let mut conn = self.manager.get_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(num_milliseconds(&ttl))
            .query_async(&mut *conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> RedLockResult<u64> {
        let mut conn = self.manager.get_connection().await?;
        let removed: u64 = scripts::RELEASE_SCRIPT
            .key(key)
            .arg(expected)
            .invoke_async(&mut *conn)
            .await?;
        Ok(removed)
    }

    fn name(&self) -> &str {
        &self.address
    }
}

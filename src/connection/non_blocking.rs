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
use deadpool::managed::Metrics;
use deadpool::Runtime;
use redis::Client;
use std::time::Duration;

use crate::config::{NodeConfig, RedLockConfig};
use crate::connection::build_connection_info;
use crate::errors::{RedLockError, RedLockResult};

type AsyncNodePool = deadpool::managed::Pool<AsyncNodePoolManager>;

pub type AsyncNodeConnection = deadpool::managed::Object<AsyncNodePoolManager>;

pub struct AsyncNodePoolManager {
    client: Client,
    database: Option<i64>,
}

impl deadpool::managed::Manager for AsyncNodePoolManager {
    type Type = redis::aio::MultiplexedConnection;
    type Error = redis::RedisError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(db) = self.database {
            redis::cmd("SELECT")
                .arg(db)
                .query_async::<()>(&mut conn)
                .await?;
        }

        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _metrics: &Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        // Check that the connection is still valid
        match redis::cmd("PING").query_async::<String>(conn).await {
            Ok(pong) if pong == "PONG" => Ok(()),
            Ok(_) => Err(deadpool::managed::RecycleError::Message(
                "Invalid PONG response".into(),
            )),
            Err(e) => Err(deadpool::managed::RecycleError::Backend(e)),
        }
    }
}

/// Asynchronous connection pool for one node.
pub struct AsyncNodeConnectionManager {
    pool: AsyncNodePool,
    address: String,
}

impl AsyncNodeConnectionManager {
    pub fn new(node: &NodeConfig, config: &RedLockConfig) -> RedLockResult<Self> {
        let client = Client::open(build_connection_info(node)?)
            .map_err(|e| RedLockError::PoolError(e.to_string()))?;

        let manager = AsyncNodePoolManager {
            client,
            database: node.database,
        };

        let pool = deadpool::managed::Pool::builder(manager)
            .max_size(config.pool_size as usize)
            .timeouts(deadpool::managed::Timeouts {
                wait: Some(config.connection_timeout),
                create: Some(config.connection_timeout),
                recycle: Some(Duration::from_secs(5)),
            })
            .runtime(Runtime::Tokio1)
            .build()?;

        Ok(Self {
            pool,
            address: node.address(),
        })
    }

    pub async fn get_connection(&self) -> RedLockResult<AsyncNodeConnection> {
        self.pool.get().await.map_err(RedLockError::from)
    }

    pub async fn health_check(&self) -> bool {
        match self.get_connection().await {
            Ok(mut conn) => {
                match redis::cmd("PING").query_async::<String>(&mut *conn).await {
                    Ok(pong) => pong == "PONG",
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

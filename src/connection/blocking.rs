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
use r2d2::{Pool, PooledConnection};
use redis::Client;

use crate::config::{NodeConfig, RedLockConfig};
use crate::connection::build_connection_info;
use crate::errors::{RedLockError, RedLockResult};

type NodePool = Pool<Client>;

pub type SyncNodeConnection = PooledConnection<Client>;

/// Synchronous connection pool for one node.
pub struct SyncNodeConnectionManager {
    pool: NodePool,
    address: String,
}

impl SyncNodeConnectionManager {
    pub fn new(node: &NodeConfig, config: &RedLockConfig) -> RedLockResult<Self> {
        let client = Client::open(build_connection_info(node)?)
            .map_err(|e| RedLockError::PoolError(e.to_string()))?;

        // Lazy pool: whether the node is reachable is decided by the
        // construction probe, not by pool setup.
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(0))
            .connection_timeout(config.connection_timeout)
            .test_on_check_out(true)
            .build_unchecked(client);

        Ok(Self {
            pool,
            address: node.address(),
        })
    }

    pub fn get_connection(&self) -> RedLockResult<SyncNodeConnection> {
        self.pool.get().map_err(RedLockError::from)
    }

    pub fn health_check(&self) -> bool {
        match self.get_connection() {
            Ok(mut conn) => match redis::cmd("PING").query::<String>(&mut conn) {
                Ok(pong) => pong == "PONG",
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

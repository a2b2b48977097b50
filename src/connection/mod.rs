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
mod blocking;
mod non_blocking;

pub use blocking::*;
pub use non_blocking::*;

use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

use crate::config::NodeConfig;
use crate::errors::{RedLockError, RedLockResult};

/// Builds the connection information for one node from either its URL or
/// its host/port pair, layering on authentication and database settings.
pub(crate) fn build_connection_info(node: &NodeConfig) -> RedLockResult<ConnectionInfo> {
    let mut info: ConnectionInfo = if !node.url.is_empty() {
        node.url.as_str().into_connection_info()?
    } else if let (Some(host), Some(port)) = (&node.host, node.port) {
        let addr = if node.ssl {
            ConnectionAddr::TcpTls {
                host: host.clone(),
                port,
                insecure: false,
                tls_params: None,
            }
        } else {
            ConnectionAddr::Tcp(host.clone(), port)
        };
        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo::default(),
        }
    } else {
        return Err(RedLockError::ConfigError(
            "node requires either a URL or host/port".to_string(),
        ));
    };

    if let Some(username) = &node.username {
        info.redis.username = Some(username.clone());
    }
    if let Some(password) = &node.password {
        info.redis.password = Some(password.clone());
    }
    if let Some(db) = node.database {
        info.redis.db = db;
    }
    Ok(info)
}

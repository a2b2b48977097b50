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

use redis::RedisError;
use thiserror::Error;

pub type RedLockResult<T> = std::result::Result<T, RedLockError>;

#[derive(Error, Debug)]
pub enum RedLockError {
    #[error("Redis error: {0}")]
    RedisError(#[from] RedisError),

    /// The node set cannot satisfy its quorum. Raised only at construction
    /// and never retried.
    #[error("Unsatisfiable node set: {0}")]
    Condition(String),

    /// Aggregated per-node failures from an acquire or release pass, in
    /// node order.
    #[error("{}", .0.join("::"))]
    Lock(Vec<String>),

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Async runtime error: {0}")]
    AsyncError(String),
}

impl From<r2d2::Error> for RedLockError {
    fn from(err: r2d2::Error) -> Self {
        RedLockError::PoolError(err.to_string())
    }
}

impl From<deadpool::managed::PoolError<RedisError>> for RedLockError {
    fn from(err: deadpool::managed::PoolError<RedisError>) -> Self {
        RedLockError::PoolError(err.to_string())
    }
}

impl From<deadpool::managed::BuildError> for RedLockError {
    fn from(err: deadpool::managed::BuildError) -> Self {
        RedLockError::PoolError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RedLockError {
    fn from(err: tokio::task::JoinError) -> Self {
        RedLockError::AsyncError(err.to_string())
    }
}

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
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{RedLockError, RedLockResult};

/// One independent Redis node backing the lock. Either `url` or
/// `host`/`port` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub url: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// User name
    pub username: Option<String>,
    /// PASSWORD
    pub password: Option<String>,
    /// Database number
    pub database: Option<i64>,
    /// SSL enabled or not
    pub ssl: bool,
}

impl NodeConfig {
    pub fn from_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            ssl: false,
        }
    }

    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self {
            url: String::new(),
            host: Some(host.to_string()),
            port: Some(port),
            username: None,
            password: None,
            database: None,
            ssl: false,
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_database(mut self, db: i64) -> Self {
        self.database = Some(db);
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Human-readable address used in logs and error messages.
    pub fn address(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        match (&self.host, self.port) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            _ => "<unconfigured>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedLockConfig {
    /// The independent nodes forming the quorum set
    pub nodes: Vec<NodeConfig>,
    /// Gets the number of lock retries
    pub retry_count: u32,
    /// Retry latency
    pub retry_delay: Duration,
    /// Clock offset factor, as a fraction of the requested TTL
    pub drift_factor: f64,
    /// Flat addition to the drift reserve
    pub drift_offset: Duration,
    /// Connection pool size per node
    pub pool_size: u32,
    /// Connection timeout time
    pub connection_timeout: Duration,
    /// Response timeout time
    pub response_timeout: Duration,
}

impl Default for RedLockConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            retry_count: 3,
            retry_delay: Duration::from_millis(200),
            drift_factor: 0.01,
            drift_offset: Duration::from_millis(2),
            pool_size: 4,
            connection_timeout: Duration::from_secs(3),
            response_timeout: Duration::from_secs(3),
        }
    }
}

impl RedLockConfig {
    pub fn new(nodes: Vec<NodeConfig>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_drift_factor(mut self, factor: f64) -> Self {
        self.drift_factor = factor;
        self
    }

    pub fn with_drift_offset(mut self, offset: Duration) -> Self {
        self.drift_offset = offset;
        self
    }

    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn validate(&self) -> RedLockResult<()> {
        if self.nodes.is_empty() {
            return Err(RedLockError::ConfigError(
                "at least one node must be configured".to_string(),
            ));
        }
        for node in &self.nodes {
            if node.url.is_empty() && (node.host.is_none() || node.port.is_none()) {
                return Err(RedLockError::ConfigError(
                    "node requires either a URL or host/port".to_string(),
                ));
            }
        }
        if self.retry_count == 0 {
            return Err(RedLockError::ConfigError(
                "retry count cannot be zero".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(RedLockError::ConfigError(
                "pool size cannot be zero".to_string(),
            ));
        }
        if !self.drift_factor.is_finite() || self.drift_factor < 0.0 {
            return Err(RedLockError::ConfigError(
                "drift factor must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let config = RedLockConfig::default();
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(200));
        assert_eq!(config.drift_factor, 0.01);
        assert_eq!(config.drift_offset, Duration::from_millis(2));
    }

    #[test]
    fn builders_chain() {
        let config = RedLockConfig::new(vec![NodeConfig::from_host_port("127.0.0.1", 6379)])
            .with_retry_count(5)
            .with_retry_delay(Duration::from_millis(50))
            .with_drift_factor(0.02);
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(50));
        assert_eq!(config.drift_factor, 0.02);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_node_list() {
        let config = RedLockConfig::default();
        assert!(matches!(
            config.validate(),
            Err(RedLockError::ConfigError(_))
        ));
    }

    #[test]
    fn validate_rejects_unaddressable_node() {
        let mut node = NodeConfig::from_url("");
        node.host = Some("127.0.0.1".to_string());
        let config = RedLockConfig::new(vec![node]);
        assert!(matches!(
            config.validate(),
            Err(RedLockError::ConfigError(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_retry_count() {
        let config =
            RedLockConfig::new(vec![NodeConfig::from_url("redis://127.0.0.1:6379")])
                .with_retry_count(0);
        assert!(matches!(
            config.validate(),
            Err(RedLockError::ConfigError(_))
        ));
    }

    #[test]
    fn node_address_prefers_url() {
        assert_eq!(
            NodeConfig::from_url("redis://10.0.0.1:6379").address(),
            "redis://10.0.0.1:6379"
        );
        assert_eq!(
            NodeConfig::from_host_port("10.0.0.2", 6380).address(),
            "10.0.0.2:6380"
        );
    }
}

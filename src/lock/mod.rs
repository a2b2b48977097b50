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

use std::time::Duration;

use crate::errors::{RedLockError, RedLockResult};

/// === Lock record handed to the caller on acquisition ===
///
/// Only meaningful when returned together with `acquired = true`; the
/// exhaustion outcome carries `validity = 0` and the last token generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    /// Estimated remaining lease at the moment of acquisition, in
    /// milliseconds. Informational: nodes expire the key on their own.
    pub validity: i64,
    /// The contended key, as supplied by the caller.
    pub resource: String,
    /// Per-acquisition unique value proving ownership on release.
    pub token: String,
}

impl Lock {
    pub fn validity_duration(&self) -> Duration {
        Duration::from_millis(self.validity.max(0) as u64)
    }
}

/// Tally of one acquisition attempt across the node set.
pub(crate) struct Attempt {
    pub(crate) validity: i64,
    pub(crate) successes: usize,
    pub(crate) errors: Vec<String>,
}

pub(crate) fn validate_acquire_args(resource: &str, ttl: Duration) -> RedLockResult<()> {
    if resource.is_empty() {
        return Err(RedLockError::InvalidOperation(
            "resource name cannot be empty".to_string(),
        ));
    }
    if ttl.is_zero() {
        return Err(RedLockError::InvalidOperation(
            "lock TTL must be positive".to_string(),
        ));
    }
    Ok(())
}

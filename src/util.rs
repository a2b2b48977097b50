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

/// Minimum number of nodes that must accept a write for it to count.
pub fn calculate_quorum(n: usize) -> usize {
    n / 2 + 1
}

/// Time reserved for clock skew between nodes plus the round trips spent
/// acquiring, subtracted from the nominal TTL when computing validity.
pub fn calculate_drift(ttl: Duration, drift_factor: f64, drift_offset: Duration) -> Duration {
    let drift_ms = (ttl.as_millis() as f64 * drift_factor).ceil() as u64;
    Duration::from_millis(drift_ms) + drift_offset
}

/// Per-attempt lock token: two independent 128-bit identifiers, so release
/// can never delete a lock written by another caller.
pub fn generate_token() -> String {
    format!("{}-{}", Uuid::new_v4(), Uuid::new_v4())
}

pub fn num_milliseconds(duration: &Duration) -> u64 {
    duration.as_millis() as u64
}

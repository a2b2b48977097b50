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
use std::time::{Duration, Instant};

use redlock::{AsyncRedLock, NodeConfig, RedLockConfig, RedLockResult};

#[tokio::main]
async fn main() -> RedLockResult<()> {
    tracing_subscriber::fmt::init();

    let config = RedLockConfig::new(vec![
        NodeConfig::from_url("redis://127.0.0.1:6379/5"),
        NodeConfig::from_url("redis://127.0.0.1:6389/5"),
        NodeConfig::from_url("redis://127.0.0.1:6399/5"),
    ])
    .with_retry_count(5)
    .with_retry_delay(Duration::from_millis(100));

    let redlock = AsyncRedLock::connect(&config).await?;

    // Bounded wait: stop retrying once the deadline passes
    let deadline = Instant::now() + Duration::from_secs(2);
    let (lock, acquired) = redlock
        .acquire_until("inventory:rebalance", Duration::from_secs(30), Some(deadline))
        .await?;

    if acquired {
        println!(
            "lock held on {:?}, about {}ms of lease remaining",
            lock.resource, lock.validity
        );
        redlock.release(&lock).await?;
        println!("lock released");
    } else {
        println!("could not take the lock before the deadline");
    }

    Ok(())
}

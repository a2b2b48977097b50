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

use redlock::{NodeConfig, RedLock, RedLockConfig, RedLockResult};

fn main() -> RedLockResult<()> {
    tracing_subscriber::fmt::init();

    // 1. Three independent nodes form the quorum set
    let config = RedLockConfig::new(vec![
        NodeConfig::from_url("redis://127.0.0.1:6379/5"),
        NodeConfig::from_url("redis://127.0.0.1:6389/5"),
        NodeConfig::from_url("redis://127.0.0.1:6399/5"),
    ]);

    // 2. Build the instance (probes every node once)
    let redlock = RedLock::connect(&config)?;

    // 3. Acquire, work under the lease, release
    let (lock, acquired) = redlock.acquire("orders:settlement", Duration::from_secs(100))?;
    if acquired {
        println!(
            "lock held on {:?}, about {}ms of lease remaining",
            lock.resource, lock.validity
        );

        // ... protected work goes here ...

        redlock.release(&lock)?;
        println!("lock released");
    } else {
        println!("resource is busy, try again later");
    }

    Ok(())
}

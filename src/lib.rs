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

//! Quorum-based distributed lock over independent Redis nodes.
//!
//! A lock is taken by writing one unguessable token to a majority of an
//! odd-sized set of uncoordinated nodes, each write carrying the lease TTL.
//! A minority of node failures is tolerated; release proves ownership with
//! an atomic server-side compare-and-delete. Blocking ([`RedLock`]) and
//! asynchronous ([`AsyncRedLock`]) front ends share the same algorithm.

mod config;
mod errors;
mod util;
mod connection;
mod node;
mod lock;
mod scripts;

pub use config::*;
pub use connection::*;
pub use errors::*;
pub use lock::*;
pub use node::*;
pub use scripts::*;
pub use util::*;

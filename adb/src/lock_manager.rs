// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Named mutual-exclusion leases.
//!
//! Any string can name a lock. Waiters are served in FIFO order. The lease is released when
//! its [LockGuard] is dropped, so every exit path of the holder releases it, including early
//! returns and cancellation. Entries are dropped from the table once nobody holds or waits
//! for them.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::{Error, Result};

struct LockEntry {
    mutex: Arc<tokio::sync::Mutex<()>>,
    // Holders and waiters
    users: usize,
}

type LockTable = Arc<Mutex<HashMap<String, LockEntry>>>;

/// Registration of one holder or waiter of a named lock
struct Lease {
    name: String,
    table: LockTable,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        if let Some(entry) = table.get_mut(&self.name) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                table.remove(&self.name);
            }
        }
    }
}

#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    // Declared before the lease so the mutex is released before the entry is cleaned up
    _guard: OwnedMutexGuard<()>,
    lease: Lease,
}

impl LockGuard {
    pub fn name(&self) -> &str {
        &self.lease.name
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LockGuard").field(&self.lease.name).finish()
    }
}

#[derive(Clone, Default)]
pub struct LockManager {
    table: LockTable,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, name: impl Into<String>) -> LockGuard {
        let name = name.into();
        let mutex = {
            let mut table = self.table.lock();
            let entry = table.entry(name.clone()).or_insert_with(|| LockEntry {
                mutex: Arc::new(tokio::sync::Mutex::new(())),
                users: 0,
            });
            entry.users += 1;
            Arc::clone(&entry.mutex)
        };
        let lease = Lease {
            name,
            table: Arc::clone(&self.table),
        };
        let guard = mutex.lock_owned().await;
        LockGuard {
            _guard: guard,
            lease,
        }
    }

    /// Like [LockManager::lock] but gives up after `timeout`
    pub async fn lock_timeout(&self, name: impl Into<String>, timeout: Duration) -> Result<LockGuard> {
        let name = name.into();
        tokio::time::timeout(timeout, self.lock(name.clone()))
            .await
            .map_err(|_| Error::LockTimeout(name))
    }

    /// Number of locks currently held or waited for
    pub fn active_locks(&self) -> usize {
        self.table.lock().len()
    }
}

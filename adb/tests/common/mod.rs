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

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use adb::{database::DbContext, AdbConfig, DbManager, Principal, ProcessConfig};
use storage_inmemory::InMemoryBackend;
use test_utils::mock_time_getter::mocked_time_getter_seconds;

pub struct TestEnv {
    pub manager: DbManager,
    pub backend: InMemoryBackend,
    pub clock: Arc<AtomicU64>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(AdbConfig::default()).await
    }

    pub async fn with_config(config: AdbConfig) -> Self {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(AtomicU64::new(1));
        let manager = DbManager::setup_with_context(
            context(&backend, &clock, config),
            ProcessConfig::default(),
        )
        .await
        .unwrap();
        Self {
            manager,
            backend,
            clock,
        }
    }

    pub fn context(&self) -> DbContext {
        self.manager.databases().context().clone()
    }

    pub fn advance_clock(&self, by: Duration) {
        self.clock.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn now(&self) -> Duration {
        Duration::from_secs(self.clock.load(Ordering::SeqCst))
    }
}

pub fn context(backend: &InMemoryBackend, clock: &Arc<AtomicU64>, config: AdbConfig) -> DbContext {
    DbContext::new(Arc::new(backend.clone()), config)
        .with_time_getter(mocked_time_getter_seconds(Arc::clone(clock)))
}

pub fn alice() -> Principal {
    Principal::new("alice", "app")
}

pub fn bob() -> Principal {
    Principal::new("bob", "app")
}

pub fn system() -> Principal {
    Principal::system("system")
}

/// Poll `cond` until it holds, giving background tasks a chance to run
pub async fn eventually<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

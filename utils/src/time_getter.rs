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

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

pub type TimeGetterFn = dyn Fn() -> Duration + Send + Sync;

/// Source of monotonic timestamps used for access tracking and eviction decisions.
///
/// The default getter measures the time elapsed since the getter was created using the
/// tokio clock, so paused-time tests advance it too. Tests that need full control can supply
/// their own function.
#[derive(Clone)]
pub struct TimeGetter {
    f: Arc<TimeGetterFn>,
}

impl TimeGetter {
    pub fn new(f: Arc<TimeGetterFn>) -> Self {
        Self { f }
    }

    pub fn get_time(&self) -> Duration {
        (self.f)()
    }
}

impl Default for TimeGetter {
    fn default() -> Self {
        let base = Instant::now();
        Self::new(Arc::new(move || base.elapsed()))
    }
}

impl std::fmt::Debug for TimeGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeGetter").finish_non_exhaustive()
    }
}

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

use std::time::Duration;

use utils::make_config_setting;

use crate::DbId;

make_config_setting!(KeepInMemoryTtl, Duration, Duration::from_secs(15));
make_config_setting!(SweepInterval, Duration, Duration::from_secs(10));
make_config_setting!(ReadTimeout, Duration, Duration::from_secs(10));
make_config_setting!(WatchDebounce, Duration, Duration::from_secs(5));
make_config_setting!(BlobChunkSize, usize, 64 * 1024);
make_config_setting!(BlobSetupRetryInterval, Duration, Duration::from_secs(5));
make_config_setting!(BlobSetupRetryMaxInterval, Duration, Duration::from_secs(60));
make_config_setting!(SystemServiceKey, String, "system".to_owned());

/// Tunables of the database core
#[derive(Debug, Clone, Default)]
pub struct AdbConfig {
    /// How long a database stays loaded after its last access
    pub keep_in_memory_ttl: KeepInMemoryTtl,
    /// How often idle databases are looked for
    pub sweep_interval: SweepInterval,
    /// Deadline of every store read
    pub read_timeout: ReadTimeout,
    /// Quiet period before a watch callback fires
    pub watch_debounce: WatchDebounce,
    pub blob_chunk_size: BlobChunkSize,
    pub blob_setup_retry_interval: BlobSetupRetryInterval,
    pub blob_setup_retry_max_interval: BlobSetupRetryMaxInterval,
    /// Service key of the server itself; it may act on behalf of any user
    pub system_service_key: SystemServiceKey,
}

/// Process-level settings supplied by whoever starts the server
#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    /// Registry database to attach to. A new one is created if `None`.
    pub server_db_id: Option<DbId>,
}

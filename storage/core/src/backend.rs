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

//! Traits implemented by storage backends

use std::{ops::Range, sync::Arc};

use tokio::sync::broadcast;

use crate::{Data, DbKey, DiscoveryKey, Entry, KeyRange, Result, StoreDiff};

/// Whether a structure is announced to and looked up on the replication network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkMode {
    pub announce: bool,
    pub lookup: bool,
}

impl NetworkMode {
    pub const SWARM: Self = Self {
        announce: true,
        lookup: true,
    };
    pub const OFF: Self = Self {
        announce: false,
        lookup: false,
    };
}

/// An append-only log presented as an ordered key-value map.
///
/// Every write appends to the log and bumps [OrderedStore::version]. Only the replica holding
/// the secret key can write, others fail with [crate::Error::ReadOnly].
#[async_trait::async_trait]
pub trait OrderedStore: Send + Sync {
    fn key(&self) -> DbKey;

    fn discovery_key(&self) -> DiscoveryKey {
        self.key().discovery_key()
    }

    fn writable(&self) -> bool;

    /// Length of the underlying log
    fn version(&self) -> u64;

    async fn get(&self, key: &[u8]) -> Result<Option<Entry>>;

    async fn put(&self, key: &[u8], value: Data) -> Result<()>;

    async fn del(&self, key: &[u8]) -> Result<()>;

    /// Entries within `range` in key order (descending if `range.reverse`), at most
    /// `range.limit` of them.
    async fn range(&self, range: KeyRange) -> Result<Vec<Entry>>;

    /// Changes between the historical version `since` and the current version, in key order.
    async fn diff(&self, since: u64) -> Result<Vec<StoreDiff>>;

    /// Notifications carrying the new version after every append
    fn subscribe(&self) -> broadcast::Receiver<u64>;

    /// Fetch the latest state from peers. Returns whether anything new arrived.
    async fn update(&self) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

/// An append-only sequence of binary chunks
#[async_trait::async_trait]
pub trait BlobFeed: Send + Sync {
    fn key(&self) -> DbKey;

    fn writable(&self) -> bool;

    #[allow(clippy::len_without_is_empty)]
    fn len(&self) -> u64;

    /// Append chunks, returning the index of the first one
    async fn append(&self, chunks: Vec<Data>) -> Result<u64>;

    async fn get(&self, index: u64) -> Result<Data>;

    /// Whether the chunk is available locally
    fn has(&self, index: u64) -> bool;

    async fn download(&self, range: Range<u64>) -> Result<()>;

    /// Drop the local copy of the chunks in `range`
    async fn clear(&self, range: Range<u64>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens stores and feeds and controls their visibility on the network
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Open the store with the given key, or create a new writable one if `None`
    async fn open_store(&self, key: Option<DbKey>) -> Result<Arc<dyn OrderedStore>>;

    /// Open the feed with the given key, or create a new writable one if `None`
    async fn open_feed(&self, key: Option<DbKey>) -> Result<Arc<dyn BlobFeed>>;

    async fn configure_network(&self, discovery_key: DiscoveryKey, mode: NetworkMode)
        -> Result<()>;
}

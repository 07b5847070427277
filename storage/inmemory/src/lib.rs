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

//! In-memory storage backend.
//!
//! Stores are append-only operation logs indexed by a [BTreeMap]; feeds are vectors of chunks.
//! All replicas of a key opened through the same [InMemoryBackend] share the same data, so a
//! "remote" writer obtained with [InMemoryBackend::seed_remote_store] replicates to local
//! read-only handles instantly. Network visibility changes are only recorded.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Range,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use logging::log;
use parking_lot::{Mutex, RwLock};
use storage_core::{
    Backend, BlobFeed, Data, DbKey, DiscoveryKey, Entry, Error, KeyRange, NetworkMode,
    OrderedStore, Result, StoreDiff,
};
use tokio::sync::broadcast;

const NOTIFY_CHANNEL_CAPACITY: usize = 64;

/// One write in a store log. `None` value means deletion.
struct LogOp {
    key: Data,
    value: Option<Data>,
}

#[derive(Default)]
struct StoreState {
    log: Vec<LogOp>,
    index: BTreeMap<Data, Entry>,
}

impl StoreState {
    fn append(&mut self, key: &[u8], value: Option<Data>) -> u64 {
        self.log.push(LogOp {
            key: key.to_vec(),
            value: value.clone(),
        });
        let seq = self.log.len() as u64;
        match value {
            Some(value) => {
                let entry = Entry {
                    seq,
                    key: key.to_vec(),
                    value,
                };
                self.index.insert(key.to_vec(), entry);
            }
            None => {
                self.index.remove(key);
            }
        }
        seq
    }

    /// Rebuild the index as it was at the given version
    fn index_at(&self, version: u64) -> BTreeMap<Data, Entry> {
        let mut index = BTreeMap::new();
        for (pos, op) in self.log.iter().take(version as usize).enumerate() {
            match &op.value {
                Some(value) => {
                    let entry = Entry {
                        seq: pos as u64 + 1,
                        key: op.key.clone(),
                        value: value.clone(),
                    };
                    index.insert(op.key.clone(), entry);
                }
                None => {
                    index.remove(&op.key);
                }
            }
        }
        index
    }
}

struct StoreCore {
    key: DbKey,
    state: RwLock<StoreState>,
    notify: broadcast::Sender<u64>,
}

impl StoreCore {
    fn new(key: DbKey) -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self {
            key,
            state: RwLock::new(StoreState::default()),
            notify,
        }
    }
}

struct FeedCore {
    key: DbKey,
    chunks: RwLock<Vec<Data>>,
    // Indices available on the local replica
    local: Mutex<BTreeSet<u64>>,
}

impl FeedCore {
    fn new(key: DbKey) -> Self {
        Self {
            key,
            chunks: RwLock::new(Vec::new()),
            local: Mutex::new(BTreeSet::new()),
        }
    }
}

struct Inner {
    stores: Mutex<BTreeMap<DbKey, Arc<StoreCore>>>,
    feeds: Mutex<BTreeMap<DbKey, Arc<FeedCore>>>,
    // Keys whose secret key is held by this replica
    local_writers: Mutex<BTreeSet<DbKey>>,
    network: Mutex<BTreeMap<DiscoveryKey, NetworkMode>>,
    read_latency_ms: AtomicU64,
    offline: AtomicBool,
    failing_writes: AtomicBool,
    open_store_handles: AtomicUsize,
}

impl Inner {
    async fn read_delay(&self) {
        let ms = self.read_latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn store_core(&self, key: DbKey) -> Arc<StoreCore> {
        Arc::clone(
            self.stores.lock().entry(key).or_insert_with(|| Arc::new(StoreCore::new(key))),
        )
    }

    fn feed_core(&self, key: DbKey) -> Arc<FeedCore> {
        Arc::clone(self.feeds.lock().entry(key).or_insert_with(|| Arc::new(FeedCore::new(key))))
    }
}

/// In-memory implementation of [Backend]
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                stores: Mutex::new(BTreeMap::new()),
                feeds: Mutex::new(BTreeMap::new()),
                local_writers: Mutex::new(BTreeSet::new()),
                network: Mutex::new(BTreeMap::new()),
                read_latency_ms: AtomicU64::new(0),
                offline: AtomicBool::new(false),
                failing_writes: AtomicBool::new(false),
                open_store_handles: AtomicUsize::new(0),
            }),
        }
    }

    /// Delay every store and feed read by the given amount
    pub fn with_read_latency(self, latency: Duration) -> Self {
        self.set_read_latency(latency);
        self
    }

    pub fn set_read_latency(&self, latency: Duration) {
        self.inner.read_latency_ms.store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// While offline, fetching from peers (`update`, `download`) fails
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::Relaxed);
    }

    /// While set, every store write fails with [Error::Unavailable]
    pub fn set_failing_writes(&self, failing: bool) {
        self.inner.failing_writes.store(failing, Ordering::Relaxed);
    }

    /// Store handles that have been opened and not closed yet
    pub fn open_store_handles(&self) -> usize {
        self.inner.open_store_handles.load(Ordering::Acquire)
    }

    /// Create a store owned by some other replica. The returned handle is that replica's
    /// writer; opening the key through [Backend::open_store] yields a read-only replica.
    pub fn seed_remote_store(&self) -> Arc<dyn OrderedStore> {
        let key = random_key();
        Arc::new(StoreHandle::new(self.inner.store_core(key), true, Arc::clone(&self.inner)))
    }

    /// Create a feed owned by some other replica, see [InMemoryBackend::seed_remote_store].
    pub fn seed_remote_feed(&self) -> Arc<dyn BlobFeed> {
        let key = random_key();
        Arc::new(FeedHandle::new(self.inner.feed_core(key), true, false, Arc::clone(&self.inner)))
    }

    /// Last network mode configured for the discovery key
    pub fn network_mode(&self, discovery_key: &DiscoveryKey) -> Option<NetworkMode> {
        self.inner.network.lock().get(discovery_key).copied()
    }

    pub fn is_announced(&self, discovery_key: &DiscoveryKey) -> bool {
        self.network_mode(discovery_key).is_some_and(|mode| mode.announce)
    }

    pub fn store_count(&self) -> usize {
        self.inner.stores.lock().len()
    }

    pub fn feed_count(&self) -> usize {
        self.inner.feeds.lock().len()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn random_key() -> DbKey {
    DbKey::from_bytes(rand::random())
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    async fn open_store(&self, key: Option<DbKey>) -> Result<Arc<dyn OrderedStore>> {
        let (key, writable) = match key {
            Some(key) => (key, self.inner.local_writers.lock().contains(&key)),
            None => {
                let key = random_key();
                self.inner.local_writers.lock().insert(key);
                log::debug!("Created new store {key}");
                (key, true)
            }
        };
        let core = self.inner.store_core(key);
        Ok(Arc::new(StoreHandle::new(core, writable, Arc::clone(&self.inner))))
    }

    async fn open_feed(&self, key: Option<DbKey>) -> Result<Arc<dyn BlobFeed>> {
        let (key, writable) = match key {
            Some(key) => (key, self.inner.local_writers.lock().contains(&key)),
            None => {
                let key = random_key();
                self.inner.local_writers.lock().insert(key);
                log::debug!("Created new feed {key}");
                (key, true)
            }
        };
        let core = self.inner.feed_core(key);
        Ok(Arc::new(FeedHandle::new(core, writable, true, Arc::clone(&self.inner))))
    }

    async fn configure_network(
        &self,
        discovery_key: DiscoveryKey,
        mode: NetworkMode,
    ) -> Result<()> {
        log::trace!("Network mode of {discovery_key} set to {mode:?}");
        self.inner.network.lock().insert(discovery_key, mode);
        Ok(())
    }
}

struct StoreHandle {
    core: Arc<StoreCore>,
    writable: bool,
    closed: AtomicBool,
    backend: Arc<Inner>,
}

impl StoreHandle {
    fn new(core: Arc<StoreCore>, writable: bool, backend: Arc<Inner>) -> Self {
        backend.open_store_handles.fetch_add(1, Ordering::AcqRel);
        Self {
            core,
            writable,
            closed: AtomicBool::new(false),
            backend,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_open()?;
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn append(&self, key: &[u8], value: Option<Data>) -> Result<()> {
        self.check_writable()?;
        if self.backend.failing_writes.load(Ordering::Relaxed) {
            return Err(Error::Unavailable("writes are failing".to_owned()));
        }
        let version = self.core.state.write().append(key, value);
        // No subscribers is fine
        let _ = self.core.notify.send(version);
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderedStore for StoreHandle {
    fn key(&self) -> DbKey {
        self.core.key
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn version(&self) -> u64 {
        self.core.state.read().log.len() as u64
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        self.check_open()?;
        self.backend.read_delay().await;
        self.check_open()?;
        Ok(self.core.state.read().index.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: Data) -> Result<()> {
        self.append(key, Some(value))
    }

    async fn del(&self, key: &[u8]) -> Result<()> {
        self.append(key, None)
    }

    async fn range(&self, range: KeyRange) -> Result<Vec<Entry>> {
        self.check_open()?;
        self.backend.read_delay().await;
        self.check_open()?;
        let bounds = match range.as_slice_range() {
            Some(bounds) => bounds,
            None => return Ok(Vec::new()),
        };
        let limit = range.limit.unwrap_or(usize::MAX);
        let state = self.core.state.read();
        let iter = state.index.range::<[u8], _>(bounds).map(|(_, e)| e.clone());
        let entries = if range.reverse {
            iter.rev().take(limit).collect()
        } else {
            iter.take(limit).collect()
        };
        Ok(entries)
    }

    async fn diff(&self, since: u64) -> Result<Vec<StoreDiff>> {
        self.check_open()?;
        self.backend.read_delay().await;
        let state = self.core.state.read();
        let old = state.index_at(since);
        let keys: BTreeSet<&Data> = old.keys().chain(state.index.keys()).collect();
        let diffs = keys
            .into_iter()
            .filter_map(|key| {
                let left = old.get(key);
                let right = state.index.get(key);
                (left != right).then(|| StoreDiff {
                    left: left.cloned(),
                    right: right.cloned(),
                })
            })
            .collect();
        Ok(diffs)
    }

    fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.core.notify.subscribe()
    }

    async fn update(&self) -> Result<bool> {
        self.check_open()?;
        if self.backend.offline.load(Ordering::Relaxed) {
            return Err(Error::Unavailable("no peers".to_owned()));
        }
        Ok(false)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.backend.open_store_handles.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(())
    }
}

struct FeedHandle {
    core: Arc<FeedCore>,
    writable: bool,
    // Whether this handle belongs to the local replica
    local: bool,
    closed: AtomicBool,
    backend: Arc<Inner>,
}

impl FeedHandle {
    fn new(core: Arc<FeedCore>, writable: bool, local: bool, backend: Arc<Inner>) -> Self {
        Self {
            core,
            writable,
            local,
            closed: AtomicBool::new(false),
            backend,
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlobFeed for FeedHandle {
    fn key(&self) -> DbKey {
        self.core.key
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn len(&self) -> u64 {
        self.core.chunks.read().len() as u64
    }

    async fn append(&self, chunks: Vec<Data>) -> Result<u64> {
        self.check_open()?;
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        let mut stored = self.core.chunks.write();
        let start = stored.len() as u64;
        let count = chunks.len() as u64;
        stored.extend(chunks);
        if self.local {
            self.core.local.lock().extend(start..start + count);
        }
        Ok(start)
    }

    async fn get(&self, index: u64) -> Result<Data> {
        self.check_open()?;
        self.backend.read_delay().await;
        let chunk = self
            .core
            .chunks
            .read()
            .get(index as usize)
            .cloned()
            .ok_or(Error::BlockNotAvailable(index))?;
        if self.local {
            self.core.local.lock().insert(index);
        }
        Ok(chunk)
    }

    fn has(&self, index: u64) -> bool {
        self.core.local.lock().contains(&index)
    }

    async fn download(&self, range: Range<u64>) -> Result<()> {
        self.check_open()?;
        if self.backend.offline.load(Ordering::Relaxed) {
            return Err(Error::Unavailable("no peers".to_owned()));
        }
        let len = self.len();
        if range.end > len {
            return Err(Error::BlockNotAvailable(len));
        }
        self.core.local.lock().extend(range);
        Ok(())
    }

    async fn clear(&self, range: Range<u64>) -> Result<()> {
        self.check_open()?;
        let mut local = self.core.local.lock();
        range.for_each(|index| {
            local.remove(&index);
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod test;

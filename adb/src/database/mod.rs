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

//! A logical database: lifecycle of its store handle and path-scoped accessors.
//!
//! A [Database] is constructed either for an existing id (attach) or without one, in which
//! case the first [Database::setup] with `create` set creates the store and assigns the id.
//! The store handle is loaded lazily by [Database::touch], which every accessor calls, and
//! dropped again by [Database::teardown] when the database has been idle for too long. The
//! durable database outlives any number of such load/unload cycles.

pub mod cursor;
pub mod desc;
pub mod records;
pub mod set;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{stream::BoxStream, StreamExt};
use logging::log;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use storage_core::{Backend, DiscoveryKey, Entry, KeyRange, NetworkMode, OrderedStore, Sub};
use tokio_util::sync::CancellationToken;
use utils::{
    ensure,
    scheduler::{spawn_cancellable, Debouncer, TaskHandle},
    time_getter::TimeGetter,
};

use crate::{
    blobs::Blobs,
    config::AdbConfig,
    lock_manager::LockManager,
    schema::{TableId, TableSchema},
    table::Table,
    AccessMode, DbId, Error, Result,
};

use self::{
    cursor::ReadCursor,
    desc::{DbDescription, TableDesc},
    records::{decode_entry, key_to_string, DbPath, ListOptions, Record, ShallowEntry},
};

const DESC_NAMESPACE: &str = "_adb";
const DESC_KEY: &str = "desc";
pub(crate) const BLOBS_NAMESPACE: &str = "_blobs";

/// Whether a key scanned from the root belongs to a namespace kept out of listings
fn is_reserved_root_key(key: &[u8]) -> bool {
    [DESC_NAMESPACE, BLOBS_NAMESPACE].iter().any(|namespace| {
        key.strip_prefix(namespace.as_bytes())
            .is_some_and(|rest| rest.first() == Some(&storage_core::sub::SEPARATOR))
    })
}

/// Everything a database needs from its surroundings
#[derive(Clone)]
pub struct DbContext {
    pub backend: Arc<dyn Backend>,
    pub config: Arc<AdbConfig>,
    pub locks: LockManager,
    pub time_getter: TimeGetter,
}

impl DbContext {
    pub fn new(backend: Arc<dyn Backend>, config: AdbConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            locks: LockManager::new(),
            time_getter: TimeGetter::default(),
        }
    }

    pub fn with_time_getter(self, time_getter: TimeGetter) -> Self {
        Self {
            time_getter,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Regular,
    /// The private registry; never evicted
    PrivateRegistry,
}

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Create a new store if the database has no id yet
    pub create: bool,
    /// Display name written into the description of a newly created database
    pub display_name: Option<String>,
}

impl SetupOptions {
    pub fn create() -> Self {
        Self {
            create: true,
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        self.display_name = display_name;
        self
    }
}

/// Summary of a database as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDescribe {
    pub db_id: Option<DbId>,
    pub display_name: Option<String>,
    pub writable: bool,
    pub tables: Vec<TableDesc>,
}

struct LoadedStore {
    store: Arc<dyn OrderedStore>,
    // Cancels everything attached to this load cycle
    token: CancellationToken,
}

struct Watcher {
    _forwarder: TaskHandle,
    _debouncer: Debouncer,
}

type CreatedHook = Box<dyn FnOnce(DbId) + Send>;

static PENDING_NONCE: AtomicU64 = AtomicU64::new(0);

pub struct Database {
    ctx: DbContext,
    kind: DbKind,
    id: RwLock<Option<DbId>>,
    // Fixed for the lifetime of the instance, so that setup calls made before and after the
    // id is assigned contend on the same lock
    setup_lock_name: String,
    access: RwLock<AccessMode>,
    loaded: RwLock<Option<LoadedStore>>,
    writable: AtomicBool,
    last_access: Mutex<Duration>,
    desc: RwLock<DbDescription>,
    schemas: RwLock<BTreeMap<TableId, Arc<TableSchema>>>,
    watchers: Mutex<Vec<Watcher>>,
    created_hook: Mutex<Option<CreatedHook>>,
    blobs: Blobs,
}

impl Database {
    pub fn new(ctx: DbContext, id: Option<DbId>, access: AccessMode, kind: DbKind) -> Arc<Self> {
        let setup_lock_name = match &id {
            Some(id) => format!("{id}:setupteardown"),
            None => format!(
                "pending-{}:setupteardown",
                PENDING_NONCE.fetch_add(1, Ordering::Relaxed)
            ),
        };
        Arc::new_cyclic(|weak| Self {
            blobs: Blobs::new(weak.clone(), ctx.clone()),
            ctx,
            kind,
            id: RwLock::new(id),
            setup_lock_name,
            access: RwLock::new(access),
            loaded: RwLock::new(None),
            writable: AtomicBool::new(false),
            last_access: Mutex::new(Duration::ZERO),
            desc: RwLock::new(DbDescription::default()),
            schemas: RwLock::new(BTreeMap::new()),
            watchers: Mutex::new(Vec::new()),
            created_hook: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Option<DbId> {
        *self.id.read()
    }

    pub fn require_id(&self) -> Result<DbId> {
        self.id().ok_or_else(|| Error::Configuration("Database has not been created yet".to_owned()))
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    pub fn access_mode(&self) -> AccessMode {
        *self.access.read()
    }

    pub fn is_in_memory(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Whether this replica can write. Only meaningful while loaded.
    pub fn writable(&self) -> bool {
        self.writable.load(Ordering::Acquire)
    }

    pub fn last_access(&self) -> Duration {
        *self.last_access.lock()
    }

    pub fn desc(&self) -> DbDescription {
        self.desc.read().clone()
    }

    pub fn display_name(&self) -> Option<String> {
        self.desc.read().display_name.clone()
    }

    pub fn url(&self) -> Option<String> {
        self.id().map(|id| format!("hyper://{id}/"))
    }

    pub fn discovery_key(&self) -> Option<DiscoveryKey> {
        self.id().map(|id| id.key().discovery_key())
    }

    pub fn config(&self) -> &AdbConfig {
        &self.ctx.config
    }

    pub(crate) fn context(&self) -> &DbContext {
        &self.ctx
    }

    pub fn blobs(&self) -> &Blobs {
        &self.blobs
    }

    /// Called once with the new id when [Database::setup] creates the store
    pub fn set_created_hook(&self, hook: impl FnOnce(DbId) + Send + 'static) {
        *self.created_hook.lock() = Some(Box::new(hook));
    }

    fn now(&self) -> Duration {
        self.ctx.time_getter.get_time()
    }

    fn store_handle(&self) -> Option<Arc<dyn OrderedStore>> {
        self.loaded.read().as_ref().map(|loaded| Arc::clone(&loaded.store))
    }

    fn read_timeout(&self) -> Duration {
        *self.ctx.config.read_timeout
    }

    pub async fn setup(&self, opts: SetupOptions) -> Result<()> {
        let id = self.id();
        ensure!(
            id.is_some() || opts.create,
            Error::Configuration("Database instance created without an id".to_owned())
        );
        let _guard = self.ctx.locks.lock(self.setup_lock_name.as_str()).await;
        if self.is_in_memory() {
            return Ok(());
        }

        *self.last_access.lock() = self.now();
        let store = self.ctx.backend.open_store(id.map(|id| id.key())).await?;
        if self.access_mode() != AccessMode::Private {
            if let Err(e) =
                self.ctx.backend.configure_network(store.discovery_key(), NetworkMode::SWARM).await
            {
                let _ = store.close().await;
                return Err(e.into());
            }
        }
        self.writable.store(store.writable(), Ordering::Release);
        *self.loaded.write() = Some(LoadedStore {
            store: Arc::clone(&store),
            token: CancellationToken::new(),
        });

        if id.is_none() {
            let new_id = DbId::from(store.key());
            *self.id.write() = Some(new_id);
            log::info!("Created database {new_id}");
            if let Some(hook) = self.created_hook.lock().take() {
                hook(new_id);
            }
            let desc = DbDescription {
                display_name: opts.display_name,
                ..DbDescription::default()
            };
            if let Err(e) = self.write_desc(store.as_ref(), &desc).await {
                log::warn!("Discarding new database {new_id}, writing its description failed: {e}");
                self.discard_new_store().await;
                return Err(e);
            }
        } else {
            log::debug!("Loaded database {}", store.key());
        }

        self.load_desc(store.as_ref()).await;
        Ok(())
    }

    /// Undo the creation of a store whose setup could not be completed
    async fn discard_new_store(&self) {
        let Some(loaded) = self.loaded.write().take() else {
            return;
        };
        *self.id.write() = None;
        self.writable.store(false, Ordering::Release);
        loaded.token.cancel();
        if self.access_mode() != AccessMode::Private {
            if let Err(e) = self
                .ctx
                .backend
                .configure_network(loaded.store.discovery_key(), NetworkMode::OFF)
                .await
            {
                log::warn!("Failed to unswarm discarded store {}: {e}", loaded.store.key());
            }
        }
        if let Err(e) = loaded.store.close().await {
            log::warn!("Failed to close discarded store {}: {e}", loaded.store.key());
        }
    }

    pub async fn teardown(&self, unswarm: bool) -> Result<()> {
        let _guard = self.ctx.locks.lock(self.setup_lock_name.as_str()).await;
        let Some(loaded) = self.loaded.write().take() else {
            return Ok(());
        };
        self.unload(loaded, unswarm).await
    }

    /// Unload the database unless it has been used within the keep-in-memory period before
    /// `now`. Idleness is decided under the setup/teardown lock. Returns whether it was unloaded.
    pub async fn teardown_if_idle(&self, now: Duration) -> Result<bool> {
        let _guard = self.ctx.locks.lock(self.setup_lock_name.as_str()).await;
        let loaded = {
            let mut loaded = self.loaded.write();
            if !self.is_idle(now) {
                return Ok(false);
            }
            loaded.take()
        };
        match loaded {
            Some(loaded) => self.unload(loaded, false).await.map(|()| true),
            None => Ok(false),
        }
    }

    async fn unload(&self, loaded: LoadedStore, unswarm: bool) -> Result<()> {
        loaded.token.cancel();
        self.watchers.lock().clear();
        self.blobs.teardown().await;
        if unswarm && self.access_mode() != AccessMode::Private {
            log::info!("Unswarming database {}", loaded.store.key());
            self.ctx
                .backend
                .configure_network(loaded.store.discovery_key(), NetworkMode::OFF)
                .await?;
        }
        loaded.store.close().await?;
        log::debug!("Unloaded database {}", loaded.store.key());
        Ok(())
    }

    /// Mark the database as used, loading it if it was evicted
    pub async fn touch(&self) -> Result<Arc<dyn OrderedStore>> {
        {
            // Stamped under the handle lock, see [Database::teardown_if_idle]
            let loaded = self.loaded.read();
            *self.last_access.lock() = self.now();
            if let Some(loaded) = loaded.as_ref() {
                return Ok(Arc::clone(&loaded.store));
            }
        }
        self.setup(SetupOptions::default()).await?;
        self.store_handle()
            .ok_or_else(|| Error::Configuration("Database was unloaded during setup".to_owned()))
    }

    pub fn is_ejectable_from_memory(&self, now: Duration) -> bool {
        self.is_in_memory() && self.is_idle(now)
    }

    fn is_idle(&self, now: Duration) -> bool {
        self.kind != DbKind::PrivateRegistry
            && now.saturating_sub(self.last_access()) > *self.ctx.config.keep_in_memory_ttl
    }

    /// Call `callback` once writes have settled. Only local writable databases can be
    /// watched; returns whether the watch was registered.
    pub fn watch(&self, mut callback: impl FnMut(DbId) + Send + 'static) -> bool {
        let (store, token) = match self.loaded.read().as_ref() {
            Some(loaded) => (Arc::clone(&loaded.store), loaded.token.clone()),
            None => return false,
        };
        if !self.writable() {
            return false;
        }
        let id = DbId::from(store.key());
        let debouncer = Debouncer::new(
            &format!("watch-debounce-{id}"),
            *self.ctx.config.watch_debounce,
            token.child_token(),
            move || callback(id),
        );
        let notify = debouncer.notifier();
        let mut appends = store.subscribe();
        let forwarder = spawn_cancellable(&format!("watch-{id}"), token.child_token(), async move {
            loop {
                match appends.recv().await {
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        notify.notify()
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        self.watchers.lock().push(Watcher {
            _forwarder: forwarder,
            _debouncer: debouncer,
        });
        true
    }

    /// Apply an access mode change recorded in the registry
    pub async fn on_config_updated(&self, access: AccessMode) -> Result<()> {
        let changed = {
            let mut current = self.access.write();
            let changed = *current != access;
            *current = access;
            changed
        };
        let Some(discovery_key) = self.discovery_key() else {
            return Ok(());
        };
        if changed {
            let mode = match access {
                AccessMode::Private => {
                    log::info!("Unswarming {} due to config change", self.require_id()?);
                    NetworkMode::OFF
                }
                AccessMode::Public => {
                    log::info!("Swarming {} due to config change", self.require_id()?);
                    NetworkMode::SWARM
                }
            };
            self.ctx.backend.configure_network(discovery_key, mode).await?;
        }
        Ok(())
    }

    /// Current version of the store, to be passed to [Table::list_diff] later
    pub async fn version(&self) -> Result<u64> {
        Ok(self.touch().await?.version())
    }

    /// Wait for the latest remote state of a database we do not write to
    pub async fn when_synced(&self) -> Result<()> {
        if self.is_in_memory() && self.writable() {
            return Ok(());
        }
        let store = self.touch().await?;
        if store.writable() {
            return Ok(());
        }
        match tokio::time::timeout(self.read_timeout(), store.update()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::debug!("Update of {} failed: {e}", store.key()),
            Err(_) => log::debug!("Update of {} timed out", store.key()),
        }
        Ok(())
    }

    fn desc_location() -> (Sub, &'static [u8]) {
        (Sub::new([DESC_NAMESPACE]), DESC_KEY.as_bytes())
    }

    async fn write_desc(&self, store: &dyn OrderedStore, desc: &DbDescription) -> Result<()> {
        let (sub, key) = Self::desc_location();
        sub.put(store, key, serde_json::to_vec(desc)?).await?;
        *self.desc.write() = desc.clone();
        Ok(())
    }

    async fn read_desc(&self, store: &dyn OrderedStore) -> Result<Option<DbDescription>> {
        let (sub, key) = Self::desc_location();
        let entry = tokio::time::timeout(self.read_timeout(), sub.get(store, key)).await??;
        let Some(entry) = entry else {
            return Ok(None);
        };
        let desc: DbDescription = serde_json::from_slice(&entry.value)?;
        desc.check().map_err(Error::Serialization)?;
        Ok(Some(desc))
    }

    /// Refresh the cached description; a missing or unreadable one is recorded as failed.
    /// Returns whether loading succeeded.
    async fn load_desc(&self, store: &dyn OrderedStore) -> bool {
        let desc = match self.read_desc(store).await {
            Ok(Some(desc)) => desc,
            Ok(None) => {
                log::debug!("Database {} has no description yet", store.key());
                DbDescription::failed()
            }
            Err(e) => {
                log::debug!("Failed to load description of {}: {e}", store.key());
                DbDescription::failed()
            }
        };
        let loaded = !desc.did_fail_load;
        *self.desc.write() = desc;
        loaded
    }

    /// Read the description again, e.g. after it has been replicated
    pub async fn reload_desc(&self) -> Result<bool> {
        let store = self.touch().await?;
        Ok(self.load_desc(store.as_ref()).await)
    }

    /// Read-modify-write of the description. `f` returns `None` to leave it unchanged.
    pub async fn update_desc(
        &self,
        f: impl FnOnce(&DbDescription) -> Option<DbDescription>,
    ) -> Result<DbDescription> {
        let store = self.touch().await?;
        let id = self.require_id()?;
        let _guard = self.ctx.locks.lock(format!("{id}:update-db-desc")).await;
        let current = self.read_desc(store.as_ref()).await?.unwrap_or_default();
        let Some(mut updated) = f(&current) else {
            *self.desc.write() = current.clone();
            return Ok(current);
        };
        updated.did_fail_load = false;
        if let Some(key) = &current.blobs_feed_key {
            ensure!(
                updated.blobs_feed_key.as_ref() == Some(key),
                Error::Configuration("The blob feed of a database cannot be changed".to_owned())
            );
        }
        self.write_desc(store.as_ref(), &updated).await?;
        Ok(updated)
    }

    pub async fn set_display_name(&self, display_name: Option<String>) -> Result<()> {
        self.touch().await?;
        ensure!(
            self.writable(),
            Error::Permissions("Cannot rename a database this replica does not write".to_owned())
        );
        self.update_desc(|desc| {
            (desc.display_name != display_name).then(|| DbDescription {
                display_name: display_name.clone(),
                ..desc.clone()
            })
        })
        .await?;
        Ok(())
    }

    /// Record a table in the description. Failures are only logged.
    pub(crate) async fn note_table(&self, table_id: &TableId, revision: u32) {
        if self.desc.read().table_revision(table_id).is_some_and(|r| r >= revision) {
            return;
        }
        if !self.writable() {
            return;
        }
        if let Err(e) = self.update_desc(|desc| desc.with_table(table_id, revision)).await {
            log::warn!("Failed to record table {table_id} in the description: {e}");
        }
    }

    pub(crate) async fn scan_entries(&self, sub: &Sub, opts: &ListOptions) -> Result<Vec<Entry>> {
        let store = self.touch().await?;
        let timeout = opts.read_timeout(self.read_timeout());
        let range = opts.key_range();
        Ok(tokio::time::timeout(timeout, sub.range(store.as_ref(), &range)).await??)
    }

    /// Decode scanned entries, skipping undecodable ones and, for tables when requested,
    /// the ones failing schema validation
    pub(crate) fn decode_entries(
        &self,
        parent: &DbPath,
        table: Option<&TableId>,
        opts: &ListOptions,
        entries: Vec<Entry>,
    ) -> Vec<Record> {
        let id = self.id();
        let schema = match table {
            Some(table_id) if opts.validate => Some(self.table_schema(table_id)),
            _ => None,
        };
        entries
            .into_iter()
            .filter(|entry| !parent.is_root() || !is_reserved_root_key(&entry.key))
            .filter_map(|entry| match decode_entry(id.as_ref(), parent, entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::debug!("Skipping undecodable entry under {parent}: {e}");
                    None
                }
            })
            .filter(|record| schema.as_ref().is_none_or(|s| s.is_valid(&record.value)))
            .collect()
    }

    pub async fn get(&self, path: &str) -> Result<Option<Record>> {
        let path = DbPath::parse(path)?;
        let (sub, key) = path.split_key()?;
        let store = self.touch().await?;
        let entry =
            tokio::time::timeout(self.read_timeout(), sub.get(store.as_ref(), key.as_bytes()))
                .await??;
        let Some(entry) = entry else {
            return Ok(None);
        };
        let record = decode_entry(self.id().as_ref(), &path.parent(), entry)?;
        Ok(Some(record))
    }

    pub async fn put(&self, path: &str, value: &Value) -> Result<()> {
        let path = DbPath::parse(path)?;
        let (sub, key) = path.split_key()?;
        let store = self.touch().await?;
        sub.put(store.as_ref(), key.as_bytes(), serde_json::to_vec(value)?).await?;
        Ok(())
    }

    pub async fn del(&self, path: &str) -> Result<()> {
        let path = DbPath::parse(path)?;
        let (sub, key) = path.split_key()?;
        let store = self.touch().await?;
        sub.del(store.as_ref(), key.as_bytes()).await?;
        Ok(())
    }

    /// Records directly or indirectly below `path`, keys relative to it
    pub async fn list(&self, path: &str, opts: &ListOptions) -> Result<Vec<Record>> {
        let path = DbPath::parse(path)?;
        let entries = self.scan_entries(&path.sub(), opts).await?;
        Ok(self.decode_entries(&path, None, opts, entries))
    }

    pub async fn create_read_stream(
        self: &Arc<Self>,
        path: &str,
        opts: ListOptions,
    ) -> Result<BoxStream<'static, Result<Record>>> {
        Ok(self.cursor_read(path, opts)?.into_stream())
    }

    pub fn cursor_read(self: &Arc<Self>, path: &str, opts: ListOptions) -> Result<ReadCursor> {
        let path = DbPath::parse(path)?;
        Ok(ReadCursor::new(Arc::clone(self), path, opts, None))
    }

    /// First record below `path` matching `predicate`
    pub async fn scan_find(
        self: &Arc<Self>,
        path: &str,
        opts: ListOptions,
        predicate: impl Fn(&Record) -> bool,
    ) -> Result<Option<Record>> {
        let mut stream = self.create_read_stream(path, opts).await?;
        while let Some(record) = stream.next().await {
            let record = record?;
            if predicate(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Immediate children of `path`: records, and containers of deeper records
    pub async fn list_shallow(&self, path: &str) -> Result<Vec<ShallowEntry>> {
        let path = DbPath::parse(path)?;
        let sub = path.sub();
        let store = self.touch().await?;
        let id = self.id();
        let mut out = Vec::new();
        let mut range = KeyRange::all().with_limit(1);
        loop {
            let entries =
                tokio::time::timeout(self.read_timeout(), sub.range(store.as_ref(), &range))
                    .await??;
            let Some(entry) = entries.into_iter().next() else {
                return Ok(out);
            };
            match entry.key.iter().position(|b| *b == storage_core::sub::SEPARATOR) {
                Some(sep) => {
                    let container = key_to_string(&entry.key[..sep])?;
                    let child_sub = Sub::root().sub(&container);
                    if !path.is_root() || !is_reserved_root_key(&entry.key) {
                        out.push(ShallowEntry {
                            path: path.join(&container).to_string(),
                            key: container,
                            seq: None,
                            has_children: true,
                            value: None,
                        });
                    }
                    range.gt = None;
                    range.gte = storage_core::util::prefix_end(child_sub.prefix());
                    if range.gte.is_none() {
                        return Ok(out);
                    }
                }
                None => {
                    let record = decode_entry(id.as_ref(), &path, entry.clone())?;
                    out.push(ShallowEntry {
                        key: record.key,
                        path: record.path,
                        seq: Some(record.seq),
                        has_children: false,
                        value: Some(record.value),
                    });
                    range.gte = None;
                    range.gt = Some(entry.key);
                }
            }
        }
    }

    pub(crate) fn table_schema(&self, table_id: &TableId) -> Arc<TableSchema> {
        if let Some(schema) = self.schemas.read().get(table_id) {
            return Arc::clone(schema);
        }
        Arc::clone(
            self.schemas
                .write()
                .entry(table_id.clone())
                .or_insert_with(|| Arc::new(TableSchema::permissive())),
        )
    }

    /// The table with the schema registered for it, or a permissive one
    pub fn table(self: &Arc<Self>, table_id: &str) -> Result<Table> {
        let table_id: TableId = table_id.parse()?;
        self.table_schema(&table_id);
        Ok(Table::new(Arc::clone(self), table_id))
    }

    /// Register a schema for a table. A cached schema is only replaced by a higher revision.
    pub fn register_table(self: &Arc<Self>, table_id: &str, schema: TableSchema) -> Result<Table> {
        let table_id: TableId = table_id.parse()?;
        {
            let mut schemas = self.schemas.write();
            let replace =
                schemas.get(&table_id).is_none_or(|cached| schema.revision() > cached.revision());
            if replace {
                schemas.insert(table_id.clone(), Arc::new(schema));
            }
        }
        Ok(Table::new(Arc::clone(self), table_id))
    }

    pub async fn describe(&self) -> Result<DbDescribe> {
        self.touch().await?;
        let desc = self.desc();
        Ok(DbDescribe {
            db_id: self.id(),
            display_name: desc.display_name,
            writable: self.writable(),
            tables: desc.tables.unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .field("access", &self.access_mode())
            .field("in_memory", &self.is_in_memory())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storage_inmemory::InMemoryBackend;
    use test_utils::mock_time_getter::mocked_time_getter_seconds;

    use super::*;

    fn context(backend: &InMemoryBackend, clock: &Arc<AtomicU64>) -> DbContext {
        DbContext::new(Arc::new(backend.clone()), AdbConfig::default())
            .with_time_getter(mocked_time_getter_seconds(Arc::clone(clock)))
    }

    async fn created(ctx: DbContext) -> Arc<Database> {
        let db = Database::new(ctx, None, AccessMode::Public, DbKind::Regular);
        db.setup(SetupOptions::create()).await.unwrap();
        db
    }

    #[tokio::test]
    async fn idle_teardown() {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(AtomicU64::new(1));
        let db = created(context(&backend, &clock)).await;

        assert!(!db.teardown_if_idle(db.now()).await.unwrap());
        clock.fetch_add(3600, Ordering::SeqCst);
        assert!(db.teardown_if_idle(db.now()).await.unwrap());
        assert!(!db.is_in_memory());
        assert!(!db.teardown_if_idle(db.now()).await.unwrap());
        assert_eq!(backend.open_store_handles(), 0);
    }

    #[tokio::test]
    async fn idle_teardown_keeps_databases_used_while_waiting() {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(AtomicU64::new(1));
        let ctx = context(&backend, &clock);
        let db = created(ctx.clone()).await;
        db.put("/k", &json!(1)).await.unwrap();

        clock.fetch_add(3600, Ordering::SeqCst);
        let now = db.now();
        assert!(db.is_ejectable_from_memory(now));

        let setup_guard = ctx.locks.lock(db.setup_lock_name.as_str()).await;
        let sweep = {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.teardown_if_idle(now).await })
        };
        tokio::task::yield_now().await;
        let store = db.touch().await.unwrap();
        drop(setup_guard);

        assert!(!sweep.await.unwrap().unwrap());
        assert!(db.is_in_memory());
        store.put(b"direct", b"2".to_vec()).await.unwrap();
        db.put("/k", &json!(2)).await.unwrap();
        assert_eq!(db.get("/k").await.unwrap().unwrap().value, json!(2));
    }

    #[tokio::test]
    async fn failed_creation_releases_the_store() {
        let backend = InMemoryBackend::new();
        let clock = Arc::new(AtomicU64::new(1));
        let db = Database::new(context(&backend, &clock), None, AccessMode::Public, DbKind::Regular);
        let hooked = Arc::new(Mutex::new(None));
        let hook_target = Arc::clone(&hooked);
        db.set_created_hook(move |id| *hook_target.lock() = Some(id));

        backend.set_failing_writes(true);
        assert!(matches!(db.setup(SetupOptions::create()).await, Err(Error::Storage(_))));
        let discarded = hooked.lock().expect("created hook fired");
        assert!(!db.is_in_memory());
        assert_eq!(db.id(), None);
        assert!(!db.writable());
        assert_eq!(backend.open_store_handles(), 0);
        assert!(!backend.is_announced(&discarded.key().discovery_key()));

        backend.set_failing_writes(false);
        db.setup(SetupOptions::create()).await.unwrap();
        assert!(db.is_in_memory());
        assert_ne!(db.id(), Some(discarded));
        assert_eq!(backend.open_store_handles(), 1);
    }
}

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

//! Entry point of the core: owns the set of loaded databases and the registry, resolves
//! aliases, creates databases on behalf of services and evicts idle ones.

use std::sync::Arc;

use logging::log;
use parking_lot::Mutex;
use storage_core::Backend;
use tokio_util::sync::CancellationToken;
use utils::scheduler::{spawn_periodic, TaskHandle};

use crate::{
    config::{AdbConfig, ProcessConfig},
    database::{DbContext, DbDescribe},
    registry::{
        DatabaseRecord, DbAdminConfig, DbConfig, DbInfo, PrivateRegistry, ServiceGrant, WriteScope,
    },
    Database, Databases, DbId, Error, Principal, Result,
};

pub struct DbManager {
    dbs: Arc<Databases>,
    registry: PrivateRegistry,
    sweep_task: Mutex<Option<TaskHandle>>,
}

impl DbManager {
    pub async fn setup(
        config: AdbConfig,
        process_config: ProcessConfig,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        Self::setup_with_context(DbContext::new(backend, config), process_config).await
    }

    /// Attach to or create the registry database and start evicting idle databases
    pub async fn setup_with_context(ctx: DbContext, process_config: ProcessConfig) -> Result<Self> {
        let sweep_interval = *ctx.config.sweep_interval;
        let dbs = Arc::new(Databases::new(ctx));
        let registry = PrivateRegistry::open(Arc::clone(&dbs), process_config.server_db_id).await?;

        let sweep_dbs = Arc::clone(&dbs);
        let sweep_task = spawn_periodic(
            "adb-sweep-inactive-dbs",
            sweep_interval,
            CancellationToken::new(),
            move || {
                let dbs = Arc::clone(&sweep_dbs);
                async move {
                    sweep_inactive(&dbs).await;
                }
            },
        );

        Ok(Self {
            dbs,
            registry,
            sweep_task: Mutex::new(Some(sweep_task)),
        })
    }

    pub fn databases(&self) -> &Arc<Databases> {
        &self.dbs
    }

    pub fn registry(&self) -> &PrivateRegistry {
        &self.registry
    }

    pub fn server_db_id(&self) -> Result<DbId> {
        self.registry.id()
    }

    /// Get or load a database `principal` may read
    pub async fn load_db(&self, principal: &Principal, db_id: DbId) -> Result<Arc<Database>> {
        self.registry.assert_can_read_database(principal, &db_id).await?;
        if self.registry.is_registry(&db_id) {
            return Ok(Arc::clone(self.registry.database()));
        }
        let record = self.registry.get_db_record(&db_id).await?;
        let access = record.as_ref().map(|record| record.network.access).unwrap_or_default();
        let db = self.dbs.load(db_id, access).await.inspect_err(|e| {
            log::error!("Failed to load database {db_id}: {e}");
        })?;
        if let Some(record) = &record {
            self.refresh_cached_meta(&db, record).await;
        }
        Ok(db)
    }

    async fn refresh_cached_meta(&self, db: &Database, record: &DatabaseRecord) {
        if !db.is_in_memory() {
            return;
        }
        let meta = &record.cached_meta;
        if meta.display_name == db.display_name() && meta.writable == db.writable() {
            return;
        }
        if let Err(e) = self.registry.update_db_record_cached_meta(db).await {
            log::warn!("Failed to update cached metadata of {}: {e}", record.db_id);
        }
    }

    /// Id of the database `principal`'s service knows as `alias`. Raw ids pass through.
    ///
    /// An alias bound by another service of the same user shares that database with this
    /// service.
    pub async fn resolve_alias(&self, principal: &Principal, alias: &str) -> Result<Option<DbId>> {
        if DbId::looks_like_id(alias) {
            return alias.parse().map(Some);
        }
        if let Some(record) = self.registry.find_by_service_alias(principal, alias).await? {
            return Ok(Some(record.db_id));
        }
        let Some(record) = self.registry.find_by_user_alias(principal, alias).await? else {
            return Ok(None);
        };
        // A service knows a database by one alias only; an existing grant is left as it is
        if record.grant(&principal.service_key).is_some() {
            return Ok(Some(record.db_id));
        }
        log::info!(
            "Sharing database {} with service {} under alias {alias}",
            record.db_id,
            principal.service_key
        );
        self.registry
            .configure_service_db_access(principal, record.db_id, Some(alias.to_owned()), false, false)
            .await?;
        Ok(Some(record.db_id))
    }

    async fn resolve_id(&self, principal: &Principal, db_id_or_alias: &str) -> Result<DbId> {
        self.resolve_alias(principal, db_id_or_alias)
            .await?
            .ok_or_else(|| Error::InvalidDbId(db_id_or_alias.to_owned()))
    }

    /// Create a database owned by `principal`
    pub async fn create_db(&self, principal: &Principal, config: &DbConfig) -> Result<Arc<Database>> {
        self.create_owned_db(principal, principal, config).await
    }

    async fn create_owned_db(
        &self,
        principal: &Principal,
        owner: &Principal,
        config: &DbConfig,
    ) -> Result<Arc<Database>> {
        if let Some(alias) = &config.alias {
            self.registry.assert_alias_free(&owner.service_key, alias, None).await?;
        }
        let access = config.access.unwrap_or_default();
        let db = self.dbs.create(access, config.display_name.clone()).await?;
        let db_id = db.require_id()?;
        let grant = ServiceGrant {
            service_key: owner.service_key.clone(),
            alias: config.alias.clone(),
            persist: config.persist,
            presync: config.presync,
        };
        let registered = self
            .registry
            .update_db_record(principal, db_id, WriteScope::Record, |record| {
                let mut record = record.clone();
                record.set_owner(owner);
                record.created_by = Some(principal.clone());
                record.network.access = access;
                record.services = vec![grant];
                Some(record)
            })
            .await;
        if let Err(e) = registered {
            log::warn!("Discarding database {db_id}, it could not be registered: {e}");
            if let Some(db) = self.dbs.remove(&db_id) {
                if let Err(e) = db.teardown(true).await {
                    log::warn!("Failed to unload database {db_id}: {e}");
                }
            }
            return Err(e);
        }
        log::info!("Database {db_id} created for {}/{}", owner.user_key, owner.service_key);
        Ok(db)
    }

    /// The database `principal`'s service knows as `alias`, created on first use
    pub async fn get_or_create_db_by_alias(
        &self,
        principal: &Principal,
        alias: &str,
        config: &DbConfig,
    ) -> Result<Arc<Database>> {
        let _guard = self.dbs.context().locks.lock(format!("get-or-create-db:{alias}")).await;
        match self.resolve_alias(principal, alias).await? {
            Some(db_id) => self.load_db(principal, db_id).await,
            None => {
                let config = DbConfig {
                    alias: Some(alias.to_owned()),
                    ..config.clone()
                };
                self.create_db(principal, &config).await
            }
        }
    }

    pub async fn list_service_dbs(&self, principal: &Principal) -> Result<Vec<DbInfo>> {
        self.registry.list_service_dbs(principal).await
    }

    pub async fn admin_list_dbs_by_owning_user(
        &self,
        principal: &Principal,
        user_key: &str,
    ) -> Result<Vec<DbInfo>> {
        self.registry.admin_list_dbs_by_owning_user(principal, user_key).await
    }

    /// Create a database for `config.owner`, `principal` by default
    pub async fn admin_create_db(
        &self,
        principal: &Principal,
        config: &DbAdminConfig,
    ) -> Result<Arc<Database>> {
        let owner = config.owner.clone().unwrap_or_else(|| principal.clone());
        self.registry.assert_can_create_db_record(principal, &owner).await?;
        self.create_owned_db(principal, &owner, &config.config).await
    }

    /// Forget a database: delete its record and unload and un-announce it
    pub async fn admin_delete_db(&self, principal: &Principal, db_id: DbId) -> Result<()> {
        self.registry.admin_delete_db_record(principal, db_id).await?;
        if let Some(db) = self.dbs.remove(&db_id) {
            db.teardown(true).await?;
        }
        Ok(())
    }

    /// Change alias, access mode or display name of a database
    pub async fn configure_db(
        &self,
        principal: &Principal,
        db_id_or_alias: &str,
        config: &DbConfig,
    ) -> Result<DatabaseRecord> {
        let db_id = self.resolve_id(principal, db_id_or_alias).await?;
        let admin_config = DbAdminConfig {
            config: config.clone(),
            owner: None,
        };
        let record = self.registry.configure_db(principal, db_id, &admin_config).await?;
        let Some(display_name) = &config.display_name else {
            return Ok(record);
        };
        let db = self.load_db(principal, db_id).await?;
        if db.display_name().as_ref() == Some(display_name) {
            return Ok(record);
        }
        db.set_display_name(Some(display_name.clone())).await?;
        Ok(self.registry.update_db_record_cached_meta(&db).await?.unwrap_or(record))
    }

    pub async fn get_db_config(&self, principal: &Principal, db_id_or_alias: &str) -> Result<DbConfig> {
        let db_id = self.resolve_id(principal, db_id_or_alias).await?;
        self.registry.get_db_config(principal, db_id).await
    }

    pub async fn get_db_info(&self, principal: &Principal, db_id_or_alias: &str) -> Result<DbInfo> {
        let db_id = self.resolve_id(principal, db_id_or_alias).await?;
        if let (Some(db), Some(record)) =
            (self.dbs.get(&db_id), self.registry.get_db_record(&db_id).await?)
        {
            self.refresh_cached_meta(&db, &record).await;
        }
        self.registry.get_db_info(principal, db_id).await
    }

    pub async fn describe_db(
        &self,
        principal: &Principal,
        db_id_or_alias: &str,
    ) -> Result<DbDescribe> {
        let db_id = self.resolve_id(principal, db_id_or_alias).await?;
        self.load_db(principal, db_id).await?.describe().await
    }

    /// Wait until every loaded database has caught up with its remote state
    pub async fn when_all_synced(&self) {
        for db in self.dbs.get_all() {
            if let Err(e) = db.when_synced().await {
                log::debug!("Sync of {:?} failed: {e}", db.id());
            }
        }
    }

    /// Unload idle databases. Returns how many were unloaded.
    pub async fn sweep_inactive_dbs(&self) -> usize {
        sweep_inactive(&self.dbs).await
    }

    /// Stop the sweep and unload every database
    pub async fn shutdown(&self) {
        let sweep_task = self.sweep_task.lock().take();
        if let Some(task) = sweep_task {
            task.shutdown().await;
        }
        self.dbs.teardown_all(false).await;
        log::info!("Database manager shut down");
    }
}

async fn sweep_inactive(dbs: &Databases) -> usize {
    let now = dbs.context().time_getter.get_time();
    let mut unloaded = 0;
    for db in dbs.get_all() {
        if !db.is_ejectable_from_memory(now) {
            continue;
        }
        match db.teardown_if_idle(now).await {
            Ok(true) => {
                log::debug!("Unloaded inactive database {:?}", db.id());
                unloaded += 1;
            }
            Ok(false) => log::debug!("Database {:?} was used again, keeping it", db.id()),
            Err(e) => log::warn!("Failed to unload inactive database {:?}: {e}", db.id()),
        }
    }
    unloaded
}

impl std::fmt::Debug for DbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbManager")
            .field("registry", &self.registry)
            .field("loaded", &self.dbs.len())
            .finish_non_exhaustive()
    }
}

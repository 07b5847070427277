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

//! The private registry: a reserved database recording who owns which database, which
//! services use it and under which aliases, plus the known users and services.

pub mod records;
pub mod schemas;

use std::sync::Arc;

use itertools::Itertools;
use logging::log;
use storage_core::DbKey;
use utils::ensure;

use crate::{
    database::{records::ListOptions, Database, DbKind, SetupOptions},
    policy::{self, Actor},
    primitives::SYSTEM_USER_KEY,
    table::Table,
    AccessMode, Databases, DbId, Error, Principal, Result,
};

pub use self::{
    records::{
        CachedMeta, DatabaseRecord, DbAdminConfig, DbConfig, DbInfo, NetworkConfig, ServiceGrant,
        ServiceRecord, UserRecord, UserRole,
    },
    schemas::{DATABASES_TABLE, SERVICES_TABLE, USERS_TABLE},
};

/// Which rule a record change is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// Ownership, access mode or any grant
    Record,
    /// Only the acting service's own grant
    OwnGrant,
}

pub struct PrivateRegistry {
    db: Arc<Database>,
    dbs: Arc<Databases>,
    databases: Table,
    users: Table,
    services: Table,
}

impl PrivateRegistry {
    /// Attach to the registry database `server_db_id`, or create a new one, and register it
    /// in `dbs`
    pub async fn open(dbs: Arc<Databases>, server_db_id: Option<DbId>) -> Result<Self> {
        let db = Database::new(
            dbs.context().clone(),
            server_db_id,
            AccessMode::Private,
            DbKind::PrivateRegistry,
        );
        let opts = match server_db_id {
            Some(_) => SetupOptions::default(),
            None => {
                db.set_created_hook(|id| {
                    log::info!("New private server database created, key: {id}")
                });
                SetupOptions::create()
            }
        };
        db.setup(opts).await?;
        let id = db.require_id()?;
        if server_db_id.is_some() {
            log::info!("Attached to private server database {id}");
        }
        ensure!(
            db.writable(),
            Error::Configuration(format!("Server database {id} is not writable on this node"))
        );
        dbs.insert(Arc::clone(&db))?;

        let databases = db.register_table(DATABASES_TABLE, schemas::databases()?)?;
        let users = db.register_table(USERS_TABLE, schemas::users()?)?;
        let services = db.register_table(SERVICES_TABLE, schemas::services()?)?;
        Ok(Self {
            db,
            dbs,
            databases,
            users,
            services,
        })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn id(&self) -> Result<DbId> {
        self.db.require_id()
    }

    pub fn is_registry(&self, db_id: &DbId) -> bool {
        self.db.id().as_ref() == Some(db_id)
    }

    pub fn system_service_key(&self) -> &str {
        self.db.config().system_service_key.as_str()
    }

    async fn is_admin(&self, principal: &Principal) -> Result<bool> {
        self.is_user_admin(&principal.user_key).await
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    pub async fn get_user(&self, user_key: &str) -> Result<Option<UserRecord>> {
        match self.users.find(user_key).await? {
            Some(record) => Ok(Some(serde_json::from_value(record.value)?)),
            None => Ok(None),
        }
    }

    pub async fn is_user_admin(&self, user_key: &str) -> Result<bool> {
        if user_key == SYSTEM_USER_KEY {
            return Ok(true);
        }
        Ok(self.get_user(user_key).await?.is_some_and(|user| user.role == UserRole::Admin))
    }

    pub async fn get_service(&self, service_key: &str) -> Result<Option<ServiceRecord>> {
        match self.services.find(service_key).await? {
            Some(record) => Ok(Some(serde_json::from_value(record.value)?)),
            None => Ok(None),
        }
    }

    /// User owning a service; the system service belongs to the system user
    pub async fn get_service_owner_key(&self, service_key: &str) -> Result<Option<String>> {
        if service_key == self.system_service_key() {
            return Ok(Some(SYSTEM_USER_KEY.to_owned()));
        }
        Ok(self.get_service(service_key).await?.map(|service| service.owning_user_key))
    }

    pub async fn put_user(&self, principal: &Principal, user: &UserRecord) -> Result<()> {
        let is_admin = self.is_admin(principal).await?;
        policy::assert_is_admin(&Actor::new(principal, is_admin, self.system_service_key()), "add users")?;
        self.users.put(&user.user_key, &serde_json::to_value(user)?).await?;
        log::info!("User {} registered as {:?}", user.user_key, user.role);
        Ok(())
    }

    pub async fn put_service(&self, principal: &Principal, service: &ServiceRecord) -> Result<()> {
        let is_admin = self.is_admin(principal).await?;
        policy::assert_is_admin(
            &Actor::new(principal, is_admin, self.system_service_key()),
            "register services",
        )?;
        self.services.put(&service.service_key, &serde_json::to_value(service)?).await?;
        log::info!(
            "Service {} registered to user {}",
            service.service_key,
            service.owning_user_key
        );
        Ok(())
    }

    pub async fn get_db_record(&self, db_id: &DbId) -> Result<Option<DatabaseRecord>> {
        match self.databases.find(&db_id.to_string()).await? {
            Some(record) => Ok(Some(serde_json::from_value(record.value)?)),
            None => Ok(None),
        }
    }

    pub async fn list_db_records(&self) -> Result<Vec<DatabaseRecord>> {
        let records = self.databases.list(&ListOptions::default()).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record.value) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping unreadable database record {}: {e}", record.key);
                    None
                }
            })
            .collect())
    }

    /// The database `principal`'s service knows as `alias`
    pub async fn find_by_service_alias(
        &self,
        principal: &Principal,
        alias: &str,
    ) -> Result<Option<DatabaseRecord>> {
        Ok(self
            .list_db_records()
            .await?
            .into_iter()
            .find(|record| record.alias_for(&principal.service_key) == Some(alias)))
    }

    /// A database of `principal`'s user that another of the user's services knows as `alias`
    pub async fn find_by_user_alias(
        &self,
        principal: &Principal,
        alias: &str,
    ) -> Result<Option<DatabaseRecord>> {
        Ok(self.list_db_records().await?.into_iter().find(|record| {
            record.owning_user_key.as_deref() == Some(principal.user_key.as_str())
                && record.services.iter().any(|grant| grant.alias.as_deref() == Some(alias))
        }))
    }

    pub async fn assert_can_read_database(&self, principal: &Principal, db_id: &DbId) -> Result<()> {
        let is_admin = self.is_admin(principal).await?;
        let actor = Actor::new(principal, is_admin, self.system_service_key());
        if actor.is_admin {
            return Ok(());
        }
        let record = self.get_db_record(db_id).await?;
        policy::assert_can_read_database(&actor, db_id, record.as_ref(), self.is_registry(db_id))
    }

    async fn assert_can_write(
        &self,
        principal: &Principal,
        scope: WriteScope,
        old: Option<&DatabaseRecord>,
        new: &DatabaseRecord,
    ) -> Result<()> {
        let is_admin = self.is_admin(principal).await?;
        let actor = Actor::new(principal, is_admin, self.system_service_key());
        match scope {
            WriteScope::Record => {
                let new_service_owner = match policy::moved_to_foreign_service(&actor, old, new) {
                    Some(service) if !actor.is_admin => self.get_service_owner_key(service).await?,
                    _ => None,
                };
                policy::assert_can_write_database_record(
                    &actor,
                    old,
                    Some(new),
                    new_service_owner.as_deref(),
                )
            }
            WriteScope::OwnGrant => policy::assert_can_write_service_grant(&actor, old, new),
        }
    }

    /// Check up front that `principal` may create a database owned by `owner`
    pub async fn assert_can_create_db_record(
        &self,
        principal: &Principal,
        owner: &Principal,
    ) -> Result<()> {
        let mut prospective = DatabaseRecord::new(DbId::from(DbKey::from_bytes([0; 32])), Self::now());
        prospective.set_owner(owner);
        self.assert_can_write(principal, WriteScope::Record, None, &prospective).await
    }

    fn record_lock_name(db_id: &DbId) -> String {
        format!("{DATABASES_TABLE}:{db_id}")
    }

    fn service_aliases_lock_name(service_key: &str) -> String {
        format!("{DATABASES_TABLE}:aliases:{service_key}")
    }

    /// Fail if `service_key` already knows a database other than `db_id` as `alias`
    pub async fn assert_alias_free(
        &self,
        service_key: &str,
        alias: &str,
        db_id: Option<&DbId>,
    ) -> Result<()> {
        let taken = self.list_db_records().await?.into_iter().find(|record| {
            Some(&record.db_id) != db_id && record.alias_for(service_key) == Some(alias)
        });
        match taken {
            Some(record) => Err(Error::Configuration(format!(
                "Service {service_key} already uses alias \"{alias}\" for database {}",
                record.db_id
            ))),
            None => Ok(()),
        }
    }

    /// Live metadata of a database, loading it if needed
    async fn live_meta(&self, db_id: DbId) -> Result<CachedMeta> {
        let db = match self.dbs.get(&db_id) {
            Some(db) => db,
            None => self.dbs.load(db_id, AccessMode::Public).await?,
        };
        db.touch().await?;
        Ok(CachedMeta {
            display_name: db.display_name(),
            writable: db.writable(),
        })
    }

    /// Read-modify-write of the record of `db_id` under its lock.
    ///
    /// A missing record is synthesized from the live database, whose metadata is fetched before
    /// the lock is taken. `f` returns `None` to leave the record unchanged; a synthesized record
    /// is written either way. The change is checked against `scope`'s rule and the table schema
    /// before anything is written.
    pub async fn update_db_record(
        &self,
        principal: &Principal,
        db_id: DbId,
        scope: WriteScope,
        f: impl FnOnce(&DatabaseRecord) -> Option<DatabaseRecord>,
    ) -> Result<DatabaseRecord> {
        ensure!(
            !self.is_registry(&db_id),
            Error::Permissions("The server database has no registry record".to_owned())
        );
        let live_meta = match self.get_db_record(&db_id).await? {
            Some(_) => None,
            None => Some(self.live_meta(db_id).await?),
        };

        let _guard = self.db.context().locks.lock(Self::record_lock_name(&db_id)).await;
        let old = self.get_db_record(&db_id).await?;
        let base = match (&old, live_meta) {
            (Some(old), _) => old.clone(),
            (None, Some(cached_meta)) => DatabaseRecord {
                cached_meta,
                ..DatabaseRecord::new(db_id, Self::now())
            },
            (None, None) => {
                return Err(Error::NotFound(format!(
                    "Registry record of {db_id} was removed concurrently"
                )))
            }
        };
        let updated = match f(&base) {
            Some(updated) => updated,
            None if old.is_none() => base,
            None => return Ok(base),
        };
        ensure!(
            updated.db_id == db_id,
            Error::Configuration("The id of a database record cannot change".to_owned())
        );

        self.assert_can_write(principal, scope, old.as_ref(), &updated).await?;

        let claimed = claimed_aliases(old.as_ref(), &updated);
        let mut alias_guards = Vec::with_capacity(claimed.len());
        for (service_key, alias) in claimed {
            alias_guards
                .push(self.db.context().locks.lock(Self::service_aliases_lock_name(service_key)).await);
            self.assert_alias_free(service_key, alias, Some(&db_id)).await?;
        }
        self.databases.put(&db_id.to_string(), &serde_json::to_value(&updated)?).await?;

        if let Some(db) = self.dbs.get(&db_id) {
            if let Err(e) = db.on_config_updated(updated.network.access).await {
                log::warn!("Failed to apply the new access mode of {db_id}: {e}");
            }
        }
        Ok(updated)
    }

    /// Grant `principal`'s service access to a database under `alias`. A database without an
    /// owner becomes owned by `principal`.
    pub async fn configure_service_db_access(
        &self,
        principal: &Principal,
        db_id: DbId,
        alias: Option<String>,
        persist: bool,
        presync: bool,
    ) -> Result<DatabaseRecord> {
        let grant = ServiceGrant {
            service_key: principal.service_key.clone(),
            alias,
            persist,
            presync,
        };
        self.update_db_record(principal, db_id, WriteScope::OwnGrant, |record| {
            let mut updated = record.with_grant(grant).unwrap_or_else(|| record.clone());
            if updated.owning_user_key.is_none() {
                updated.set_owner(principal);
                updated.created_by = Some(principal.clone());
            }
            (updated != *record).then_some(updated)
        })
        .await
    }

    pub async fn set_access(
        &self,
        principal: &Principal,
        db_id: DbId,
        access: AccessMode,
    ) -> Result<DatabaseRecord> {
        self.update_db_record(principal, db_id, WriteScope::Record, |record| {
            (record.network.access != access).then(|| {
                let mut updated = record.clone();
                updated.network.access = access;
                updated
            })
        })
        .await
    }

    pub async fn transfer_ownership(
        &self,
        principal: &Principal,
        db_id: DbId,
        new_owner: &Principal,
    ) -> Result<DatabaseRecord> {
        self.update_db_record(principal, db_id, WriteScope::Record, |record| {
            (record.owner().as_ref() != Some(new_owner)).then(|| {
                let mut updated = record.clone();
                updated.set_owner(new_owner);
                updated
            })
        })
        .await
    }

    /// Apply alias, access and owner settings. The alias is that of `principal`'s service.
    ///
    /// A change of the alias alone only touches the service's own grant and is checked as such.
    pub async fn configure_db(
        &self,
        principal: &Principal,
        db_id: DbId,
        config: &DbAdminConfig,
    ) -> Result<DatabaseRecord> {
        let scope = if config.config.access.is_none() && config.owner.is_none() {
            WriteScope::OwnGrant
        } else {
            WriteScope::Record
        };
        self.update_db_record(principal, db_id, scope, |record| {
            let mut updated = record.clone();
            if let Some(alias) = &config.config.alias {
                let grant = updated.grant(&principal.service_key).cloned().unwrap_or_else(|| {
                    ServiceGrant::new(principal.service_key.clone())
                });
                if grant.alias.as_ref() != Some(alias) {
                    updated = updated
                        .with_grant(grant.with_alias(Some(alias.clone())))
                        .unwrap_or(updated);
                }
            }
            if let Some(access) = config.config.access {
                updated.network.access = access;
            }
            if let Some(owner) = &config.owner {
                updated.set_owner(owner);
            }
            (updated != *record).then_some(updated)
        })
        .await
    }

    /// Bring the cached metadata of `db`'s record in line with the live database. Databases
    /// without a record are left alone.
    pub async fn update_db_record_cached_meta(
        &self,
        db: &Database,
    ) -> Result<Option<DatabaseRecord>> {
        let db_id = db.require_id()?;
        if self.is_registry(&db_id) || self.get_db_record(&db_id).await?.is_none() {
            return Ok(None);
        }
        let live = CachedMeta {
            display_name: db.display_name(),
            writable: db.writable(),
        };
        let system = Principal::system(self.system_service_key());
        let record = self
            .update_db_record(&system, db_id, WriteScope::Record, |record| {
                (record.cached_meta != live).then(|| DatabaseRecord {
                    cached_meta: live,
                    ..record.clone()
                })
            })
            .await?;
        Ok(Some(record))
    }

    /// Delete the record of `db_id`; the database itself is not touched
    pub async fn admin_delete_db_record(
        &self,
        principal: &Principal,
        db_id: DbId,
    ) -> Result<DatabaseRecord> {
        let _guard = self.db.context().locks.lock(Self::record_lock_name(&db_id)).await;
        let record = self
            .get_db_record(&db_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Database {db_id}")))?;
        let is_admin = self.is_admin(principal).await?;
        let actor = Actor::new(principal, is_admin, self.system_service_key());
        policy::assert_can_write_database_record(&actor, Some(&record), None, None)?;
        self.databases.del(&db_id.to_string()).await?;
        log::info!("Registry record of {db_id} deleted");
        Ok(record)
    }

    pub async fn get_db_config(&self, principal: &Principal, db_id: DbId) -> Result<DbConfig> {
        self.assert_can_read_database(principal, &db_id).await?;
        let record = self
            .get_db_record(&db_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No config for database {db_id}")))?;
        let grant = record.grant(&principal.service_key);
        Ok(DbConfig {
            alias: grant.and_then(|grant| grant.alias.clone()),
            access: Some(record.network.access),
            display_name: record.cached_meta.display_name.clone(),
            persist: grant.is_some_and(|grant| grant.persist),
            presync: grant.is_some_and(|grant| grant.presync),
        })
    }

    pub async fn get_db_info(&self, principal: &Principal, db_id: DbId) -> Result<DbInfo> {
        self.assert_can_read_database(principal, &db_id).await?;
        if self.is_registry(&db_id) {
            return self.server_db_info();
        }
        Ok(match self.get_db_record(&db_id).await? {
            Some(record) => DbInfo::from_record(&record, Some(&principal.service_key)),
            None => DbInfo::unregistered(db_id),
        })
    }

    fn server_db_info(&self) -> Result<DbInfo> {
        Ok(DbInfo {
            db_id: self.id()?,
            writable: self.db.writable(),
            is_server_db: true,
            display_name: self.db.display_name(),
            owner: Some(Principal::system(self.system_service_key())),
            alias: None,
            access: Some(AccessMode::Private),
            created_at: None,
        })
    }

    /// Databases of `principal`'s user that are owned by or granted to `principal`'s service
    pub async fn list_service_dbs(&self, principal: &Principal) -> Result<Vec<DbInfo>> {
        Ok(self
            .list_db_records()
            .await?
            .iter()
            .filter(|record| {
                record.owning_user_key.as_deref() == Some(principal.user_key.as_str())
                    && record.is_attached_to(&principal.service_key)
            })
            .sorted_by(|a, b| a.created_at.cmp(&b.created_at))
            .map(|record| DbInfo::from_record(record, Some(&principal.service_key)))
            .collect())
    }

    /// Databases owned by `user_key`; the server database counts as owned by the system user
    pub async fn admin_list_dbs_by_owning_user(
        &self,
        principal: &Principal,
        user_key: &str,
    ) -> Result<Vec<DbInfo>> {
        let is_admin = self.is_admin(principal).await?;
        let actor = Actor::new(principal, is_admin, self.system_service_key());
        policy::assert_can_enumerate_databases_owned_by(&actor, user_key)?;

        let mut infos = Vec::new();
        if user_key == SYSTEM_USER_KEY {
            infos.push(self.server_db_info()?);
        }
        infos.extend(
            self.list_db_records()
                .await?
                .iter()
                .filter(|record| record.owning_user_key.as_deref() == Some(user_key))
                .sorted_by(|a, b| a.created_at.cmp(&b.created_at))
                .map(|record| DbInfo::from_record(record, None)),
        );
        Ok(infos)
    }
}

/// Aliases `updated` binds that `old` did not, at most one per service, ordered by service
fn claimed_aliases<'a>(
    old: Option<&DatabaseRecord>,
    updated: &'a DatabaseRecord,
) -> Vec<(&'a str, &'a str)> {
    updated
        .services
        .iter()
        .filter_map(|grant| Some((grant.service_key.as_str(), grant.alias.as_deref()?)))
        .filter(|(service_key, alias)| {
            old.and_then(|old| old.alias_for(service_key)) != Some(*alias)
        })
        .sorted()
        .dedup_by(|a, b| a.0 == b.0)
        .collect()
}

impl std::fmt::Debug for PrivateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateRegistry").field("db", &self.db.id()).finish_non_exhaustive()
    }
}

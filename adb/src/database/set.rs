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

//! The set of databases known to the process

use std::{collections::BTreeMap, sync::Arc};

use logging::log;
use parking_lot::RwLock;
use storage_core::DiscoveryKey;

use super::{Database, DbContext, DbKind, SetupOptions};
use crate::{AccessMode, DbId, Result};

/// Shared map from id to database instance.
///
/// Readers get snapshots and must tolerate entries disappearing concurrently. A database is
/// only inserted once fully set up.
pub struct Databases {
    ctx: DbContext,
    dbs: RwLock<BTreeMap<DbId, Arc<Database>>>,
}

impl Databases {
    pub fn new(ctx: DbContext) -> Self {
        Self {
            ctx,
            dbs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn context(&self) -> &DbContext {
        &self.ctx
    }

    pub fn get(&self, id: &DbId) -> Option<Arc<Database>> {
        self.dbs.read().get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<Database>> {
        self.dbs.read().values().cloned().collect()
    }

    pub fn get_by_discovery_key(&self, discovery_key: &DiscoveryKey) -> Option<Arc<Database>> {
        self.dbs
            .read()
            .iter()
            .find(|(id, _)| id.key().discovery_key() == *discovery_key)
            .map(|(_, db)| Arc::clone(db))
    }

    pub fn len(&self) -> usize {
        self.dbs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dbs.read().is_empty()
    }

    /// Insert a set-up database. Returns the instance already registered under its id, if any.
    pub fn insert(&self, db: Arc<Database>) -> Result<Option<Arc<Database>>> {
        let id = db.require_id()?;
        Ok(self.dbs.write().insert(id, db))
    }

    pub fn remove(&self, id: &DbId) -> Option<Arc<Database>> {
        self.dbs.write().remove(id)
    }

    /// The instance for `id`, attaching to the database and setting it up on first use.
    /// Concurrent callers for the same id share one instance.
    pub async fn load(&self, id: DbId, access: AccessMode) -> Result<Arc<Database>> {
        if let Some(db) = self.get(&id) {
            return Ok(db);
        }
        let _guard = self.ctx.locks.lock(format!("load-db:{id}")).await;
        if let Some(db) = self.get(&id) {
            return Ok(db);
        }
        let db = Database::new(self.ctx.clone(), Some(id), access, DbKind::Regular);
        db.setup(SetupOptions::default()).await?;
        self.dbs.write().insert(id, Arc::clone(&db));
        log::debug!("Database {id} registered");
        Ok(db)
    }

    /// Create a new database and register it
    pub async fn create(
        &self,
        access: AccessMode,
        display_name: Option<String>,
    ) -> Result<Arc<Database>> {
        let db = Database::new(self.ctx.clone(), None, access, DbKind::Regular);
        db.setup(SetupOptions::create().with_display_name(display_name)).await?;
        self.insert(Arc::clone(&db))?;
        Ok(db)
    }

    /// Unload every database
    pub async fn teardown_all(&self, unswarm: bool) {
        for db in self.get_all() {
            if let Err(e) = db.teardown(unswarm).await {
                log::warn!("Failed to unload database {:?}: {e}", db.id());
            }
        }
    }
}

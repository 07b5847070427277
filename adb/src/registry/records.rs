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

//! Records kept in the registry tables

use serde::{Deserialize, Serialize};

use crate::{AccessMode, DbId, Principal};

/// Access of one service to a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGrant {
    pub service_key: String,
    /// Name the service knows the database by; unique among that service's grants only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub presync: bool,
}

impl ServiceGrant {
    pub fn new(service_key: impl Into<String>) -> Self {
        Self {
            service_key: service_key.into(),
            alias: None,
            persist: false,
            presync: false,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub access: AccessMode,
}

/// Copy of a database's live metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRecord {
    pub db_id: DbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_user_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_service_key: Option<String>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub services: Vec<ServiceGrant>,
    #[serde(default)]
    pub cached_meta: CachedMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Principal>,
    pub created_at: String,
}

impl DatabaseRecord {
    pub fn new(db_id: DbId, created_at: String) -> Self {
        Self {
            db_id,
            owning_user_key: None,
            owning_service_key: None,
            network: NetworkConfig::default(),
            services: Vec::new(),
            cached_meta: CachedMeta::default(),
            created_by: None,
            created_at,
        }
    }

    pub fn owner(&self) -> Option<Principal> {
        match (&self.owning_user_key, &self.owning_service_key) {
            (Some(user), Some(service)) => Some(Principal::new(user, service)),
            _ => None,
        }
    }

    pub fn set_owner(&mut self, owner: &Principal) {
        self.owning_user_key = Some(owner.user_key.clone());
        self.owning_service_key = Some(owner.service_key.clone());
    }

    pub fn grant(&self, service_key: &str) -> Option<&ServiceGrant> {
        self.services.iter().find(|grant| grant.service_key == service_key)
    }

    pub fn alias_for(&self, service_key: &str) -> Option<&str> {
        self.grant(service_key)?.alias.as_deref()
    }

    /// A copy with `grant` replacing the grant of the same service, or `None` if it is
    /// already in place
    pub fn with_grant(&self, grant: ServiceGrant) -> Option<Self> {
        if self.grant(&grant.service_key) == Some(&grant) {
            return None;
        }
        let mut record = self.without_grant(&grant.service_key);
        record.services.push(grant);
        Some(record)
    }

    pub fn without_grant(&self, service_key: &str) -> Self {
        let mut record = self.clone();
        record.services.retain(|grant| grant.service_key != service_key);
        record
    }

    /// Whether `service_key` owns the database or has been granted access to it
    pub fn is_attached_to(&self, service_key: &str) -> bool {
        self.owning_service_key.as_deref() == Some(service_key) || self.grant(service_key).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_key: String,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub service_key: String,
    pub owning_user_key: String,
}

/// Settings a service chooses for a database it uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub presync: bool,
}

/// Settings an administrator may impose, including ownership
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAdminConfig {
    #[serde(flatten)]
    pub config: DbConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Principal>,
}

/// What callers may learn about a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInfo {
    pub db_id: DbId,
    pub writable: bool,
    pub is_server_db: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl DbInfo {
    /// Info from a record, with the alias as seen by `service_key`
    pub fn from_record(record: &DatabaseRecord, service_key: Option<&str>) -> Self {
        let alias = match service_key {
            Some(service_key) => record.alias_for(service_key),
            None => record.owning_service_key.as_deref().and_then(|s| record.alias_for(s)),
        };
        Self {
            db_id: record.db_id,
            writable: record.cached_meta.writable,
            is_server_db: false,
            display_name: record.cached_meta.display_name.clone(),
            owner: record.owner(),
            alias: alias.map(str::to_owned),
            access: Some(record.network.access),
            created_at: Some(record.created_at.clone()),
        }
    }

    /// Info about a database with no registry record
    pub fn unregistered(db_id: DbId) -> Self {
        Self {
            db_id,
            writable: false,
            is_server_db: false,
            display_name: None,
            owner: None,
            alias: None,
            access: None,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn db_id() -> DbId {
        "0f".repeat(32).parse().unwrap()
    }

    #[test]
    fn wire_format() {
        let mut record = DatabaseRecord::new(db_id(), "2024-05-01T10:00:00.000Z".to_owned());
        record.set_owner(&Principal::new("alice", "app"));
        record.services.push(ServiceGrant::new("app").with_alias(Some("main".to_owned())));
        record.cached_meta.writable = true;

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "dbId": "0f".repeat(32),
                "owningUserKey": "alice",
                "owningServiceKey": "app",
                "network": {"access": "public"},
                "services": [{"serviceKey": "app", "alias": "main", "persist": false, "presync": false}],
                "cachedMeta": {"writable": true},
                "createdAt": "2024-05-01T10:00:00.000Z",
            })
        );
        let back: DatabaseRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn grants_are_unique_per_service() {
        let record = DatabaseRecord::new(db_id(), String::new());
        let record = record.with_grant(ServiceGrant::new("a").with_alias(Some("x".to_owned()))).unwrap();
        let record = record.with_grant(ServiceGrant::new("b").with_alias(Some("y".to_owned()))).unwrap();
        assert!(record.with_grant(ServiceGrant::new("a").with_alias(Some("x".to_owned()))).is_none());

        let record = record.with_grant(ServiceGrant::new("a").with_alias(Some("z".to_owned()))).unwrap();
        assert_eq!(record.services.len(), 2);
        assert_eq!(record.alias_for("a"), Some("z"));
        assert_eq!(record.alias_for("b"), Some("y"));
        assert!(record.is_attached_to("b"));
        assert!(!record.is_attached_to("c"));
    }

    #[test]
    fn admin_config_flattens() {
        let config: DbAdminConfig = serde_json::from_value(json!({
            "alias": "main",
            "access": "private",
            "owner": {"userKey": "bob", "serviceKey": "app"},
        }))
        .unwrap();
        assert_eq!(config.config.alias.as_deref(), Some("main"));
        assert_eq!(config.config.access, Some(AccessMode::Private));
        assert_eq!(config.owner, Some(Principal::new("bob", "app")));
    }
}

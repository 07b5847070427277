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

//! Identifiers shared by all parts of the core

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use storage_core::DbKey;

use crate::Error;

/// User key of the server itself. Always treated as an admin.
pub const SYSTEM_USER_KEY: &str = "system";

/// Identifier of a database: the hex form of its store's public key
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbId(DbKey);

impl DbId {
    pub fn key(&self) -> DbKey {
        self.0
    }

    /// Whether the string has the shape of a database id, as opposed to an alias
    pub fn looks_like_id(s: &str) -> bool {
        s.len() == DbKey::HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl From<DbKey> for DbId {
    fn from(key: DbKey) -> Self {
        Self(key)
    }
}

impl FromStr for DbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self).map_err(|e| Error::InvalidDbId(format!("{s}: {e}")))
    }
}

impl std::fmt::Display for DbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for DbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbId({})", self.0)
    }
}

impl Serialize for DbId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DbId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Public,
    Private,
}

/// The identity an operation runs on behalf of
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_key: String,
    pub service_key: String,
}

impl Principal {
    pub fn new(user_key: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            service_key: service_key.into(),
        }
    }

    /// The server acting for itself
    pub fn system(system_service_key: &str) -> Self {
        Self::new(SYSTEM_USER_KEY, system_service_key)
    }

    pub fn is_system_user(&self) -> bool {
        self.user_key == SYSTEM_USER_KEY
    }
}

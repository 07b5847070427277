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

//! The description record every database keeps about itself

use serde::{Deserialize, Serialize};
use storage_core::DbKey;

use crate::schema::TableId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDesc {
    pub domain: String,
    pub name: String,
    pub revision: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Hex key of the blob feed. Set at most once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs_feed_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableDesc>>,
    /// The description could not be read, typically because the database has not been
    /// replicated locally yet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub did_fail_load: bool,
}

impl DbDescription {
    pub fn failed() -> Self {
        Self {
            did_fail_load: true,
            ..Self::default()
        }
    }

    pub fn check(&self) -> Result<(), String> {
        if let Some(key) = &self.blobs_feed_key {
            key.parse::<DbKey>().map_err(|e| format!("bad blobsFeedKey: {e}"))?;
        }
        Ok(())
    }

    pub fn blobs_feed_key(&self) -> Option<DbKey> {
        self.blobs_feed_key.as_ref().and_then(|key| key.parse().ok())
    }

    pub fn table_revision(&self, table_id: &TableId) -> Option<u32> {
        self.tables.as_ref()?.iter().find_map(|t| {
            (t.domain == table_id.domain() && t.name == table_id.name()).then_some(t.revision)
        })
    }

    /// A copy listing the table at `revision`, or `None` if it is listed at that revision or a
    /// later one already
    pub fn with_table(&self, table_id: &TableId, revision: u32) -> Option<Self> {
        if self.table_revision(table_id).is_some_and(|r| r >= revision) {
            return None;
        }
        let mut desc = self.clone();
        let tables = desc.tables.get_or_insert_with(Vec::new);
        tables.retain(|t| !(t.domain == table_id.domain() && t.name == table_id.name()));
        tables.push(TableDesc {
            domain: table_id.domain().to_owned(),
            name: table_id.name().to_owned(),
            revision,
        });
        Some(desc)
    }

    /// A copy referencing the blob feed, or `None` if a feed is referenced already
    pub fn with_blobs_feed_key(&self, key: &DbKey) -> Option<Self> {
        if self.blobs_feed_key.is_some() {
            return None;
        }
        Some(Self {
            blobs_feed_key: Some(key.to_string()),
            ..self.clone()
        })
    }
}

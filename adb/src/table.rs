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

//! Schema-checked record collections inside a database

use std::sync::Arc;

use base64::Engine;
use futures::stream::BoxStream;
use logging::log;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage_core::{StoreDiff, Sub};
use utils::tokio_utils::tokio_spawn;

use crate::{
    blobs::BlobPointer,
    database::{
        cursor::ReadCursor,
        records::{decode_entry, record_url, DbPath, Diff, ListOptions, Record, RecordLocation},
        Database, BLOBS_NAMESPACE,
    },
    schema::{TableId, TableSchema, ValidationError},
    Error, Result,
};

/// A blob as sent by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobDesc {
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Base64 encoded content
    pub buf: String,
}

/// Content of a blob read back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

#[derive(Clone)]
pub struct Table {
    db: Arc<Database>,
    id: TableId,
    path: DbPath,
}

impl Table {
    pub(crate) fn new(db: Arc<Database>, id: TableId) -> Self {
        let path = DbPath::from_segments([id.domain(), id.name()]);
        Self { db, id, path }
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn schema(&self) -> Arc<TableSchema> {
        self.db.table_schema(&self.id)
    }

    fn sub(&self) -> Sub {
        self.path.sub()
    }

    fn blob_path(&self, key: &str) -> DbPath {
        DbPath::from_segments([BLOBS_NAMESPACE, self.id.domain(), self.id.name(), key])
    }

    fn location(&self, key: &str) -> RecordLocation {
        let path = self.path.join(key).to_string();
        RecordLocation {
            key: key.to_owned(),
            url: record_url(self.db.id().as_ref(), &path),
            path,
        }
    }

    fn check_key(key: &str) -> Result<()> {
        utils::ensure!(
            !key.is_empty() && !key.contains('/') && !key.contains('\0'),
            Error::InvalidPath(format!("bad record key \"{key}\""))
        );
        Ok(())
    }

    /// The record at `key`, if any. Fails if the stored value does not pass validation.
    pub async fn find(&self, key: &str) -> Result<Option<Record>> {
        Self::check_key(key)?;
        let store = self.db.touch().await?;
        let sub = self.sub();
        let read = sub.get(store.as_ref(), key.as_bytes());
        let entry = tokio::time::timeout(*self.db.config().read_timeout, read).await??;
        let Some(entry) = entry else {
            return Ok(None);
        };
        let record = decode_entry(self.db.id().as_ref(), &self.path, entry)?;
        if !record.value.is_null() {
            self.schema().validate(&record.value)?;
        }
        Ok(Some(record))
    }

    pub async fn get(&self, key: &str) -> Result<Record> {
        self.find(key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{key}", self.id)))
    }

    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<Record>> {
        let entries = self.db.scan_entries(&self.sub(), opts).await?;
        Ok(self.db.decode_entries(&self.path, Some(&self.id), opts, entries))
    }

    pub async fn create_read_stream(
        &self,
        opts: ListOptions,
    ) -> Result<BoxStream<'static, Result<Record>>> {
        Ok(self.cursor_read(opts).into_stream())
    }

    pub fn cursor_read(&self, opts: ListOptions) -> ReadCursor {
        ReadCursor::new(Arc::clone(&self.db), self.path.clone(), opts, Some(self.id.clone()))
    }

    /// Validate and write a record
    pub async fn put(&self, key: &str, value: &Value) -> Result<RecordLocation> {
        Self::check_key(key)?;
        let schema = self.schema();
        schema.validate(value)?;
        let store = self.db.touch().await?;
        self.sub().put(store.as_ref(), key.as_bytes(), serde_json::to_vec(value)?).await?;
        self.db.note_table(&self.id, schema.revision()).await;
        Ok(self.location(key))
    }

    /// Write a record under a key derived from its content
    pub async fn create(&self, value: &Value) -> Result<RecordLocation> {
        let schema = self.schema();
        schema.validate(value)?;
        let key = schema.generate_key(value)?;
        self.put(&key, value).await
    }

    /// Delete a record; its blobs are cleaned up in the background
    pub async fn del(&self, key: &str) -> Result<()> {
        Self::check_key(key)?;
        let store = self.db.touch().await?;
        self.sub().del(store.as_ref(), key.as_bytes()).await?;

        let table = self.clone();
        let key = key.to_owned();
        tokio_spawn(
            async move {
                if let Err(e) = table.remove_blobs(&key).await {
                    log::warn!("Failed to clean up blobs of {}/{key}: {e}", table.id);
                }
            },
            "table-blob-cleanup",
        );
        Ok(())
    }

    async fn remove_blobs(&self, key: &str) -> Result<()> {
        for (name, pointer) in self.list_blob_pointers(key).await? {
            self.db.del(&self.blob_path(key).join(&name).to_string()).await?;
            self.db.blobs().decache(&pointer).await;
        }
        Ok(())
    }

    /// Changes to this table's records since `since_version` of the database
    pub async fn list_diff(&self, since_version: u64) -> Result<Vec<Diff>> {
        let store = self.db.touch().await?;
        let diffs = tokio::time::timeout(*self.db.config().read_timeout, store.diff(since_version))
            .await??;
        let sub = self.sub();
        let id = self.db.id();
        let diffs = diffs
            .into_iter()
            .filter(|diff| diff.key().is_some_and(|key| sub.contains(key)))
            .filter_map(|StoreDiff { left, right }| {
                let decode = |entry: Option<storage_core::Entry>| -> Result<Option<Record>> {
                    entry
                        .map(|mut entry| {
                            entry.key = sub.strip(&entry.key).unwrap_or_default().to_vec();
                            decode_entry(id.as_ref(), &self.path, entry)
                        })
                        .transpose()
                };
                match (decode(left), decode(right)) {
                    (Ok(left), Ok(right)) => Some(Diff { left, right }),
                    (Err(e), _) | (_, Err(e)) => {
                        log::debug!("Skipping undecodable change in {}: {e}", self.id);
                        None
                    }
                }
            })
            .collect();
        Ok(diffs)
    }

    pub fn record_title(&self, record: &Record) -> String {
        self.schema().record_title(&record.key, &record.value)
    }

    /// Attach a blob to a record
    pub async fn put_blob(&self, key: &str, blob_name: &str, blob: &BlobDesc) -> Result<BlobPointer> {
        Self::check_key(key)?;
        Self::check_key(blob_name)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&blob.buf)
            .map_err(|e| ValidationError::new("/buf", format!("must be base64: {e}")))?;
        self.schema().check_blob(blob_name, blob.mime_type.as_deref(), bytes.len() as u64)?;

        let pointer = BlobPointer {
            mime_type: blob.mime_type.clone(),
            ..self.db.blobs().put(&bytes).await?
        };
        let path = self.blob_path(key).join(blob_name).to_string();
        self.db.put(&path, &serde_json::to_value(&pointer)?).await?;
        Ok(pointer)
    }

    pub async fn get_blob_pointer(&self, key: &str, blob_name: &str) -> Result<BlobPointer> {
        Self::check_key(key)?;
        Self::check_key(blob_name)?;
        let path = self.blob_path(key).join(blob_name).to_string();
        let record = self
            .db
            .get(&path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("blob {blob_name} of {}/{key}", self.id)))?;
        Ok(serde_json::from_value(record.value)?)
    }

    pub async fn get_blob(&self, key: &str, blob_name: &str) -> Result<BlobContent> {
        let pointer = self.get_blob_pointer(key, blob_name).await?;
        let bytes = self.db.blobs().get(&pointer).await?;
        Ok(BlobContent {
            bytes,
            mime_type: pointer.mime_type,
        })
    }

    pub async fn del_blob(&self, key: &str, blob_name: &str) -> Result<()> {
        let pointer = self.get_blob_pointer(key, blob_name).await?;
        let path = self.blob_path(key).join(blob_name).to_string();
        self.db.del(&path).await?;
        self.db.blobs().decache(&pointer).await;
        Ok(())
    }

    /// Blobs attached to a record, by name
    pub async fn list_blob_pointers(&self, key: &str) -> Result<Vec<(String, BlobPointer)>> {
        Self::check_key(key)?;
        let records = self
            .db
            .list(&self.blob_path(key).to_string(), &ListOptions::default())
            .await?;
        records
            .into_iter()
            .filter(|record| !record.key.contains('\0'))
            .map(|record| Ok((record.key, serde_json::from_value(record.value)?)))
            .collect()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("db", &self.db.id()).field("id", &self.id).finish()
    }
}

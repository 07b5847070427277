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

//! Chunked binary storage attached to a database.
//!
//! Every database has at most one blob feed, created lazily by its writer and referenced from
//! the database description. Blobs are addressed by the chunk range they were appended as.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use logging::log;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use storage_core::{BlobFeed, Data, DbKey};
use tokio_util::sync::CancellationToken;
use utils::{
    ensure,
    scheduler::{spawn_cancellable, Backoff, TaskHandle},
    tokio_utils::tokio_spawn,
};

use crate::{
    database::{Database, DbContext},
    Error, Result,
};

/// A range of chunks `[start, end)` in the blob feed, with the content type of the blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobPointer {
    pub start: u64,
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl BlobPointer {
    pub fn chunks(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }

    fn check(&self) -> Result<()> {
        ensure!(
            self.start < self.end,
            Error::NotFound(format!("empty blob range {}..{}", self.start, self.end))
        );
        Ok(())
    }
}

pub struct Blobs {
    db: Weak<Database>,
    ctx: DbContext,
    feed: RwLock<Option<Arc<dyn BlobFeed>>>,
    // Serializes lazy setup
    setup_lock: tokio::sync::Mutex<()>,
    retry: Mutex<Option<TaskHandle>>,
}

impl Blobs {
    pub(crate) fn new(db: Weak<Database>, ctx: DbContext) -> Self {
        Self {
            db,
            ctx,
            feed: RwLock::new(None),
            setup_lock: tokio::sync::Mutex::new(()),
            retry: Mutex::new(None),
        }
    }

    fn database(&self) -> Result<Arc<Database>> {
        self.db
            .upgrade()
            .ok_or_else(|| Error::Configuration("Database has been dropped".to_owned()))
    }

    fn read_timeout(&self) -> Duration {
        *self.ctx.config.read_timeout
    }

    pub fn is_ready(&self) -> bool {
        self.feed.read().is_some()
    }

    pub fn feed_key(&self) -> Option<DbKey> {
        self.feed.read().as_ref().map(|feed| feed.key())
    }

    pub fn is_retrying(&self) -> bool {
        self.retry.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// The blob feed, opening or creating it on first use
    pub async fn setup(&self) -> Result<Arc<dyn BlobFeed>> {
        let db = self.database()?;
        db.touch().await?;
        if let Some(feed) = self.feed.read().clone() {
            return Ok(feed);
        }
        let _guard = self.setup_lock.lock().await;
        if let Some(feed) = self.feed.read().clone() {
            return Ok(feed);
        }

        if let Some(feed) = self.open_from_desc(&db).await? {
            return Ok(feed);
        }

        if db.writable() {
            let feed = self.ctx.backend.open_feed(None).await?;
            let key = feed.key();
            let desc = db.update_desc(|desc| desc.with_blobs_feed_key(&key)).await?;
            if desc.blobs_feed_key() == Some(key) {
                log::info!("Created blob feed {key} for database {}", db.require_id()?);
                *self.feed.write() = Some(Arc::clone(&feed));
                return Ok(feed);
            }
            // Lost a race against another writer of the description
            feed.close().await?;
            return self.open_from_desc(&db).await?.ok_or(Error::BlobFeedUnavailable);
        }

        if db.reload_desc().await? {
            if let Some(feed) = self.open_from_desc(&db).await? {
                return Ok(feed);
            }
        } else {
            self.start_retry(&db);
        }
        Err(Error::BlobFeedUnavailable)
    }

    async fn open_from_desc(&self, db: &Database) -> Result<Option<Arc<dyn BlobFeed>>> {
        let Some(key) = db.desc().blobs_feed_key() else {
            return Ok(None);
        };
        let feed = self.ctx.backend.open_feed(Some(key)).await?;
        *self.feed.write() = Some(Arc::clone(&feed));
        log::debug!("Opened blob feed {key}");
        Ok(Some(feed))
    }

    fn start_retry(&self, db: &Database) {
        let mut retry = self.retry.lock();
        if retry.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let id = db.id().map(|id| id.to_string()).unwrap_or_default();
        log::debug!("Description of {id} not available, retrying blob setup in the background");
        let weak = self.db.clone();
        let mut backoff = Backoff::new(
            *self.ctx.config.blob_setup_retry_interval,
            *self.ctx.config.blob_setup_retry_max_interval,
        );
        let task = spawn_cancellable(
            &format!("blob-setup-retry-{id}"),
            CancellationToken::new(),
            async move {
                loop {
                    tokio::time::sleep(backoff.next_delay()).await;
                    let Some(db) = weak.upgrade() else {
                        break;
                    };
                    match db.blobs().retry_setup(&db).await {
                        Ok(true) => break,
                        Ok(false) => log::debug!("Blob feed of {id} still unavailable"),
                        Err(e) => log::debug!("Blob setup retry for {id} failed: {e}"),
                    }
                }
            },
        );
        *retry = Some(task);
    }

    async fn retry_setup(&self, db: &Database) -> Result<bool> {
        if !db.reload_desc().await? {
            return Ok(false);
        }
        let _guard = self.setup_lock.lock().await;
        if self.is_ready() {
            return Ok(true);
        }
        Ok(self.open_from_desc(db).await?.is_some())
    }

    /// Store `bytes`, returning the chunk range they occupy. Empty input still takes one chunk.
    pub async fn put(&self, bytes: &[u8]) -> Result<BlobPointer> {
        let feed = self.setup().await?;
        let chunk_size = std::cmp::max(*self.ctx.config.blob_chunk_size, 1);
        let chunks: Vec<Data> = if bytes.is_empty() {
            vec![Vec::new()]
        } else {
            bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect()
        };
        let count = chunks.len() as u64;
        let start = feed.append(chunks).await?;
        Ok(BlobPointer {
            start,
            end: start + count,
            mime_type: None,
        })
    }

    pub async fn get(&self, pointer: &BlobPointer) -> Result<Vec<u8>> {
        pointer.check()?;
        let feed = self.setup().await?;
        let mut out = Vec::new();
        for index in pointer.chunks() {
            out.extend(read_chunk(Arc::clone(&feed), index, self.read_timeout()).await?);
        }
        Ok(out)
    }

    pub async fn create_read_stream(
        &self,
        pointer: &BlobPointer,
    ) -> Result<BoxStream<'static, Result<Data>>> {
        pointer.check()?;
        let feed = self.setup().await?;
        let timeout = self.read_timeout();
        Ok(stream::iter(pointer.chunks())
            .then(move |index| read_chunk(Arc::clone(&feed), index, timeout))
            .boxed())
    }

    /// Whether the whole blob is available without fetching from peers
    pub async fn is_cached(&self, pointer: &BlobPointer) -> Result<bool> {
        pointer.check()?;
        let feed = self.setup().await?;
        Ok(pointer.chunks().all(|index| feed.has(index)))
    }

    /// Fetch the blob in the background. Failures are only logged.
    pub async fn download(&self, pointer: &BlobPointer) {
        let feed = match self.setup().await {
            Ok(feed) => feed,
            Err(e) => {
                log::debug!("Not downloading blob {pointer:?}: {e}");
                return;
            }
        };
        let range = pointer.chunks();
        tokio_spawn(
            async move {
                if let Err(e) = feed.download(range.clone()).await {
                    log::debug!("Failed to download blob chunks {range:?}: {e}");
                }
            },
            "blob-download",
        );
    }

    /// Drop the local copy of the blob. Failures are only logged.
    pub async fn decache(&self, pointer: &BlobPointer) {
        let res = match self.setup().await {
            Ok(feed) => feed.clear(pointer.chunks()).await.map_err(Error::from),
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            log::debug!("Failed to decache blob {pointer:?}: {e}");
        }
    }

    pub(crate) async fn teardown(&self) {
        if let Some(retry) = self.retry.lock().take() {
            retry.cancel();
        }
        let feed = self.feed.write().take();
        if let Some(feed) = feed {
            if let Err(e) = feed.close().await {
                log::debug!("Failed to close blob feed {}: {e}", feed.key());
            }
        }
    }
}

async fn read_chunk(feed: Arc<dyn BlobFeed>, index: u64, timeout: Duration) -> Result<Data> {
    Ok(tokio::time::timeout(timeout, feed.get(index)).await??)
}

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

//! Paginated reads that remember where they stopped

use std::sync::Arc;

use futures::{
    stream::{self, BoxStream},
    StreamExt,
};

use super::{
    records::{key_to_string, DbPath, ListOptions, Record},
    Database,
};
use crate::{schema::TableId, Result};

const STREAM_PAGE_SIZE: usize = 100;

/// Reads a range page by page. Each page is a bounded scan starting just after the last key
/// seen; the cursor is exhausted once a scan comes back empty.
pub struct ReadCursor {
    db: Arc<Database>,
    parent: DbPath,
    opts: ListOptions,
    // Records of a table are checked against its schema
    table: Option<TableId>,
    last_seen_key_exclusive: Option<String>,
    at_end: bool,
}

impl ReadCursor {
    pub(crate) fn new(
        db: Arc<Database>,
        parent: DbPath,
        opts: ListOptions,
        table: Option<TableId>,
    ) -> Self {
        Self {
            db,
            parent,
            opts,
            table,
            last_seen_key_exclusive: None,
            at_end: false,
        }
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    pub fn last_seen_key(&self) -> Option<&str> {
        self.last_seen_key_exclusive.as_deref()
    }

    /// The next page of at most `limit` entries (default: the limit the cursor was created
    /// with), or `None` once exhausted. Entries dropped by validation count towards the limit,
    /// so a page can be empty without the cursor being exhausted.
    pub async fn next(&mut self, limit: Option<usize>) -> Result<Option<Vec<Record>>> {
        Ok(self.fetch(limit).await?.map(|(_, records)| records))
    }

    async fn fetch(&mut self, limit: Option<usize>) -> Result<Option<(usize, Vec<Record>)>> {
        if self.at_end {
            return Ok(None);
        }
        let mut opts = self.opts.clone();
        opts.limit = limit.or(self.opts.limit);
        if let Some(last) = &self.last_seen_key_exclusive {
            if opts.reverse {
                opts.lt = Some(last.clone());
                opts.lte = None;
            } else {
                opts.gt = Some(last.clone());
                opts.gte = None;
            }
        }

        let entries = self.db.scan_entries(&self.parent.sub(), &opts).await?;
        let Some(last) = entries.last() else {
            self.at_end = true;
            return Ok(None);
        };
        self.last_seen_key_exclusive = Some(key_to_string(&last.key)?);
        let count = entries.len();
        let records = self.db.decode_entries(&self.parent, self.table.as_ref(), &opts, entries);
        Ok(Some((count, records)))
    }

    /// All remaining records as a stream, honouring the overall limit of the cursor
    pub fn into_stream(self) -> BoxStream<'static, Result<Record>> {
        let remaining = self.opts.limit;
        stream::unfold(Some((self, remaining)), |state| async move {
            let (mut cursor, remaining) = state?;
            let page_size = remaining.map_or(STREAM_PAGE_SIZE, |r| r.min(STREAM_PAGE_SIZE));
            if page_size == 0 {
                return None;
            }
            match cursor.fetch(Some(page_size)).await {
                Ok(Some((count, records))) => {
                    let remaining = remaining.map(|r| r.saturating_sub(count));
                    Some((Ok(records), Some((cursor, remaining))))
                }
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .flat_map(|page| match page {
            Ok(records) => stream::iter(records.into_iter().map(Ok).collect::<Vec<_>>()),
            Err(e) => stream::iter(vec![Err(e)]),
        })
        .boxed()
    }
}

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

//! Records, paths and scan options

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage_core::{Entry, KeyRange, Sub};

use crate::{DbId, Error, Result};

/// A stored value together with where it lives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub key: String,
    pub seq: u64,
    /// `/`-joined path of the record inside its database
    pub path: String,
    pub url: String,
    pub value: Value,
}

/// Where a written record lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordLocation {
    pub key: String,
    pub path: String,
    pub url: String,
}

/// A change to one record between two versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diff {
    pub left: Option<Record>,
    pub right: Option<Record>,
}

/// One item of a shallow listing: a record, or a container of deeper records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShallowEntry {
    pub key: String,
    pub path: String,
    pub seq: Option<u64>,
    pub has_children: bool,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub reverse: bool,
    pub limit: Option<usize>,
    /// Read deadline in milliseconds
    pub timeout: Option<u64>,
    /// Drop entries that fail schema validation
    pub validate: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            reverse: false,
            limit: None,
            timeout: None,
            validate: true,
        }
    }
}

impl ListOptions {
    pub fn key_range(&self) -> KeyRange {
        let conv = |s: &Option<String>| s.as_ref().map(|s| s.as_bytes().to_vec());
        KeyRange {
            gt: conv(&self.gt),
            gte: conv(&self.gte),
            lt: conv(&self.lt),
            lte: conv(&self.lte),
            reverse: self.reverse,
            limit: self.limit,
        }
    }

    pub fn read_timeout(&self, default: Duration) -> Duration {
        self.timeout.map_or(default, Duration::from_millis)
    }
}

/// A parsed `/`-separated path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> =
            path.split('/').filter(|s| !s.is_empty()).map(str::to_owned).collect();
        utils::ensure!(
            segments.iter().all(|s| !s.contains('\0')),
            Error::InvalidPath(path.to_owned())
        );
        Ok(Self { segments })
    }

    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            segments: segments.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The containing path; the root is its own parent
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Self { segments }
    }

    /// The namespace holding everything below this path
    pub fn sub(&self) -> Sub {
        Sub::new(self.segments.iter().map(String::as_str))
    }

    /// Namespace and key of the record at this path
    pub fn split_key(&self) -> Result<(Sub, &str)> {
        let (key, parent) = self
            .segments
            .split_last()
            .ok_or_else(|| Error::InvalidPath("/".to_owned()))?;
        Ok((Sub::new(parent.iter().map(String::as_str)), key))
    }
}

impl std::fmt::Display for DbPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

pub fn record_url(db_id: Option<&DbId>, path: &str) -> String {
    match db_id {
        Some(id) => format!("hyper://{id}{path}"),
        None => path.to_owned(),
    }
}

pub fn key_to_string(key: &[u8]) -> Result<String> {
    String::from_utf8(key.to_vec())
        .map_err(|_| storage_core::Error::Encoding("key is not valid UTF-8".to_owned()).into())
}

/// Decode an entry whose key is relative to the container at `parent`
pub fn decode_entry(db_id: Option<&DbId>, parent: &DbPath, entry: Entry) -> Result<Record> {
    let key = key_to_string(&entry.key)?;
    let path = parent.join(&key).to_string();
    let value = serde_json::from_slice(&entry.value)?;
    Ok(Record {
        url: record_url(db_id, &path),
        key,
        seq: entry.seq,
        path,
        value,
    })
}

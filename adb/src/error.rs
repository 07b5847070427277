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

use crate::schema::{SchemaError, ValidationError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Not authorized: {0}")]
    Permissions(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Read timed out")]
    Timeout,
    #[error("Timed out waiting for lock {0}")]
    LockTimeout(String),
    #[error("Storage error: {0}")]
    Storage(#[from] storage_core::Error),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Blob feed is not available yet")]
    BlobFeedUnavailable,
    #[error("Invalid database id: {0}")]
    InvalidDbId(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid table id: {0}")]
    InvalidTableId(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}

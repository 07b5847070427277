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

//! Multi-tenant replicated table and blob store.
//!
//! A [router::DbManager] manages many independent databases, each an ordered key-value store
//! partitioned into schema-checked [table::Table]s plus a chunked [blobs::Blobs] feed. Databases
//! are loaded lazily, evicted when idle and, unless private, announced to the replication
//! network. Ownership and per-service access grants of every database are kept in a reserved
//! private database, the [registry::PrivateRegistry], and checked by the [policy] rules.

pub mod blobs;
pub mod config;
pub mod database;
pub mod error;
pub mod lock_manager;
pub mod policy;
pub mod primitives;
pub mod registry;
pub mod router;
pub mod schema;
pub mod table;

pub use config::{AdbConfig, ProcessConfig};
pub use database::{set::Databases, Database};
pub use error::Error;
pub use primitives::{AccessMode, DbId, Principal};
pub use registry::{DbAdminConfig, DbConfig, DbInfo, PrivateRegistry};
pub use router::DbManager;
pub use table::Table;

pub type Result<T> = std::result::Result<T, Error>;

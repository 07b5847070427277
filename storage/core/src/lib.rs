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

//! The ordered key-value store interface consumed by the database core.
//!
//! A backend provides two kinds of replicated structures, both addressed by a public key:
//!
//! * [OrderedStore]: an append-only log presented as an ordered key-value map with point
//!   reads/writes, ordered range scans and version diffs,
//! * [BlobFeed]: an append-only sequence of binary chunks.
//!
//! Whether a structure is visible to the replication network is toggled through
//! [Backend::configure_network]. Byte-range sub-namespacing on top of a store is provided by
//! [Sub].

pub mod backend;
pub mod error;
pub mod key;
pub mod range;
pub mod sub;
pub mod util;

// Re-export some commonly used items
pub use backend::{Backend, BlobFeed, NetworkMode, OrderedStore};
pub use error::Error;
pub use key::{DbKey, DiscoveryKey, KeyParseError};
pub use range::{Entry, KeyRange, StoreDiff};
pub use sub::Sub;

/// Raw byte sequences, used to represent store keys and values
pub type Data = Vec<u8>;

/// A `Result` type specialized for storage
pub type Result<T> = std::result::Result<T, Error>;

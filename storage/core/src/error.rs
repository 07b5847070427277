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

//! Storage errors

/// Errors reported by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Store handle has been closed")]
    Closed,
    #[error("Store is not writable by this replica")]
    ReadOnly,
    #[error("Block {0} is not available locally or from any peer")]
    BlockNotAvailable(u64),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

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

//! Wrappers for tokio task-launching functions that also accept a task name, so that background
//! work can be told apart in the logs.

use std::future::Future;

use logging::log;
use tokio::task::JoinHandle;

#[track_caller]
pub fn tokio_spawn<Fut>(future: Fut, task_name: &str) -> JoinHandle<Fut::Output>
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    log::trace!("Spawning task '{task_name}'");
    tokio::spawn(future)
}

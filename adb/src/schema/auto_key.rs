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

//! Generated record keys that sort in creation order

use std::sync::atomic::{AtomicU64, Ordering};

static LAST_KEY_MICROS: AtomicU64 = AtomicU64::new(0);

/// Width of a generated key, enough for any `u64`
const KEY_WIDTH: usize = 13;

/// A new key, strictly greater (both numerically and lexicographically) than every key
/// previously generated by this process.
pub fn next_auto_key() -> String {
    let now = chrono::Utc::now().timestamp_micros().max(0) as u64;
    let prev = LAST_KEY_MICROS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(std::cmp::max(now, last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    let micros = std::cmp::max(now, prev.saturating_add(1));
    format!("{:0>width$}", to_base36(micros), width = KEY_WIDTH)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

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

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use utils::time_getter::TimeGetter;

/// Time getter driven by a shared counter of seconds
pub fn mocked_time_getter_seconds(seconds: Arc<AtomicU64>) -> TimeGetter {
    TimeGetter::new(Arc::new(move || {
        Duration::from_secs(seconds.load(Ordering::SeqCst))
    }))
}

/// Time getter driven by a shared counter of milliseconds
pub fn mocked_time_getter_milliseconds(milliseconds: Arc<AtomicU64>) -> TimeGetter {
    TimeGetter::new(Arc::new(move || {
        Duration::from_millis(milliseconds.load(Ordering::SeqCst))
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mocked_time_getter_seconds() {
        let seconds = Arc::new(AtomicU64::new(12345));
        let time_getter = mocked_time_getter_seconds(Arc::clone(&seconds));
        let time = time_getter.get_time();
        seconds.fetch_add(123, Ordering::SeqCst);
        assert_eq!(time_getter.get_time() - time, Duration::from_secs(123));
    }

    #[test]
    fn test_mocked_time_getter_milliseconds() {
        let milliseconds = Arc::new(AtomicU64::new(12345));
        let time_getter = mocked_time_getter_milliseconds(Arc::clone(&milliseconds));
        let time = time_getter.get_time();
        milliseconds.fetch_add(123, Ordering::SeqCst);
        assert_eq!(time_getter.get_time() - time, Duration::from_millis(123));
    }
}

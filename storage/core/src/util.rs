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

//! Utilities for implementing storage backends

use crate::Data;

/// If your map/set has Vec<T> as the key and you need to call `range` on it, you'll want to pass
/// slices for the bounds instead of allocating temporary vectors. However, something like
/// ```ignore
/// my_map.range(my_slice..);
/// ```
/// won't compile because trait bounds on `range` require that the passed range's generic parameter
/// implements `Borrow<&[T]>`, but `Vec<T>` only implements `Borrow<[T]>`.
/// `SliceRange` can be used as a workaround for this.
pub struct SliceRange<'a, T> {
    pub start: std::ops::Bound<&'a [T]>,
    pub end: std::ops::Bound<&'a [T]>,
}

impl<T> std::ops::RangeBounds<[T]> for SliceRange<'_, T> {
    fn start_bound(&self) -> std::ops::Bound<&[T]> {
        self.start
    }

    fn end_bound(&self) -> std::ops::Bound<&[T]> {
        self.end
    }
}

/// The smallest key greater than every key starting with `prefix`.
///
/// Returns `None` if there is no such key (empty prefix or all bytes `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Data> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"", None)]
    #[case(b"a\0", Some(b"a\x01".to_vec()))]
    #[case(b"a\xff", Some(b"b".to_vec()))]
    #[case(b"\xff\xff", None)]
    fn prefix_end_cases(#[case] prefix: &[u8], #[case] expected: Option<Data>) {
        assert_eq!(prefix_end(prefix), expected);
    }
}

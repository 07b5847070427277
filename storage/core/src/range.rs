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

//! Key ranges and the entries produced by scanning them

use std::ops::Bound;

use crate::{util::SliceRange, Data};

/// Ordered scan bounds. When both an exclusive and an inclusive bound are set on the same
/// side, the exclusive one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub gt: Option<Data>,
    pub gte: Option<Data>,
    pub lt: Option<Data>,
    pub lte: Option<Data>,
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl KeyRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }

    pub fn lower_bound(&self) -> Bound<&[u8]> {
        match (&self.gt, &self.gte) {
            (Some(gt), _) => Bound::Excluded(gt.as_slice()),
            (None, Some(gte)) => Bound::Included(gte.as_slice()),
            (None, None) => Bound::Unbounded,
        }
    }

    pub fn upper_bound(&self) -> Bound<&[u8]> {
        match (&self.lt, &self.lte) {
            (Some(lt), _) => Bound::Excluded(lt.as_slice()),
            (None, Some(lte)) => Bound::Included(lte.as_slice()),
            (None, None) => Bound::Unbounded,
        }
    }

    /// Bounds usable with `BTreeMap::range` over `Data` keys. Returns `None` if the range is
    /// empty, since `BTreeMap::range` panics on inverted bounds.
    pub fn as_slice_range(&self) -> Option<SliceRange<'_, u8>> {
        let start = self.lower_bound();
        let end = self.upper_bound();
        let non_empty = match (start, end) {
            (Bound::Included(s), Bound::Included(e)) => s <= e,
            (Bound::Included(s), Bound::Excluded(e))
            | (Bound::Excluded(s), Bound::Included(e)) => s < e,
            (Bound::Excluded(s), Bound::Excluded(e)) => s < e,
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        };
        non_empty.then_some(SliceRange { start, end })
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let above = match self.lower_bound() {
            Bound::Included(b) => key >= b,
            Bound::Excluded(b) => key > b,
            Bound::Unbounded => true,
        };
        let below = match self.upper_bound() {
            Bound::Included(b) => key <= b,
            Bound::Excluded(b) => key < b,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// A key-value pair together with the sequence number of the write that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub seq: u64,
    pub key: Data,
    pub value: Data,
}

/// A change to one key between two versions of a store.
///
/// `left` is the entry at the older version, `right` the entry now. An insert has no `left`,
/// a deletion has no `right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDiff {
    pub left: Option<Entry>,
    pub right: Option<Entry>,
}

impl StoreDiff {
    pub fn key(&self) -> Option<&[u8]> {
        self.right.as_ref().or(self.left.as_ref()).map(|e| e.key.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn range(gt: Option<&str>, gte: Option<&str>, lt: Option<&str>, lte: Option<&str>) -> KeyRange {
        let conv = |s: Option<&str>| s.map(|s| s.as_bytes().to_vec());
        KeyRange {
            gt: conv(gt),
            gte: conv(gte),
            lt: conv(lt),
            lte: conv(lte),
            ..KeyRange::default()
        }
    }

    #[rstest]
    #[case(range(None, None, None, None), "anything", true)]
    #[case(range(Some("b"), None, None, None), "b", false)]
    #[case(range(None, Some("b"), None, None), "b", true)]
    #[case(range(None, None, Some("b"), None), "b", false)]
    #[case(range(None, None, None, Some("b")), "b", true)]
    #[case(range(Some("b"), Some("a"), None, None), "b", false)]
    #[case(range(None, Some("a"), Some("c"), None), "bzz", true)]
    #[case(range(None, Some("a"), Some("c"), None), "c", false)]
    fn contains(#[case] range: KeyRange, #[case] key: &str, #[case] expected: bool) {
        assert_eq!(range.contains(key.as_bytes()), expected);
    }

    #[rstest]
    #[case(range(Some("b"), None, Some("b"), None), false)]
    #[case(range(None, Some("b"), None, Some("b")), true)]
    #[case(range(None, Some("c"), None, Some("b")), false)]
    #[case(range(None, Some("a"), None, None), true)]
    fn empty_ranges_have_no_slice_range(#[case] range: KeyRange, #[case] non_empty: bool) {
        assert_eq!(range.as_slice_range().is_some(), non_empty);
    }

    #[test]
    fn diff_key() {
        let entry = Entry {
            seq: 1,
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        };
        let deletion = StoreDiff {
            left: Some(entry.clone()),
            right: None,
        };
        assert_eq!(deletion.key(), Some(&b"k"[..]));
        let empty = StoreDiff {
            left: None,
            right: None,
        };
        assert_eq!(empty.key(), None);
    }
}

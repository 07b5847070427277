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

//! Sub-namespaces of an ordered store.
//!
//! A sub-namespace is a key prefix built from path segments, each followed by a `0x00`
//! separator. Segment `a` then `b` gives the prefix `a\0b\0`, so key `k` inside it is stored as
//! `a\0b\0k`. Keys are passed and returned relative to the prefix.

use std::ops::Bound;

use crate::{util::prefix_end, Data, Entry, KeyRange, OrderedStore, Result};

pub const SEPARATOR: u8 = 0x00;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sub {
    prefix: Data,
}

impl Sub {
    /// The whole store
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        segments.into_iter().fold(Self::root(), |sub, seg| sub.sub(seg))
    }

    pub fn sub(&self, segment: &str) -> Self {
        let mut prefix = self.prefix.clone();
        prefix.extend_from_slice(segment.as_bytes());
        prefix.push(SEPARATOR);
        Self { prefix }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn key(&self, relative: &[u8]) -> Data {
        let mut key = self.prefix.clone();
        key.extend_from_slice(relative);
        key
    }

    /// Strip the prefix from an absolute key, if the key belongs to this sub-namespace.
    pub fn strip<'k>(&self, absolute: &'k [u8]) -> Option<&'k [u8]> {
        absolute.strip_prefix(self.prefix.as_slice())
    }

    pub fn contains(&self, absolute: &[u8]) -> bool {
        absolute.starts_with(&self.prefix)
    }

    /// Convert a range of relative keys into the equivalent range of absolute keys, confined
    /// to this sub-namespace.
    pub fn absolute_range(&self, range: &KeyRange) -> KeyRange {
        let (gt, gte) = match range.lower_bound() {
            Bound::Excluded(k) => (Some(self.key(k)), None),
            Bound::Included(k) => (None, Some(self.key(k))),
            Bound::Unbounded => (None, (!self.prefix.is_empty()).then(|| self.prefix.clone())),
        };
        let (lt, lte) = match range.upper_bound() {
            Bound::Excluded(k) => (Some(self.key(k)), None),
            Bound::Included(k) => (None, Some(self.key(k))),
            Bound::Unbounded => (prefix_end(&self.prefix), None),
        };
        KeyRange {
            gt,
            gte,
            lt,
            lte,
            reverse: range.reverse,
            limit: range.limit,
        }
    }

    fn relative_entry(&self, entry: Entry) -> Option<Entry> {
        let key = self.strip(&entry.key)?.to_vec();
        Some(Entry { key, ..entry })
    }

    pub async fn get(&self, store: &dyn OrderedStore, key: &[u8]) -> Result<Option<Entry>> {
        let entry = store.get(&self.key(key)).await?;
        Ok(entry.and_then(|e| self.relative_entry(e)))
    }

    pub async fn put(&self, store: &dyn OrderedStore, key: &[u8], value: Data) -> Result<()> {
        store.put(&self.key(key), value).await
    }

    pub async fn del(&self, store: &dyn OrderedStore, key: &[u8]) -> Result<()> {
        store.del(&self.key(key)).await
    }

    pub async fn range(&self, store: &dyn OrderedStore, range: &KeyRange) -> Result<Vec<Entry>> {
        let entries = store.range(self.absolute_range(range)).await?;
        Ok(entries.into_iter().filter_map(|e| self.relative_entry(e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_layout() {
        let sub = Sub::new(["a", "b"]);
        assert_eq!(sub.prefix(), b"a\0b\0");
        assert_eq!(sub.key(b"k"), b"a\0b\0k".to_vec());
        assert_eq!(sub.strip(b"a\0b\0k"), Some(&b"k"[..]));
        assert_eq!(sub.strip(b"a\0c\0k"), None);
        assert_eq!(Sub::new(["a"]).sub("b"), sub);
    }

    #[test]
    fn unbounded_range_covers_exactly_the_prefix() {
        let sub = Sub::new(["t"]);
        let abs = sub.absolute_range(&KeyRange::all());
        assert_eq!(abs.gte, Some(b"t\0".to_vec()));
        assert_eq!(abs.lt, Some(b"t\x01".to_vec()));
        assert!(abs.contains(b"t\0"));
        assert!(abs.contains(b"t\0\xff\xff"));
        assert!(!abs.contains(b"t"));
        assert!(!abs.contains(b"t\x01"));
        assert!(!abs.contains(b"u\0"));
    }

    #[test]
    fn relative_bounds_are_translated() {
        let sub = Sub::new(["t"]);
        let rel = KeyRange {
            gt: Some(b"b".to_vec()),
            lte: Some(b"d".to_vec()),
            reverse: true,
            limit: Some(2),
            ..KeyRange::default()
        };
        let abs = sub.absolute_range(&rel);
        assert_eq!(abs.gt, Some(b"t\0b".to_vec()));
        assert_eq!(abs.gte, None);
        assert_eq!(abs.lte, Some(b"t\0d".to_vec()));
        assert_eq!(abs.lt, None);
        assert!(abs.reverse);
        assert_eq!(abs.limit, Some(2));
    }

    #[test]
    fn root_range_is_unbounded() {
        let abs = Sub::root().absolute_range(&KeyRange::all());
        assert_eq!(abs, KeyRange::all());
    }
}

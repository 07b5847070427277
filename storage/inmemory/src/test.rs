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

use rstest::rstest;
use test_utils::random::{make_seedable_rng, Rng, Seed};

use super::*;

fn range(gte: &str, lt: &str) -> KeyRange {
    KeyRange {
        gte: Some(gte.as_bytes().to_vec()),
        lt: Some(lt.as_bytes().to_vec()),
        ..KeyRange::default()
    }
}

fn keys(entries: &[Entry]) -> Vec<&[u8]> {
    entries.iter().map(|e| e.key.as_slice()).collect()
}

#[tokio::test]
async fn put_get_del() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    assert!(store.writable());
    assert_eq!(store.version(), 0);

    store.put(b"hello", b"world".to_vec()).await.unwrap();
    let entry = store.get(b"hello").await.unwrap().unwrap();
    assert_eq!(entry.value, b"world");
    assert_eq!(entry.seq, 1);
    assert_eq!(store.version(), 1);

    store.del(b"hello").await.unwrap();
    assert_eq!(store.get(b"hello").await.unwrap(), None);
    assert_eq!(store.version(), 2);
}

#[tokio::test]
async fn range_scans() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    for k in ["a", "b", "c", "d", "e"] {
        store.put(k.as_bytes(), k.as_bytes().to_vec()).await.unwrap();
    }

    let all = store.range(KeyRange::all()).await.unwrap();
    assert_eq!(keys(&all), vec![b"a", b"b", b"c", b"d", b"e"]);

    let mid = store.range(range("b", "d")).await.unwrap();
    assert_eq!(keys(&mid), vec![b"b", b"c"]);

    let rev = store.range(KeyRange::all().reversed().with_limit(2)).await.unwrap();
    assert_eq!(keys(&rev), vec![b"e", b"d"]);

    let gt = KeyRange {
        gt: Some(b"d".to_vec()),
        ..KeyRange::default()
    };
    assert_eq!(keys(&store.range(gt).await.unwrap()), vec![b"e"]);

    let empty = store.range(range("d", "b")).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn diff_since_version() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    store.put(b"keep", b"1".to_vec()).await.unwrap();
    store.put(b"change", b"1".to_vec()).await.unwrap();
    store.put(b"remove", b"1".to_vec()).await.unwrap();
    let since = store.version();

    store.put(b"change", b"2".to_vec()).await.unwrap();
    store.del(b"remove").await.unwrap();
    store.put(b"add", b"1".to_vec()).await.unwrap();

    let diff = store.diff(since).await.unwrap();
    let summary: Vec<_> = diff
        .iter()
        .map(|d| {
            (
                d.key().unwrap().to_vec(),
                d.left.as_ref().map(|e| e.value.clone()),
                d.right.as_ref().map(|e| e.value.clone()),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (b"add".to_vec(), None, Some(b"1".to_vec())),
            (b"change".to_vec(), Some(b"1".to_vec()), Some(b"2".to_vec())),
            (b"remove".to_vec(), Some(b"1".to_vec()), None),
        ]
    );
    assert!(store.diff(store.version()).await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_store_replicates_read_only() {
    let backend = InMemoryBackend::new();
    let remote = backend.seed_remote_store();
    let replica = backend.open_store(Some(remote.key())).await.unwrap();
    assert!(!replica.writable());

    let mut notifications = replica.subscribe();
    remote.put(b"k", b"v".to_vec()).await.unwrap();
    assert_eq!(notifications.recv().await.unwrap(), 1);
    assert_eq!(replica.get(b"k").await.unwrap().unwrap().value, b"v");
    assert_eq!(replica.put(b"k", b"x".to_vec()).await, Err(Error::ReadOnly));
}

#[tokio::test]
async fn closed_handles_fail() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    let key = store.key();
    store.close().await.unwrap();
    assert_eq!(store.get(b"k").await, Err(Error::Closed));

    // Reopening gives a fresh, usable handle with the same data and ownership
    let reopened = backend.open_store(Some(key)).await.unwrap();
    assert!(reopened.writable());
    reopened.put(b"k", b"v".to_vec()).await.unwrap();
}

#[tokio::test]
async fn failing_writes_and_open_handles() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    let other = backend.open_store(None).await.unwrap();
    assert_eq!(backend.open_store_handles(), 2);

    backend.set_failing_writes(true);
    assert!(matches!(store.put(b"k", b"v".to_vec()).await, Err(Error::Unavailable(_))));
    assert_eq!(store.get(b"k").await, Ok(None));
    backend.set_failing_writes(false);
    store.put(b"k", b"v".to_vec()).await.unwrap();

    store.close().await.unwrap();
    store.close().await.unwrap();
    assert_eq!(backend.open_store_handles(), 1);
    other.close().await.unwrap();
    assert_eq!(backend.open_store_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn read_latency() {
    let backend = InMemoryBackend::new().with_read_latency(Duration::from_secs(20));
    let store = backend.open_store(None).await.unwrap();
    let res = tokio::time::timeout(Duration::from_secs(10), store.get(b"k")).await;
    assert!(res.is_err());

    backend.set_read_latency(Duration::ZERO);
    assert_eq!(store.get(b"k").await, Ok(None));
}

#[tokio::test]
async fn network_modes_are_recorded() {
    let backend = InMemoryBackend::new();
    let store = backend.open_store(None).await.unwrap();
    let dkey = store.discovery_key();
    assert_eq!(backend.network_mode(&dkey), None);
    backend.configure_network(dkey, NetworkMode::SWARM).await.unwrap();
    assert!(backend.is_announced(&dkey));
    backend.configure_network(dkey, NetworkMode::OFF).await.unwrap();
    assert!(!backend.is_announced(&dkey));
}

#[rstest]
#[trace]
#[case(Seed::from_entropy())]
#[tokio::test]
async fn feed_append_and_cache(#[case] seed: Seed) {
    let mut rng = make_seedable_rng(seed);
    let backend = InMemoryBackend::new();
    let feed = backend.open_feed(None).await.unwrap();
    assert!(feed.writable());

    let chunks: Vec<Data> = (0..rng.gen_range(1..10))
        .map(|_| (0..rng.gen_range(0..100)).map(|_| rng.gen()).collect())
        .collect();
    let count = chunks.len() as u64;
    assert_eq!(feed.append(chunks.clone()).await.unwrap(), 0);
    assert_eq!(feed.append(vec![vec![1]]).await.unwrap(), count);
    assert_eq!(feed.len(), count + 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert!(feed.has(i as u64));
        assert_eq!(&feed.get(i as u64).await.unwrap(), chunk);
    }
    assert_eq!(feed.get(count + 1).await, Err(Error::BlockNotAvailable(count + 1)));

    feed.clear(0..count).await.unwrap();
    assert!(!feed.has(0));
    assert!(feed.has(count));
    feed.download(0..count).await.unwrap();
    assert!(feed.has(0));
}

#[tokio::test]
async fn remote_feed_is_not_cached_locally() {
    let backend = InMemoryBackend::new();
    let remote = backend.seed_remote_feed();
    remote.append(vec![b"a".to_vec(), b"b".to_vec()]).await.unwrap();

    let replica = backend.open_feed(Some(remote.key())).await.unwrap();
    assert!(!replica.writable());
    assert_eq!(replica.len(), 2);
    assert!(!replica.has(0));
    assert_eq!(replica.get(0).await.unwrap(), b"a");
    assert!(replica.has(0));
    assert!(!replica.has(1));

    backend.set_offline(true);
    assert!(matches!(replica.download(1..2).await, Err(Error::Unavailable(_))));
    backend.set_offline(false);
    replica.download(1..2).await.unwrap();
    assert!(replica.has(1));
}

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

mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use adb::{
    database::{records::ListOptions, DbKind, SetupOptions},
    AccessMode, AdbConfig, Database, DbConfig, Error,
};
use futures::StreamExt;
use serde_json::json;

use common::{alice, TestEnv};

#[tokio::test]
async fn path_records_put_list_del() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();

    db.put("/users/alice", &json!({"age": 30})).await.unwrap();
    let records = db.list("/users", &ListOptions::default()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "alice");
    assert_eq!(records[0].path, "/users/alice");
    assert_eq!(records[0].value, json!({"age": 30}));
    assert_eq!(records[0].url, format!("hyper://{}/users/alice", db.id().unwrap()));

    let record = db.get("/users/alice").await.unwrap().unwrap();
    assert_eq!(record.value, json!({"age": 30}));

    db.del("/users/alice").await.unwrap();
    assert!(db.list("/users", &ListOptions::default()).await.unwrap().is_empty());
    assert_eq!(db.get("/users/alice").await.unwrap(), None);
}

#[tokio::test]
async fn root_is_not_a_record() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    assert!(matches!(db.put("/", &json!(1)).await, Err(Error::InvalidPath(_))));
}

#[tokio::test]
async fn setup_requires_id_or_create() {
    let env = TestEnv::new().await;
    let db = Database::new(env.context(), None, AccessMode::Public, DbKind::Regular);
    assert!(matches!(
        db.setup(SetupOptions::default()).await,
        Err(Error::Configuration(_))
    ));
    assert!(!db.is_in_memory());
}

#[tokio::test]
async fn setup_and_teardown_are_idempotent() {
    let env = TestEnv::new().await;
    let stores = env.backend.store_count();
    let db = Database::new(env.context(), None, AccessMode::Public, DbKind::Regular);

    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    db.set_created_hook(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let (a, b) = tokio::join!(db.setup(SetupOptions::create()), db.setup(SetupOptions::create()));
    a.unwrap();
    b.unwrap();
    assert_eq!(env.backend.store_count(), stores + 1);
    assert_eq!(created.load(Ordering::SeqCst), 1);
    let id = db.id().unwrap();
    assert!(db.is_in_memory());
    assert!(db.writable());
    assert!(!db.desc().did_fail_load);

    db.teardown(false).await.unwrap();
    db.teardown(false).await.unwrap();
    assert!(!db.is_in_memory());

    db.touch().await.unwrap();
    assert!(db.is_in_memory());
    assert_eq!(db.id(), Some(id));
    assert_eq!(env.backend.store_count(), stores + 1);
}

#[tokio::test]
async fn teardown_with_unswarm() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    let dkey = db.discovery_key().unwrap();
    assert!(env.backend.is_announced(&dkey));

    db.teardown(false).await.unwrap();
    assert!(env.backend.is_announced(&dkey));
    db.touch().await.unwrap();
    db.teardown(true).await.unwrap();
    assert!(!env.backend.is_announced(&dkey));
}

#[tokio::test]
async fn private_databases_are_never_announced() {
    let env = TestEnv::new().await;
    let config = DbConfig {
        access: Some(AccessMode::Private),
        ..DbConfig::default()
    };
    let db = env.manager.create_db(&alice(), &config).await.unwrap();
    assert_eq!(env.backend.network_mode(&db.discovery_key().unwrap()), None);

    let registry = env.manager.registry().database();
    assert_eq!(env.backend.network_mode(&registry.discovery_key().unwrap()), None);
}

#[tokio::test]
async fn access_mode_changes_toggle_announcement() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    let id = db.id().unwrap();
    let dkey = db.discovery_key().unwrap();

    env.manager.registry().set_access(&alice(), id, AccessMode::Private).await.unwrap();
    assert_eq!(db.access_mode(), AccessMode::Private);
    assert!(!env.backend.is_announced(&dkey));

    env.manager.registry().set_access(&alice(), id, AccessMode::Public).await.unwrap();
    assert!(env.backend.is_announced(&dkey));
}

#[tokio::test]
async fn description_and_display_name() {
    let env = TestEnv::new().await;
    let config = DbConfig {
        display_name: Some("Notes".to_owned()),
        ..DbConfig::default()
    };
    let db = env.manager.create_db(&alice(), &config).await.unwrap();
    assert_eq!(db.display_name().as_deref(), Some("Notes"));

    db.set_display_name(Some("Journal".to_owned())).await.unwrap();
    db.teardown(false).await.unwrap();
    db.touch().await.unwrap();
    assert_eq!(db.display_name().as_deref(), Some("Journal"));

    let described = db.describe().await.unwrap();
    assert_eq!(described.db_id, db.id());
    assert_eq!(described.display_name.as_deref(), Some("Journal"));
    assert!(described.writable);
}

#[tokio::test]
async fn remote_database_without_description() {
    let env = TestEnv::new().await;
    let remote = env.backend.seed_remote_store();
    let db = env.manager.load_db(&alice(), remote.key().into()).await.unwrap();

    assert!(!db.writable());
    assert!(db.desc().did_fail_load);
    assert!(matches!(
        db.set_display_name(Some("x".to_owned())).await,
        Err(Error::Permissions(_))
    ));
    assert!(matches!(db.put("/a", &json!(1)).await, Err(Error::Storage(_))));

    remote
        .put(b"_adb\0desc", serde_json::to_vec(&json!({"displayName": "Remote"})).unwrap())
        .await
        .unwrap();
    assert!(db.reload_desc().await.unwrap());
    assert_eq!(db.display_name().as_deref(), Some("Remote"));
}

#[tokio::test]
async fn list_shallow_groups_containers() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    for path in ["/a/b/c", "/a/b/d", "/a/x", "/a/y/z/w", "/top"] {
        db.put(path, &json!(path)).await.unwrap();
    }

    let entries = db.list_shallow("/a").await.unwrap();
    let summary: Vec<_> = entries.iter().map(|e| (e.key.as_str(), e.has_children)).collect();
    assert_eq!(summary, vec![("b", true), ("x", false), ("y", true)]);
    assert_eq!(entries[0].path, "/a/b");
    assert_eq!(entries[1].value, Some(json!("/a/x")));
    assert!(entries[1].seq.is_some());
    assert_eq!(entries[2].value, None);

    assert!(db.list_shallow("/nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn cursor_pages_forward_and_backward() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    for i in 0..5 {
        db.put(&format!("/items/k{i}"), &json!(i)).await.unwrap();
    }
    let keys = |page: Vec<adb::database::records::Record>| -> Vec<String> {
        page.into_iter().map(|r| r.key).collect()
    };

    let mut cursor = db.cursor_read("/items", ListOptions::default()).unwrap();
    assert_eq!(keys(cursor.next(Some(2)).await.unwrap().unwrap()), ["k0", "k1"]);
    assert_eq!(cursor.last_seen_key(), Some("k1"));
    assert_eq!(keys(cursor.next(Some(2)).await.unwrap().unwrap()), ["k2", "k3"]);
    assert_eq!(keys(cursor.next(Some(2)).await.unwrap().unwrap()), ["k4"]);
    assert_eq!(cursor.next(Some(2)).await.unwrap(), None);
    assert!(cursor.at_end());
    assert_eq!(cursor.next(Some(2)).await.unwrap(), None);

    let opts = ListOptions {
        reverse: true,
        ..ListOptions::default()
    };
    let mut cursor = db.cursor_read("/items", opts).unwrap();
    assert_eq!(keys(cursor.next(Some(3)).await.unwrap().unwrap()), ["k4", "k3", "k2"]);
    assert_eq!(keys(cursor.next(Some(3)).await.unwrap().unwrap()), ["k1", "k0"]);
    assert_eq!(cursor.next(Some(3)).await.unwrap(), None);
}

#[tokio::test]
async fn read_stream_and_scan_find() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    for i in 0..250 {
        db.put(&format!("/n/{i:04}"), &json!({"n": i})).await.unwrap();
    }

    let all: Vec<_> = db
        .create_read_stream("/n", ListOptions::default())
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await;
    assert_eq!(all.len(), 250);
    assert_eq!(all[249].as_ref().unwrap().key, "0249");

    let opts = ListOptions {
        limit: Some(120),
        gte: Some("0010".to_owned()),
        ..ListOptions::default()
    };
    let limited: Vec<_> = db.create_read_stream("/n", opts).await.unwrap().collect::<Vec<_>>().await;
    assert_eq!(limited.len(), 120);
    assert_eq!(limited[0].as_ref().unwrap().key, "0010");

    let found = db
        .scan_find("/n", ListOptions::default(), |r| r.value["n"] == json!(137))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.key, "0137");
    let missing = db.scan_find("/n", ListOptions::default(), |r| r.value["n"] == json!(-1)).await;
    assert_eq!(missing.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn reads_time_out() {
    let config = AdbConfig {
        read_timeout: Duration::from_secs(1).into(),
        ..AdbConfig::default()
    };
    let env = TestEnv::with_config(config).await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    db.put("/items/k", &json!("v")).await.unwrap();

    env.backend.set_read_latency(Duration::from_secs(5));
    assert_eq!(db.get("/items/k").await, Err(Error::Timeout));
    assert_eq!(db.list("/items", &ListOptions::default()).await, Err(Error::Timeout));
    let opts = ListOptions {
        timeout: Some(10_000),
        ..ListOptions::default()
    };
    assert_eq!(db.list("/items", &opts).await.unwrap().len(), 1);

    env.backend.set_read_latency(Duration::ZERO);
    assert_eq!(db.get("/items/k").await.unwrap().unwrap().value, json!("v"));
}

#[tokio::test(start_paused = true)]
async fn watch_is_debounced() {
    let env = TestEnv::new().await;
    let db = env.manager.create_db(&alice(), &DbConfig::default()).await.unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    assert!(db.watch(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    for i in 0..3 {
        db.put(&format!("/w/{i}"), &json!(i)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    db.put("/w/again", &json!(null)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    db.teardown(false).await.unwrap();
    assert!(!db.watch(|_| {}));
}

#[tokio::test]
async fn remote_databases_cannot_be_watched() {
    let env = TestEnv::new().await;
    let remote = env.backend.seed_remote_store();
    let db = env.manager.load_db(&alice(), remote.key().into()).await.unwrap();
    assert!(!db.watch(|_| {}));
    db.when_synced().await.unwrap();
}

//! End-to-end behaviour of synced state across simulated clients.

use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, Utc};
use serde_json::json;
use tracker_core::SyncedEntry;
use tracker_core::cache::{FileCache, LocalCache, MemoryCache};
use tracker_core::remote::MemoryRemoteStore;
use tracker_core::schema::Schema;
use tracker_core::sync::{DeferredSpawner, SyncRegistry};

struct Client {
    registry: Arc<SyncRegistry>,
    cache: Arc<dyn LocalCache>,
    spawner: DeferredSpawner,
}

impl Client {
    fn new(remote: &Arc<MemoryRemoteStore>) -> Self {
        Self::with_cache(remote, Arc::new(MemoryCache::new()))
    }

    fn with_cache(remote: &Arc<MemoryRemoteStore>, cache: Arc<dyn LocalCache>) -> Self {
        let spawner = DeferredSpawner::new();
        let registry = SyncRegistry::new(
            Arc::clone(&cache),
            remote.clone(),
            remote.clone(),
            Arc::new(spawner.clone()),
        );
        Self {
            registry,
            cache,
            spawner,
        }
    }
}

#[test]
fn set_is_visible_immediately_even_offline() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_available(false);
    let client = Client::new(&remote);

    let budget = client.registry.bind("budget", json!({}));
    budget.set(json!({ "rent": 1200 }));

    assert_eq!(budget.get(), json!({ "rent": 1200 }));

    client.spawner.run_pending();
    assert_eq!(budget.get(), json!({ "rent": 1200 }));
    assert_eq!(remote.upsert_count(), 0);
}

#[test]
fn cached_value_survives_remount_without_remote() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_available(false);
    let dir = tempfile::tempdir().unwrap();

    {
        let client = Client::with_cache(&remote, Arc::new(FileCache::new(dir.path())));
        let routine = client.registry.bind("daily_routine", Vec::<String>::new());
        routine.set(vec!["run".to_string(), "read".to_string()]);
    }

    let client = Client::with_cache(&remote, Arc::new(FileCache::new(dir.path())));
    let routine = client.registry.bind("daily_routine", Vec::<String>::new());

    assert_eq!(routine.get(), vec!["run", "read"]);
}

#[test]
fn repeated_identical_writes_only_refresh_timestamp() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = Client::new(&remote);
    let mode = client.registry.bind("theme", String::from("light"));
    client.spawner.run_pending();

    mode.set("dark".to_string());
    client.spawner.run_pending();
    let first = remote.get("theme").unwrap();

    mode.set("dark".to_string());
    client.spawner.run_pending();
    let second = remote.get("theme").unwrap();

    assert_eq!(mode.get(), "dark");
    assert_eq!(first.value, second.value);
    assert!(second.updated_at > first.updated_at);
}

#[test]
fn two_clients_converge_on_last_write() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let alice = Client::new(&remote);
    let bob = Client::new(&remote);

    let a = alice.registry.bind("streak_count", 0u32);
    let b = bob.registry.bind("streak_count", 0u32);
    alice.spawner.run_pending();
    bob.spawner.run_pending();

    a.set(1);
    alice.spawner.run_pending();
    assert_eq!(b.get(), 1);

    b.set(2);
    bob.spawner.run_pending();

    assert_eq!(a.get(), 2);
    assert_eq!(b.get(), 2);
}

#[test]
fn streak_scenario_reaches_second_client_and_cache() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let first = Client::new(&remote);
    let second = Client::new(&remote);

    let streak = first.registry.bind("streak_count", 0);
    let mirror = second.registry.bind("streak_count", 0);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    mirror.on_change(move |n: i32| seen_clone.lock().unwrap().push(n));

    streak.set(1);
    assert_eq!(first.cache.get("streak_count").unwrap().as_deref(), Some("1"));

    first.spawner.run_pending();

    let row = remote.get("streak_count").unwrap();
    assert_eq!(row.value, json!(1));
    assert_eq!(mirror.get(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
    assert_eq!(second.cache.get("streak_count").unwrap().as_deref(), Some("1"));
}

#[test]
fn updater_applies_to_current_value() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = Client::new(&remote);

    let counter = client.registry.bind("counter", 5);
    counter.update(|n| n + 1);

    assert_eq!(counter.get(), 6);
}

#[test]
fn remote_read_error_keeps_cache_or_initial() {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.set_available(false);

    let cache = MemoryCache::new().with_entry("budget", r#"{"rent":900}"#);
    let cached = Client::with_cache(&remote, Arc::new(cache));
    let budget = cached.registry.bind("budget", json!(null));
    cached.spawner.run_pending();
    assert_eq!(budget.get(), json!({ "rent": 900 }));

    let empty = Client::new(&remote);
    let journal = empty.registry.bind("journal", String::from("blank"));
    empty.spawner.run_pending();
    assert_eq!(journal.get(), "blank");
}

#[test]
fn corrupt_cache_entry_is_a_miss() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let cache = MemoryCache::new().with_entry("budget", "{not json");
    let client = Client::with_cache(&remote, Arc::new(cache));

    let budget = client.registry.bind("budget", json!({ "rent": 0 }));

    assert_eq!(budget.get(), json!({ "rent": 0 }));
}

#[test]
fn remote_row_overrides_cache_on_startup() {
    let remote = Arc::new(
        MemoryRemoteStore::new().with_entry(SyncedEntry::new("net_worth_history", json!([100, 120]))),
    );
    let cache = MemoryCache::new().with_entry("net_worth_history", "[100]");
    let client = Client::with_cache(&remote, Arc::new(cache));

    let history = client.registry.bind("net_worth_history", Vec::<u32>::new());
    assert_eq!(history.get(), vec![100]);

    client.spawner.run_pending();

    assert_eq!(history.get(), vec![100, 120]);
    assert_eq!(client.cache.get("net_worth_history").unwrap().as_deref(), Some("[100,120]"));
}

#[test]
fn null_remote_row_is_ignored_on_startup() {
    let remote = Arc::new(MemoryRemoteStore::new().with_entry(SyncedEntry::new("notes", json!(null))));
    let client = Client::new(&remote);

    let notes = client.registry.bind("notes", String::from("draft"));
    client.spawner.run_pending();

    assert_eq!(notes.get(), "draft");
}

#[test]
fn change_for_other_key_is_ignored() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let watcher = Client::new(&remote);
    let writer = Client::new(&remote);

    let streak = watcher.registry.bind("streak", 3);
    watcher.spawner.run_pending();

    writer.registry.bind("streak_count", 0).set(99);
    writer.spawner.run_pending();

    assert_eq!(streak.get(), 3);
}

#[test]
fn slow_startup_read_does_not_clobber_local_edit() {
    let stale = SyncedEntry::with_timestamp("budget", json!({ "rent": 1 }), Utc::now() - TimeDelta::seconds(5));
    let remote = Arc::new(MemoryRemoteStore::new().with_entry(stale));
    let client = Client::new(&remote);

    let budget = client.registry.bind("budget", json!({}));
    budget.set(json!({ "rent": 2 }));

    // The startup read was queued first, so it completes after the edit.
    assert!(client.spawner.run_one());
    assert_eq!(budget.get(), json!({ "rent": 2 }));

    client.spawner.run_pending();
    assert_eq!(remote.get("budget").unwrap().value, json!({ "rent": 2 }));
}

#[test]
fn newer_remote_write_still_wins_after_local_edit() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = Client::new(&remote);
    let budget = client.registry.bind("budget", 0);
    client.spawner.run_pending();

    budget.set(1);
    client.spawner.run_pending();

    let later = SyncedEntry::with_timestamp("budget", json!(7), Utc::now() + TimeDelta::seconds(1));
    futures_lite::future::block_on(tracker_core::remote::RemoteStore::upsert(remote.as_ref(), &later)).unwrap();

    assert_eq!(budget.get(), 7);
}

#[test]
fn passive_watcher_follows_latest_commit_despite_clock_skew() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let watcher_client = Client::new(&remote);
    let watcher = watcher_client.registry.bind("budget", 0);
    watcher_client.spawner.run_pending();

    // The first writer's clock runs a minute ahead of the second's.
    let now = Utc::now();
    let fast = SyncedEntry::with_timestamp("budget", json!(1), now + TimeDelta::seconds(60));
    let slow = SyncedEntry::with_timestamp("budget", json!(2), now);
    futures_lite::future::block_on(tracker_core::remote::RemoteStore::upsert(remote.as_ref(), &fast)).unwrap();
    assert_eq!(watcher.get(), 1);
    futures_lite::future::block_on(tracker_core::remote::RemoteStore::upsert(remote.as_ref(), &slow)).unwrap();

    assert_eq!(remote.get("budget").unwrap().value, json!(2));
    assert_eq!(watcher.get(), 2);
}

#[test]
fn writer_behind_skewed_row_still_reaches_other_clients() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let first = Client::new(&remote);
    let second = Client::new(&remote);
    let a = first.registry.bind("budget", 0);
    let b = second.registry.bind("budget", 0);
    first.spawner.run_pending();
    second.spawner.run_pending();

    b.set(5);
    second.spawner.run_pending();
    assert_eq!(a.get(), 5);

    let ahead = SyncedEntry::with_timestamp("budget", json!(1), Utc::now() + TimeDelta::seconds(60));
    futures_lite::future::block_on(tracker_core::remote::RemoteStore::upsert(remote.as_ref(), &ahead)).unwrap();
    assert_eq!(a.get(), 1);
    assert_eq!(b.get(), 1);

    a.set(9);
    first.spawner.run_pending();

    assert_eq!(b.get(), 9);
    assert_eq!(remote.get("budget").unwrap().value, json!(9));
}

#[test]
fn last_binding_drop_closes_subscription_and_late_tasks_are_noops() {
    let remote = Arc::new(MemoryRemoteStore::new().with_entry(SyncedEntry::new("calendar", json!(["dentist"]))));
    let client = Client::new(&remote);

    let calendar = client.registry.bind("calendar", Vec::<String>::new());
    let again = client.registry.bind("calendar", Vec::<String>::new());
    assert_eq!(remote.subscriber_count(), 1);

    drop(calendar);
    assert_eq!(remote.subscriber_count(), 1);
    drop(again);
    assert_eq!(remote.subscriber_count(), 0);

    // The startup read finishes after teardown and must not touch the cache.
    client.spawner.run_pending();
    assert_eq!(client.cache.get("calendar").unwrap(), None);
}

#[test]
fn in_flight_write_completes_after_teardown() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = Client::new(&remote);

    let journal = client.registry.bind("journal", String::new());
    journal.set("written just before closing".to_string());
    drop(journal);

    client.spawner.run_pending();

    assert_eq!(remote.get("journal").unwrap().value, json!("written just before closing"));
}

#[test]
fn versioned_key_migrates_legacy_payload() {
    let remote = Arc::new(
        MemoryRemoteStore::new().with_entry(SyncedEntry::new("workout_splits", json!(["push", "pull"]))),
    );
    let client = Client::new(&remote);
    client.registry.register_schema(
        "workout_splits",
        Schema::new(1).migration(0, |legacy| {
            let names = legacy.as_array().ok_or("expected a list")?;
            Ok(json!(names.iter().map(|n| json!({ "name": n })).collect::<Vec<_>>()))
        }),
    );

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Split {
        name: String,
    }

    let splits = client.registry.bind("workout_splits", Vec::<Split>::new());
    client.spawner.run_pending();

    assert_eq!(
        splits.get(),
        vec![
            Split { name: "push".to_string() },
            Split { name: "pull".to_string() }
        ]
    );

    splits.update(|mut all| {
        all.push(Split { name: "legs".to_string() });
        all
    });
    client.spawner.run_pending();

    let stored = remote.get("workout_splits").unwrap().value;
    assert_eq!(stored["schema_version"], json!(1));
    assert_eq!(stored["data"][2]["name"], json!("legs"));
}

#[test]
fn assistant_write_to_versioned_key_reaches_binding_intact() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = Client::new(&remote);
    client
        .registry
        .register_schema("workout_splits", Schema::new(1).migration(0, |v| Ok(json!({ "legacy": v }))));

    let splits = client.registry.bind("workout_splits", json!([]));
    client.spawner.run_pending();
    splits.set(json!([{ "name": "push" }]));
    client.spawner.run_pending();

    let output = futures_lite::future::block_on(tracker_core::tools::execute_named(
        remote.as_ref(),
        tracker_core::tools::UPDATE_USER_DATA,
        json!({ "key": "workout_splits", "value": [{ "name": "push" }, { "name": "legs" }] }),
    ));

    assert!(output.success);
    assert_eq!(splits.get(), json!([{ "name": "push" }, { "name": "legs" }]));
}

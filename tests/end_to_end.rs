//! The six literal end-to-end scenarios from the backend abstraction's
//! testable-properties section, exercised against the bundled
//! in-memory backend through the public consumer-facing API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use settings_backend::backend::memory::MemoryBackend;
use settings_backend::{
    get_writable, read_value, reset, unwatch, watch, write, write_changeset, Backend, Callbacks,
    Changeset, OriginTag, Value,
};

fn memory() -> Arc<dyn Backend> {
    MemoryBackend::new()
}

#[test]
fn single_write_single_sync_watch() {
    let backend = memory();
    let hits = Arc::new(AtomicUsize::new(0));
    let target = Arc::new(());
    let h = hits.clone();
    watch(
        &backend,
        &target,
        Callbacks::new().on_changed(move |key, origin| {
            assert_eq!(key, "/app/mode");
            assert_eq!(origin, OriginTag::new(0xAA));
            h.fetch_add(1, Ordering::SeqCst);
        }),
        None,
    );

    let ok = write(
        &backend,
        "/app/mode",
        Value::new("dark".to_string()),
        OriginTag::new(0xAA),
    );

    assert!(ok);
    // Synchronous delivery: the watch has already fired by the time
    // write() returns.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn batch_write_with_common_prefix_dispatches_one_keys_changed() {
    let backend = memory();
    let single_key_hits = Arc::new(AtomicUsize::new(0));
    let batch_hits: Arc<std::sync::Mutex<Vec<(String, Vec<String>)>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let target = Arc::new(());
    let (s, b) = (single_key_hits.clone(), batch_hits.clone());
    watch(
        &backend,
        &target,
        Callbacks::new()
            .on_changed(move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_keys_changed(move |dir, keys, _origin| {
                b.lock().unwrap().push((dir.to_string(), keys.to_vec()));
            }),
        None,
    );

    let changeset = Changeset::new();
    changeset.add_write("/u/a", Value::new(1i32));
    changeset.add_write("/u/b", Value::new(2i32));
    changeset.add_write("/u/c", Value::new(3i32));
    let (prefix, mut keys, _) = changeset.describe();
    keys.sort();
    assert_eq!(prefix, "/u/");
    assert_eq!(keys, vec!["a", "b", "c"]);

    write_changeset(&backend, &changeset, OriginTag::new(1));

    assert_eq!(single_key_hits.load(Ordering::SeqCst), 0);
    let batches = batch_hits.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, "/u/");
    let mut delivered_keys = batches[0].1.clone();
    delivered_keys.sort();
    assert_eq!(delivered_keys, vec!["a", "b", "c"]);
}

#[test]
fn read_through_overlay_shadows_the_backend() {
    let backend = memory();
    write(&backend, "/x", Value::new(3i32), OriginTag::NONE);

    let pending = Arc::new(Changeset::new());
    pending.add_write("/x", Value::new(7i32));
    let queue = vec![pending];

    let through: Option<i32> = read_value(&backend, "/x", Some(&queue), false, false);
    assert_eq!(through, Some(7));

    let direct: Option<i32> = read_value(&backend, "/x", None, false, false);
    assert_eq!(direct, Some(3));
}

#[test]
fn type_mismatch_is_suppressed_not_surfaced() {
    let backend = memory();
    write(&backend, "/greet", Value::new("hi".to_string()), OriginTag::NONE);

    let as_int: Option<i32> = read_value(&backend, "/greet", None, false, false);
    assert!(as_int.is_none());

    let as_string: Option<String> = read_value(&backend, "/greet", None, false, false);
    assert_eq!(as_string.as_deref(), Some("hi"));
}

#[test]
fn invalid_key_is_rejected_without_state_change_or_signal() {
    let backend = memory();
    let hits = Arc::new(AtomicUsize::new(0));
    let target = Arc::new(());
    let h = hits.clone();
    watch(
        &backend,
        &target,
        Callbacks::new().on_changed(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        }),
        None,
    );

    let ok = write(&backend, "//bad", Value::new(1i32), OriginTag::NONE);

    assert!(!ok);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let read_back: Option<i32> = read_value(&backend, "/bad", None, false, false);
    assert!(read_back.is_none());
}

#[test]
fn target_destroyed_mid_dispatch_has_no_use_after_free() {
    let backend = memory();
    let writer_done = Arc::new(Barrier::new(2));

    let mut targets = Vec::new();
    let surviving_hits: Vec<Arc<AtomicUsize>> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    for hits in &surviving_hits {
        let target = Arc::new(());
        let h = hits.clone();
        watch(
            &backend,
            &target,
            Callbacks::new().on_changed(move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            None,
        );
        targets.push(target);
    }

    // A second batch of targets gets destroyed concurrently with
    // writes; the registry must prune them without panicking and the
    // write thread must never observe a dead callback crash the
    // process.
    let doomed: Vec<Arc<()>> = (0..8).map(|_| Arc::new(())).collect();
    for target in &doomed {
        watch(&backend, target, Callbacks::new().on_changed(|_, _| {}), None);
    }

    let writer_backend = backend.clone();
    let barrier = writer_done.clone();
    let writer = thread::spawn(move || {
        for i in 0..200u32 {
            write(
                &writer_backend,
                "/churn",
                Value::new(i),
                OriginTag::new(i as u64),
            );
        }
        barrier.wait();
    });

    let destroyer = thread::spawn(move || {
        for target in doomed {
            drop(target);
            thread::yield_now();
        }
    });

    destroyer.join().unwrap();
    writer.join().unwrap();

    // Surviving targets each saw a monotone (here: exactly matching)
    // subsequence of the 200 notifications, never zero crashes.
    for hits in &surviving_hits {
        assert_eq!(hits.load(Ordering::SeqCst), 200);
    }

    for target in targets {
        unwatch(&backend, &target);
    }
}

#[test]
fn get_writable_reflects_lockdown() {
    let backend = MemoryBackend::new();
    assert!(get_writable(&(backend.clone() as Arc<dyn Backend>), "/k"));
    backend.set_writable("/k", false);
    assert!(!get_writable(&(backend.clone() as Arc<dyn Backend>), "/k"));
}

#[test]
fn locked_key_write_is_refused_without_signal() {
    let backend = MemoryBackend::new();
    backend.set_writable("/locked", false);
    let hits = Arc::new(AtomicUsize::new(0));
    let target = Arc::new(());
    let h = hits.clone();
    let dyn_backend: Arc<dyn Backend> = backend.clone();
    watch(
        &dyn_backend,
        &target,
        Callbacks::new().on_changed(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        }),
        None,
    );

    let ok = write(&dyn_backend, "/locked", Value::new(1i32), OriginTag::NONE);

    assert!(!ok);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    let read_back: Option<i32> = read_value(&dyn_backend, "/locked", None, false, false);
    assert!(read_back.is_none());
}

#[test]
fn reset_falls_back_to_default_value() {
    let backend = MemoryBackend::new();
    backend.set_default("/greet", Value::new("hello".to_string()));
    let dyn_backend: Arc<dyn Backend> = backend;
    write(&dyn_backend, "/greet", Value::new("hi".to_string()), OriginTag::NONE);
    reset(&dyn_backend, "/greet", OriginTag::NONE);
    let v: Option<String> = read_value(&dyn_backend, "/greet", None, false, false);
    assert_eq!(v.as_deref(), Some("hello"));
}

//! Concurrency Tests
//!
//! Exercises the cache from multiple threads: overlapping writers with
//! per-store flushes, a deleter racing the writers, and cross-thread
//! visibility of completed stores.

use rcache_rs::{TieredCache, TieredCacheConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const VALUE_LEN: usize = 256;

fn open(root: &std::path::Path) -> Arc<TieredCache> {
    Arc::new(
        TieredCache::init(TieredCacheConfig {
            cache_location: root.to_path_buf(),
            max_size_on_disk: 10 * 1024 * 1024,
            max_size_in_memory: 10 * 1024 * 1024,
        })
        .expect("open cache"),
    )
}

fn key(i: u32) -> String {
    format!("k{i:03}")
}

fn value(i: u32) -> Vec<u8> {
    vec![(i % 251) as u8; VALUE_LEN]
}

#[test]
fn test_store_visible_to_other_thread() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path());
    let (tx, rx) = mpsc::channel();

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            cache.store("shared", vec![42u8; 128]);
            tx.send(()).unwrap();
        })
    };

    rx.recv().unwrap();
    // The store returned before the signal, so it must be visible here
    assert_eq!(cache.fetch("shared"), Some(vec![42u8; 128]));
    writer.join().unwrap();
}

#[test]
fn test_overlapping_writers_and_deleter() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path());

    // Writer 1 covers 1..=120, writer 2 covers 80..=200; the deleter's
    // range 30..=60 is written exactly once, by writer 1, so every delete
    // is final.
    let w1 = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 1..=120u32 {
                cache.store(key(i), value(i));
                assert!(cache.flush().wait());
            }
        })
    };
    let w2 = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 80..=200u32 {
                cache.store(key(i), value(i));
                assert!(cache.flush().wait());
            }
        })
    };
    let deleter = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(60);
            for i in 30..=60u32 {
                while cache.fetch(&key(i)).is_none() {
                    assert!(Instant::now() < deadline, "writer never produced {}", key(i));
                    thread::yield_now();
                }
                cache.delete(&key(i));
                assert!(cache.flush().wait());
            }
        })
    };

    w1.join().unwrap();
    w2.join().unwrap();
    deleter.join().unwrap();
    assert!(cache.flush().wait());

    // 200 distinct keys stored, 31 deleted
    let live = (200 - 31) as u64;
    assert_eq!(cache.mem_size(), live * VALUE_LEN as u64);
    assert_eq!(cache.file_size().wait(), live * VALUE_LEN as u64);

    for i in 30..=60u32 {
        assert_eq!(cache.fetch(&key(i)), None, "{} stayed deleted", key(i));
    }
    for i in [1u32, 29, 61, 120, 121, 200] {
        assert_eq!(cache.fetch(&key(i)), Some(value(i)), "{} survived", key(i));
    }
}

#[test]
fn test_mixed_operations_under_contention() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path());
    let num_threads = 8;
    let ops_per_thread = 400;

    let mut handles = Vec::new();
    for t in 0..num_threads {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let k = key((i % 50) as u32);
                match (t + i) % 4 {
                    0 => cache.store(k, value(i as u32)),
                    1 => {
                        let _ = cache.fetch(&k);
                    }
                    2 => cache.delete(&k),
                    _ => {
                        let _ = cache.mem_size();
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.flush().wait());
    // Whatever interleaving happened, the tiers agree with their budgets
    assert!(cache.mem_size() <= 10 * 1024 * 1024);
    assert!(cache.file_size().wait() <= 10 * 1024 * 1024);
}

#[test]
fn test_flush_barrier_covers_prior_stores() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path());

    let mut writers = Vec::new();
    for t in 0..4u32 {
        let cache = Arc::clone(&cache);
        writers.push(thread::spawn(move || {
            for i in 0..25u32 {
                cache.store(format!("t{t}-{i}"), value(i));
            }
        }));
    }
    for w in writers {
        w.join().unwrap();
    }

    // Every store above returned before this flush was scheduled
    assert!(cache.flush().wait());
    assert_eq!(cache.file_size().wait(), 100 * VALUE_LEN as u64);

    // And each payload is readable from disk by a fresh instance
    drop(Arc::try_unwrap(cache).expect("all clones joined"));
    let reopened = open(tmp.path());
    assert_eq!(reopened.fetch("t0-0"), Some(value(0)));
    assert_eq!(reopened.fetch("t3-24"), Some(value(24)));
}

#[test]
fn test_concurrent_flush_handles_all_resolve() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path());

    let mut handles = Vec::new();
    for t in 0..4u32 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..10u32 {
                cache.store(format!("f{t}-{i}"), value(i));
                assert!(cache.flush().wait());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.file_size().wait(), 40 * VALUE_LEN as u64);
}

//! End-to-end tests for the engine façade.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use pagestore::{Engine, EngineConfig, Error, Page, PageId, StorageEngine};
use tempfile::{tempdir, TempDir};

const PS: usize = 512;

fn config(dir: &TempDir, buffer_size: usize) -> EngineConfig {
    EngineConfig::new(dir.path())
        .with_page_size(PS)
        .with_buffer_size(buffer_size)
        .with_max_file_size(1 << 20)
}

fn pattern(i: usize) -> Vec<u8> {
    (0..PS).map(|j| ((i * 100 + j) % 256) as u8).collect()
}

#[test]
fn test_durability_across_reopen() {
    let dir = tempdir().unwrap();

    let page_ids: Vec<PageId> = {
        let engine = Engine::open(config(&dir, 2)).unwrap();
        let page_ids: Vec<PageId> = (0..5).map(|_| engine.allocate_page().unwrap()).collect();
        for (i, &pid) in page_ids.iter().enumerate() {
            engine.write_page(&Page::new(pid, pattern(i))).unwrap();
        }
        engine.sync().unwrap();
        engine.close().unwrap();
        page_ids
    };

    let engine = Engine::open(config(&dir, 2)).unwrap();
    assert_eq!(engine.stats().total_pages, 5);
    assert_eq!(engine.stats().free_pages, 0);
    for (i, &pid) in page_ids.iter().enumerate() {
        let page = engine.read_page(pid).unwrap();
        assert_eq!(page.as_slice(), &pattern(i)[..], "page {} differs", i);
    }
    engine.close().unwrap();
}

#[test]
fn test_reopen_after_close_without_sync() {
    let dir = tempdir().unwrap();

    {
        let engine = Engine::open(config(&dir, 4)).unwrap();
        let pid = engine.allocate_page().unwrap();
        engine.write_page(&Page::new(pid, vec![0x5A; PS])).unwrap();
        // close syncs best-effort
        engine.close().unwrap();
    }

    let engine = Engine::open(config(&dir, 4)).unwrap();
    assert_eq!(engine.read_page(PageId::new(0)).unwrap().as_slice(), &[0x5A; PS][..]);
}

#[test]
fn test_reuse_and_free_pages() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 4)).unwrap();

    let ids: Vec<PageId> = (0..4).map(|_| engine.allocate_page().unwrap()).collect();
    engine.deallocate_page(ids[1]).unwrap();
    engine.deallocate_page(ids[3]).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.total_pages, 4);
    assert_eq!(stats.free_pages, 2);

    let reused = engine.allocate_page().unwrap();
    assert!(reused == ids[1] || reused == ids[3]);
    assert_eq!(engine.stats().free_pages, 1);
    assert_eq!(engine.stats().total_pages, 4);
}

#[test]
fn test_allocations_are_distinct() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 4)).unwrap();

    let mut live = HashSet::new();
    for _ in 0..20 {
        assert!(live.insert(engine.allocate_page().unwrap()));
    }
    for pid in [PageId::new(2), PageId::new(9)] {
        engine.deallocate_page(pid).unwrap();
        live.remove(&pid);
    }
    for _ in 0..5 {
        assert!(live.insert(engine.allocate_page().unwrap()));
    }
}

#[test]
fn test_write_wrong_size_changes_nothing() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 4)).unwrap();
    let pid = engine.allocate_page().unwrap();
    engine.write_page(&Page::new(pid, vec![1; PS])).unwrap();
    let before = engine.stats();

    for len in [0, PS - 1, PS + 1] {
        let result = engine.write_page(&Page::new(pid, vec![2; len]));
        assert!(matches!(result, Err(Error::PageSizeMismatch { .. })));
    }

    assert_eq!(engine.read_page(pid).unwrap().as_slice(), &[1; PS][..]);
    assert_eq!(engine.stats().total_pages, before.total_pages);
    assert_eq!(engine.stats().buffer_misses, before.buffer_misses);
}

#[test]
fn test_double_free_leaves_free_list_unchanged() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 4)).unwrap();
    let pid = engine.allocate_page().unwrap();
    engine.allocate_page().unwrap();

    engine.deallocate_page(pid).unwrap();
    let err = engine.deallocate_page(pid).unwrap_err();
    assert!(matches!(err, Error::InvalidPageId(_)));
    assert!(err.is_retryable());

    let err = engine.deallocate_page(PageId::new(100)).unwrap_err();
    assert!(matches!(err, Error::InvalidPageId(_)));
    assert_eq!(engine.stats().free_pages, 1);
}

#[test]
fn test_allocation_exhausted() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(
        EngineConfig::new(dir.path())
            .with_page_size(PS)
            .with_buffer_size(2)
            .with_max_file_size(3 * PS as u64),
    )
    .unwrap();

    for _ in 0..3 {
        engine.allocate_page().unwrap();
    }
    let err = engine.allocate_page().unwrap_err();
    assert!(matches!(err, Error::AllocationExhausted { .. }));
    assert!(!err.is_retryable());

    // Evicting and syncing all three pages stays within the limit.
    engine.sync().unwrap();
    assert_eq!(engine.buffer_pool().disk_block_count(), 3);
}

#[test]
fn test_reopen_with_smaller_max_file_size() {
    let dir = tempdir().unwrap();
    let bounded = |max_pages: u64| {
        EngineConfig::new(dir.path())
            .with_page_size(PS)
            .with_buffer_size(1)
            .with_max_file_size(max_pages * PS as u64)
    };

    {
        let engine = Engine::open(bounded(4)).unwrap();
        for i in 0..4 {
            let pid = engine.allocate_page().unwrap();
            engine.write_page(&Page::new(pid, pattern(i))).unwrap();
        }
        engine.close().unwrap();
    }

    {
        let engine = Engine::open(bounded(2)).unwrap();
        assert_eq!(engine.stats().total_pages, 4);

        // Existing pages stay writable and evictable past the new limit.
        engine.write_page(&Page::new(PageId::new(3), vec![0x33; PS])).unwrap();
        assert_eq!(engine.read_page(PageId::new(1)).unwrap().as_slice(), &pattern(1)[..]);
        engine.sync().unwrap();

        assert!(matches!(
            engine.allocate_page(),
            Err(Error::AllocationExhausted { .. })
        ));
        engine.close().unwrap();
    }

    let engine = Engine::open(bounded(2)).unwrap();
    assert_eq!(engine.read_page(PageId::new(3)).unwrap().as_slice(), &[0x33; PS][..]);
    assert_eq!(engine.read_page(PageId::new(0)).unwrap().as_slice(), &pattern(0)[..]);
}

#[test]
fn test_closed_engine() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 4)).unwrap();
    let pid = engine.allocate_page().unwrap();
    engine.close().unwrap();

    assert!(matches!(engine.close(), Err(Error::ClosedEngine)));
    assert!(matches!(engine.read_page(pid), Err(Error::ClosedEngine)));
    assert!(matches!(
        engine.write_page(&Page::zeroed(pid, PS)),
        Err(Error::ClosedEngine)
    ));
    assert!(matches!(engine.deallocate_page(pid), Err(Error::ClosedEngine)));
    assert!(matches!(engine.sync(), Err(Error::ClosedEngine)));
}

#[test]
fn test_capacity_bound_under_load() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(config(&dir, 8)).unwrap();

    let ids: Vec<PageId> = (0..64).map(|_| engine.allocate_page().unwrap()).collect();
    for (i, &pid) in ids.iter().enumerate() {
        engine.write_page(&Page::new(pid, vec![i as u8; PS])).unwrap();
        assert!(engine.stats().resident_frames <= 8);
    }
    for (i, &pid) in ids.iter().enumerate().rev() {
        assert_eq!(engine.read_page(pid).unwrap().as_slice()[0], i as u8);
        assert!(engine.stats().resident_frames <= 8);
    }

    let stats = engine.stats();
    assert!(stats.evictions >= 56);
    assert!(stats.buffer_misses > 0);
    assert!((0.0..=1.0).contains(&stats.hit_rate()));
}

#[test]
fn test_concurrent_workers() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(Engine::open(config(&dir, 16)).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for n in 0..10 {
                    let pid = engine.allocate_page().unwrap();
                    let data = vec![(worker * 10 + n) as u8; PS];
                    engine.write_page(&Page::new(pid, data.clone())).unwrap();
                    assert_eq!(engine.read_page(pid).unwrap().as_slice(), &data[..]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.stats();
    assert!(stats.total_pages >= 100);
    assert!(stats.resident_frames <= 16);
    engine.sync().unwrap();
}

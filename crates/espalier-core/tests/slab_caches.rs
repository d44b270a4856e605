use std::sync::Arc;

use espalier_core::error::Error;
use espalier_core::{FixedOracle, LruSlabCache, OracularSlabCache};

fn boundary_error() -> Error {
    Error::BoundaryCallFailed {
        class: "Test".to_string(),
        payload: "boom".to_string(),
    }
}

#[test]
fn lru_hits_do_not_repopulate() {
    let mut cache: LruSlabCache<usize> = LruSlabCache::new(2);
    let mut populated = Vec::new();

    for &id in &[0usize, 0, 1, 0, 1] {
        let slab = cache
            .find(
                id,
                || 0,
                |id, slab| {
                    populated.push(id);
                    *slab = id * 100;
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(*slab, id * 100);
    }
    assert_eq!(populated, vec![0, 1]);
}

#[test]
fn lru_evicts_least_recently_used() {
    let mut cache: LruSlabCache<usize> = LruSlabCache::new(2);
    let mut populated = Vec::new();
    let mut touch = |cache: &mut LruSlabCache<usize>, id: usize, populated: &mut Vec<usize>| {
        cache
            .find(
                id,
                || 0,
                |id, slab| {
                    populated.push(id);
                    *slab = id;
                    Ok(())
                },
            )
            .unwrap();
    };

    touch(&mut cache, 0, &mut populated);
    touch(&mut cache, 1, &mut populated);
    touch(&mut cache, 0, &mut populated); // refresh 0, so 1 is now the victim
    touch(&mut cache, 2, &mut populated); // evicts 1
    touch(&mut cache, 0, &mut populated); // still resident
    touch(&mut cache, 1, &mut populated); // must repopulate

    assert_eq!(populated, vec![0, 1, 2, 1]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn lru_failed_population_leaves_no_entry() {
    let mut cache: LruSlabCache<usize> = LruSlabCache::new(2);
    let err = cache
        .find(7, || 0, |_, _| Err(boundary_error()))
        .unwrap_err();
    assert!(matches!(err, Error::BoundaryCallFailed { .. }));
    assert!(cache.is_empty());

    // The same chunk misses again and can now succeed.
    let mut populated = 0;
    cache
        .find(
            7,
            || 0,
            |_, slab| {
                populated += 1;
                *slab = 7;
                Ok(())
            },
        )
        .unwrap();
    assert_eq!(populated, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn oracular_batches_are_sorted_and_deduplicated() {
    // Chunk id is the prediction itself; offsets are zero.
    let oracle = Arc::new(FixedOracle::new(vec![2, 0, 2, 1, 0]));
    let mut cache: OracularSlabCache<usize> = OracularSlabCache::new(oracle, 3);
    let mut batches: Vec<Vec<usize>> = Vec::new();

    for &expected in &[2usize, 0, 2, 1, 0] {
        let (slab, offset) = cache
            .next(
                |i| (i, 0),
                || 0,
                |batch| {
                    batches.push(batch.iter().map(|(id, _)| *id).collect());
                    for (id, slab) in batch.iter_mut() {
                        *slab = *id;
                    }
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(*slab, expected);
        assert_eq!(offset, 0);
    }

    // One batch, covering all three chunks in ascending order.
    assert_eq!(batches, vec![vec![0, 1, 2]]);
}

#[test]
fn oracular_window_retires_unneeded_slabs() {
    let oracle = Arc::new(FixedOracle::new(vec![0, 1, 2, 3]));
    let mut cache: OracularSlabCache<usize> = OracularSlabCache::new(oracle, 2);
    let mut batches: Vec<Vec<usize>> = Vec::new();

    for &expected in &[0usize, 1, 2, 3] {
        let (slab, _) = cache
            .next(
                |i| (i, 0),
                || 0,
                |batch| {
                    batches.push(batch.iter().map(|(id, _)| *id).collect());
                    for (id, slab) in batch.iter_mut() {
                        *slab = *id;
                    }
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(*slab, expected);
    }

    assert_eq!(batches, vec![vec![0, 1], vec![2, 3]]);
}

#[test]
fn oracular_failed_population_rewinds() {
    let oracle = Arc::new(FixedOracle::new(vec![0, 1]));
    let mut cache: OracularSlabCache<usize> = OracularSlabCache::new(oracle, 2);

    let err = cache
        .next(|i| (i, 0), || 0, |_| Err(boundary_error()))
        .unwrap_err();
    assert!(matches!(err, Error::BoundaryCallFailed { .. }));

    // The same predictions are retried from the start.
    let mut batches: Vec<Vec<usize>> = Vec::new();
    for &expected in &[0usize, 1] {
        let (slab, _) = cache
            .next(
                |i| (i, 0),
                || 0,
                |batch| {
                    batches.push(batch.iter().map(|(id, _)| *id).collect());
                    for (id, slab) in batch.iter_mut() {
                        *slab = *id;
                    }
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(*slab, expected);
    }
    assert_eq!(batches, vec![vec![0, 1]]);
}

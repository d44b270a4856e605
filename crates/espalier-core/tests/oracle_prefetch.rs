mod common;

use std::sync::Arc;

use common::MockMatrix;
use espalier_core::{
    BridgeOptions, BridgedMatrix, ConsecutiveOracle, FixedOracle, Matrix, Oracle, Subset,
};

fn options(maximum_cache_size: usize, require_minimum_cache: bool) -> BridgeOptions {
    BridgeOptions {
        maximum_cache_size,
        require_minimum_cache,
    }
}

fn demo_data(nrow: usize, ncol: usize) -> Vec<f64> {
    (0..nrow * ncol).map(|k| (k * 7 % 13) as f64).collect()
}

#[test]
fn predicted_misses_are_fetched_in_one_ascending_call() {
    // Three single-row chunks; the oracle revisits them out of order.
    let mock = MockMatrix::dense(3, 4, demo_data(3, 4), vec![1, 2, 3], vec![4]);
    // Room for three slabs of 1 x 4 f64.
    let bridged = BridgedMatrix::new(mock, options(3 * 4 * 8, false)).unwrap();

    let predictions = vec![2usize, 0, 2, 1, 0];
    let oracle: Arc<dyn Oracle> = Arc::new(FixedOracle::new(predictions.clone()));
    let mut extractor = bridged.dense(true, Subset::Full, Some(oracle)).unwrap();

    let mut buffer = vec![0.0; 4];
    for &expected_row in &predictions {
        // The index argument is ignored; the oracle drives the iteration.
        extractor.fetch(usize::MAX, &mut buffer).unwrap();
        assert_eq!(
            buffer,
            bridged.foreign().expected_slice(true, expected_row, &[0, 1, 2, 3])
        );
    }

    let log = bridged.foreign().dense_log();
    assert_eq!(log.len(), 1);
    // All three chunks fetched at once, target indices ascending.
    assert_eq!(log[0].0, vec![0, 1, 2]);
}

#[test]
fn single_slab_oracle_pays_one_call_per_chunk() {
    let mock = MockMatrix::dense(6, 4, demo_data(6, 4), vec![2, 4, 6], vec![4]);
    // Budget for exactly one slab of 2 x 4 f64.
    let bridged = BridgedMatrix::new(mock, options(2 * 4 * 8, false)).unwrap();

    let oracle: Arc<dyn Oracle> = Arc::new(ConsecutiveOracle::new(0, 6));
    let mut extractor = bridged.dense(true, Subset::Full, Some(oracle)).unwrap();
    let mut buffer = vec![0.0; 4];
    for i in 0..6 {
        extractor.fetch(i, &mut buffer).unwrap();
        assert_eq!(buffer, bridged.foreign().expected_slice(true, i, &[0, 1, 2, 3]));
    }
    assert_eq!(bridged.foreign().dense_calls(), 3);
}

#[test]
fn wider_windows_batch_consecutive_chunks() {
    let mock = MockMatrix::dense(8, 3, demo_data(8, 3), vec![2, 4, 6, 8], vec![3]);
    // Two slabs of 2 x 3 f64 fit.
    let bridged = BridgedMatrix::new(mock, options(2 * 2 * 3 * 8, false)).unwrap();

    let oracle: Arc<dyn Oracle> = Arc::new(ConsecutiveOracle::new(0, 8));
    let mut extractor = bridged.dense(true, Subset::Full, Some(oracle)).unwrap();
    let mut buffer = vec![0.0; 3];
    for i in 0..8 {
        extractor.fetch(i, &mut buffer).unwrap();
    }
    // Four chunks, prefetched two at a time.
    assert_eq!(bridged.foreign().dense_calls(), 2);
    for (rows, _) in bridged.foreign().dense_log() {
        assert_eq!(rows.len(), 4);
    }
}

#[test]
fn thrash_baseline_and_minimum_cache() {
    // Two row chunks; a budget for one slab thrashes on alternation.
    let data = demo_data(4, 3);
    let thrash = MockMatrix::dense(4, 3, data.clone(), vec![2, 4], vec![3]);
    let bridged = BridgedMatrix::new(thrash, options(2 * 3 * 8, false)).unwrap();
    let mut extractor = bridged.dense(true, Subset::Full, None).unwrap();
    let mut buffer = vec![0.0; 3];
    for i in [0usize, 2, 0, 2] {
        extractor.fetch(i, &mut buffer).unwrap();
    }
    assert_eq!(bridged.foreign().dense_calls(), 4);

    // With the minimum-cache guarantee, a consecutive scan costs exactly one
    // call per row chunk even under a zero budget.
    let scan = MockMatrix::dense(4, 3, data, vec![2, 4], vec![3]);
    let bridged = BridgedMatrix::new(scan, options(0, true)).unwrap();
    let mut extractor = bridged.dense(true, Subset::Full, None).unwrap();
    for i in 0..4 {
        extractor.fetch(i, &mut buffer).unwrap();
        assert_eq!(buffer, bridged.foreign().expected_slice(true, i, &[0, 1, 2]));
    }
    assert_eq!(bridged.foreign().dense_calls(), 2);
}

#[test]
fn solo_oracular_trusts_the_oracle() {
    let mock = MockMatrix::dense(4, 3, demo_data(4, 3), vec![2, 4], vec![3]);
    let bridged = BridgedMatrix::new(mock, options(0, false)).unwrap();

    let oracle: Arc<dyn Oracle> = Arc::new(FixedOracle::new(vec![3, 1]));
    let mut extractor = bridged.dense(true, Subset::Full, Some(oracle)).unwrap();
    let mut buffer = vec![0.0; 3];

    extractor.fetch(0, &mut buffer).unwrap();
    assert_eq!(buffer, bridged.foreign().expected_slice(true, 3, &[0, 1, 2]));
    extractor.fetch(0, &mut buffer).unwrap();
    assert_eq!(buffer, bridged.foreign().expected_slice(true, 1, &[0, 1, 2]));
    assert_eq!(bridged.foreign().dense_calls(), 2);
}

#[test]
fn oracular_sparse_matches_myopic_sparse() {
    let mut data = vec![0.0; 6 * 5];
    for (k, slot) in data.iter_mut().enumerate() {
        if k % 3 == 0 {
            *slot = (k + 1) as f64;
        }
    }
    let myopic = MockMatrix::sparse(6, 5, data.clone(), vec![2, 4, 6], vec![5]);
    let oracular = MockMatrix::sparse(6, 5, data, vec![2, 4, 6], vec![5]);

    let bridged_myopic = BridgedMatrix::new(myopic, BridgeOptions::default()).unwrap();
    let bridged_oracular = BridgedMatrix::new(oracular, BridgeOptions::default()).unwrap();

    let order = vec![5usize, 0, 1, 5, 3, 2, 4];
    let oracle: Arc<dyn Oracle> = Arc::new(FixedOracle::new(order.clone()));

    let mut a = bridged_myopic
        .sparse(true, Subset::Full, None, true, true)
        .unwrap();
    let mut b = bridged_oracular
        .sparse(true, Subset::Full, Some(oracle), true, true)
        .unwrap();

    let mut va = vec![0.0; 5];
    let mut ia = vec![0usize; 5];
    let mut vb = vec![0.0; 5];
    let mut ib = vec![0usize; 5];
    for &i in &order {
        let ca = a.fetch(i, &mut va, &mut ia).unwrap();
        let cb = b.fetch(i, &mut vb, &mut ib).unwrap();
        assert_eq!(ca, cb, "row {i}");
        assert_eq!(&va[..ca], &vb[..cb]);
        assert_eq!(&ia[..ca], &ib[..cb]);
    }
}

#[test]
fn oracular_failure_retries_the_same_batch() {
    let mock = MockMatrix::dense(4, 3, demo_data(4, 3), vec![2, 4], vec![3]);
    let bridged = BridgedMatrix::new(mock, BridgeOptions::default()).unwrap();

    let oracle: Arc<dyn Oracle> = Arc::new(ConsecutiveOracle::new(0, 4));
    let mut extractor = bridged.dense(true, Subset::Full, Some(oracle)).unwrap();
    let mut buffer = vec![0.0; 3];

    bridged.foreign().fail_next_call();
    assert!(extractor.fetch(0, &mut buffer).is_err());

    for i in 0..4 {
        extractor.fetch(i, &mut buffer).unwrap();
        assert_eq!(buffer, bridged.foreign().expected_slice(true, i, &[0, 1, 2]));
    }
}

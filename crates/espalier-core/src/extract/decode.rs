//! Decoding of foreign payloads into slab memory.
//!
//! Dense payloads arrive in C-order or F-order and are rewritten into
//! target-major slab layout. Sparse payloads arrive as per-column leaves and
//! are either copied row-for-row (column-target iteration) or transposed on
//! the fly through running counts (row-target iteration).

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    reason = "Payload elements are converted with `as`, matching the numeric coercions of the foreign formats"
)]

use crate::cache::slab::SparseSlab;
use crate::error::{Error, Result};
use crate::foreign::{ArrayBuf, DensePayload, MemoryOrder, SparseLeaf, SparsePayload};

/// Conversion of any supported payload element into the cached value and
/// index types.
pub(crate) trait ToCached: Copy {
    fn to_f64(self) -> f64;
    fn to_index(self) -> usize;
}

macro_rules! impl_to_cached {
    ($($t:ty),+) => {$(
        impl ToCached for $t {
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn to_index(self) -> usize {
                self as usize
            }
        }
    )+};
}

impl_to_cached!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

/// Dispatch on the runtime element type of an [`ArrayBuf`], binding the
/// typed slice for the body.
macro_rules! with_buf {
    ($buf:expr, |$slice:ident| $body:expr) => {
        match $buf {
            ArrayBuf::F64($slice) => $body,
            ArrayBuf::F32($slice) => $body,
            ArrayBuf::I64($slice) => $body,
            ArrayBuf::I32($slice) => $body,
            ArrayBuf::I16($slice) => $body,
            ArrayBuf::I8($slice) => $body,
            ArrayBuf::U64($slice) => $body,
            ArrayBuf::U32($slice) => $body,
            ArrayBuf::U16($slice) => $body,
            ArrayBuf::U8($slice) => $body,
        }
    };
}

/// Copy `target_len` target slices of a dense payload into `out` in
/// target-major order, starting at target position `target_offset` within
/// the payload.
///
/// With `by_row` the payload is `(targets, non_targets)`, otherwise
/// `(non_targets, targets)`. The payload shape must match the selection that
/// produced it; bounds checks on the slices enforce this.
pub(crate) fn decode_dense(
    payload: &DensePayload,
    target_offset: usize,
    by_row: bool,
    target_len: usize,
    non_target_len: usize,
    out: &mut [f64],
) {
    debug_assert_eq!(payload.data.len(), payload.nrows * payload.ncols);
    with_buf!(&payload.data, |data| {
        copy_target_major(
            data,
            payload.nrows,
            payload.ncols,
            payload.order,
            target_offset,
            by_row,
            target_len,
            non_target_len,
            out,
        );
    });
}

#[allow(clippy::too_many_arguments)]
fn copy_target_major<T: ToCached>(
    data: &[T],
    nrows: usize,
    ncols: usize,
    order: MemoryOrder,
    target_offset: usize,
    by_row: bool,
    target_len: usize,
    non_target_len: usize,
    out: &mut [f64],
) {
    for t in 0..target_len {
        let row = &mut out[t * non_target_len..(t + 1) * non_target_len];
        let p = target_offset + t;
        match (by_row, order) {
            (true, MemoryOrder::RowMajor) => {
                let src = &data[p * ncols..p * ncols + non_target_len];
                for (dst, &v) in row.iter_mut().zip(src) {
                    *dst = v.to_f64();
                }
            }
            (true, MemoryOrder::ColumnMajor) => {
                for (u, dst) in row.iter_mut().enumerate() {
                    *dst = data[p + u * nrows].to_f64();
                }
            }
            (false, MemoryOrder::RowMajor) => {
                for (u, dst) in row.iter_mut().enumerate() {
                    *dst = data[u * ncols + p].to_f64();
                }
            }
            (false, MemoryOrder::ColumnMajor) => {
                let src = &data[p * nrows..p * nrows + non_target_len];
                for (dst, &v) in row.iter_mut().zip(src) {
                    *dst = v.to_f64();
                }
            }
        }
    }
}

/// Read every value of a leaf into `scratch` as `f64`, replacing its
/// contents.
fn read_leaf_values(leaf: &SparseLeaf, scratch: &mut Vec<f64>) {
    scratch.clear();
    with_buf!(&leaf.values, |values| {
        scratch.extend(values.iter().map(|v| v.to_f64()));
    });
}

/// Walk the non-`None` leaves of a sparse payload, validating structure.
fn for_each_leaf(
    payload: &SparsePayload,
    class: &str,
    expected_cols: usize,
    mut f: impl FnMut(usize, &SparseLeaf) -> Result<()>,
) -> Result<()> {
    let Some(leaves) = &payload.leaves else {
        return Ok(());
    };
    if leaves.len() != expected_cols {
        return Err(Error::MalformedSparseLeaf {
            class: class.to_string(),
            reason: format!("expected {expected_cols} leaves, found {}", leaves.len()),
        });
    }
    for (c, leaf) in leaves.iter().enumerate() {
        let Some(leaf) = leaf else {
            continue;
        };
        if leaf.indices.len() != leaf.values.len() {
            return Err(Error::MalformedSparseLeaf {
                class: class.to_string(),
                reason: format!(
                    "leaf {c} has {} indices but {} values",
                    leaf.indices.len(),
                    leaf.values.len()
                ),
            });
        }
        f(c, leaf)?;
    }
    Ok(())
}

/// Decode a sparse payload whose target axis is the columns: each leaf is
/// one target and lands in one slab row.
///
/// `slabs` holds `(chunk_len, slab)` pairs in the concatenated target order
/// of the extraction; every slab must already be reset for its chunk length.
pub(crate) fn decode_sparse_by_column(
    payload: &SparsePayload,
    class: &str,
    non_target_len: usize,
    slabs: &mut [(usize, &mut SparseSlab)],
    scratch: &mut Vec<f64>,
) -> Result<()> {
    let total: usize = slabs.iter().map(|(len, _)| len).sum();
    let starts = chunk_starts(slabs);

    for_each_leaf(payload, class, total, |j, leaf| {
        let s = locate(&starts, j);
        let row = j - starts[s];
        let slab = &mut *slabs[s].1;
        let count = leaf.indices.len();
        if count > slab.row_capacity() {
            return Err(Error::MalformedSparseLeaf {
                class: class.to_string(),
                reason: format!("leaf {j} holds {count} entries for {non_target_len} positions"),
            });
        }
        if slab.has_values() {
            read_leaf_values(leaf, scratch);
            slab.values_row_mut(row)[..count].copy_from_slice(scratch);
        }
        if slab.has_indices() {
            with_buf!(&leaf.indices, |indices| {
                let out = slab.indices_row_mut(row);
                for (k, &raw) in indices.iter().enumerate() {
                    let ix = raw.to_index();
                    if ix >= non_target_len {
                        return Err(Error::MalformedSparseLeaf {
                            class: class.to_string(),
                            reason: format!("leaf {j} index {ix} outside the requested frame"),
                        });
                    }
                    out[k] = ix;
                }
                Ok(())
            })?;
        }
        slab.set_count(row, count);
        Ok(())
    })
}

/// Decode a sparse payload whose target axis is the rows: leaves are
/// non-target columns, transposed into slab rows through running counts.
///
/// `slabs` holds `(chunk_len, slab)` pairs in the concatenated target order
/// of the extraction; every slab must already be reset for its chunk length.
pub(crate) fn decode_sparse_by_row(
    payload: &SparsePayload,
    class: &str,
    non_target_len: usize,
    slabs: &mut [(usize, &mut SparseSlab)],
    scratch: &mut Vec<f64>,
) -> Result<()> {
    let total: usize = slabs.iter().map(|(len, _)| len).sum();
    let starts = chunk_starts(slabs);

    for_each_leaf(payload, class, non_target_len, |c, leaf| {
        read_leaf_values(leaf, scratch);
        with_buf!(&leaf.indices, |indices| {
            for (k, &raw) in indices.iter().enumerate() {
                let r = raw.to_index();
                if r >= total {
                    return Err(Error::MalformedSparseLeaf {
                        class: class.to_string(),
                        reason: format!("leaf {c} index {r} outside the requested frame"),
                    });
                }
                let s = locate(&starts, r);
                let row = r - starts[s];
                let slab = &mut *slabs[s].1;
                if slab.count(row) == slab.row_capacity() {
                    return Err(Error::MalformedSparseLeaf {
                        class: class.to_string(),
                        reason: format!("more entries for target {r} than non-target positions"),
                    });
                }
                slab.push(row, c, scratch[k]);
            }
            Ok(())
        })
    })
}

/// Cumulative start of each slab's chunk within the concatenated target
/// selection.
fn chunk_starts(slabs: &[(usize, &mut SparseSlab)]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(slabs.len());
    let mut acc = 0usize;
    for (len, _) in slabs {
        starts.push(acc);
        acc += len;
    }
    starts
}

/// Index of the slab whose chunk contains concatenated position `p`.
fn locate(starts: &[usize], p: usize) -> usize {
    starts.partition_point(|&s| s <= p) - 1
}

//! Sparse extraction cores and their framework-facing adapters, including
//! the densified adapters over sparse storage and the sparsified wrapper
//! over dense extractors.

use std::sync::Arc;

use crate::api::{DenseExtractor, SparseExtractor};
use crate::cache::{LruSlabCache, OracularSlabCache, SlabPlan, SparseSlab, SparseSlabFactory};
use crate::error::Result;
use crate::extract::decode::{decode_sparse_by_column, decode_sparse_by_row};
use crate::extract::Rebase;
use crate::foreign::{consecutive_indices, ForeignMatrix};
use crate::grid::AxisGrid;
use crate::oracle::{Oracle, OracleStream};
use crate::parallel::serialize;

/// Uncached: one boundary call per fetch. A single-row slab is still kept so
/// sparse decoding has stable buffers to land in.
pub(crate) struct SoloSparseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    class: &'a str,
    by_row: bool,
    non_target: Vec<usize>,
    slab: SparseSlab,
    oracle: Option<OracleStream>,
    scratch: Vec<f64>,
}

impl<M: ForeignMatrix> SoloSparseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize) -> Result<(&SparseSlab, usize)> {
        let i = match &mut self.oracle {
            Some(stream) => stream.advance(),
            None => i,
        };
        self.slab.reset(1);
        let target = [i];
        let payload = serialize(|| {
            if self.by_row {
                self.matrix.extract_sparse(&target, &self.non_target)
            } else {
                self.matrix.extract_sparse(&self.non_target, &target)
            }
        })?;
        {
            let mut slabs = [(1usize, &mut self.slab)];
            if self.by_row {
                decode_sparse_by_row(
                    &payload,
                    self.class,
                    self.non_target.len(),
                    &mut slabs,
                    &mut self.scratch,
                )?;
            } else {
                decode_sparse_by_column(
                    &payload,
                    self.class,
                    self.non_target.len(),
                    &mut slabs,
                    &mut self.scratch,
                )?;
            }
        }
        Ok((&self.slab, 0))
    }
}

/// LRU-cached sparse extraction over whole chunks.
pub(crate) struct MyopicSparseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    class: &'a str,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    factory: SparseSlabFactory,
    cache: LruSlabCache<SparseSlab>,
    scratch: Vec<f64>,
}

impl<M: ForeignMatrix> MyopicSparseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize) -> Result<(&SparseSlab, usize)> {
        let Self {
            matrix,
            class,
            by_row,
            non_target,
            grid,
            factory,
            cache,
            scratch,
        } = self;
        let non_target_len = non_target.len();
        let chunk = grid.chunk_of(i);

        let slab = cache.find(
            chunk,
            || factory.create(),
            |id, slab| {
                let range = grid.chunk_range(id);
                let len = range.len();
                slab.reset(len);
                let target = consecutive_indices(range.start, len);
                let payload = serialize(|| {
                    if *by_row {
                        matrix.extract_sparse(&target, non_target)
                    } else {
                        matrix.extract_sparse(non_target, &target)
                    }
                })?;
                let mut slabs = [(len, slab)];
                if *by_row {
                    decode_sparse_by_row(&payload, class, non_target_len, &mut slabs, scratch)
                } else {
                    decode_sparse_by_column(&payload, class, non_target_len, &mut slabs, scratch)
                }
            },
        )?;

        Ok((slab, i - grid.chunk_range(chunk).start))
    }
}

/// Oracle-driven sparse extraction with batched misses.
pub(crate) struct OracularSparseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    class: &'a str,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    factory: SparseSlabFactory,
    cache: OracularSlabCache<SparseSlab>,
    scratch: Vec<f64>,
}

impl<M: ForeignMatrix> OracularSparseCore<'_, M> {
    fn fetch_raw(&mut self, _i: usize) -> Result<(&SparseSlab, usize)> {
        let Self {
            matrix,
            class,
            by_row,
            non_target,
            grid,
            factory,
            cache,
            scratch,
        } = self;
        let non_target_len = non_target.len();

        cache.next(
            |i| {
                let chunk = grid.chunk_of(i);
                (chunk, i - grid.chunk_range(chunk).start)
            },
            || factory.create(),
            |batch| {
                let mut target = Vec::new();
                for (id, slab) in batch.iter_mut() {
                    let range = grid.chunk_range(*id);
                    slab.reset(range.len());
                    target.extend(range);
                }
                let payload = serialize(|| {
                    if *by_row {
                        matrix.extract_sparse(&target, non_target)
                    } else {
                        matrix.extract_sparse(non_target, &target)
                    }
                })?;
                let mut slabs: Vec<(usize, &mut SparseSlab)> = batch
                    .iter_mut()
                    .map(|(id, slab)| (grid.chunk_range(*id).len(), slab))
                    .collect();
                if *by_row {
                    decode_sparse_by_row(&payload, class, non_target_len, &mut slabs, scratch)
                } else {
                    decode_sparse_by_column(&payload, class, non_target_len, &mut slabs, scratch)
                }
            },
        )
    }
}

/// Cache-policy dispatch for sparse extraction.
pub(crate) enum SparseCore<'a, M: ForeignMatrix> {
    Solo(SoloSparseCore<'a, M>),
    Myopic(MyopicSparseCore<'a, M>),
    Oracular(OracularSparseCore<'a, M>),
}

impl<M: ForeignMatrix> SparseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize) -> Result<(&SparseSlab, usize)> {
        match self {
            Self::Solo(core) => core.fetch_raw(i),
            Self::Myopic(core) => core.fetch_raw(i),
            Self::Oracular(core) => core.fetch_raw(i),
        }
    }
}

/// Pick the cache-policy variant from the slab plan and oracle.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_sparse_core<'a, M: ForeignMatrix>(
    matrix: &'a M,
    class: &'a str,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    plan: SlabPlan,
    oracle: Option<Arc<dyn Oracle>>,
    needs_value: bool,
    needs_index: bool,
) -> SparseCore<'a, M> {
    let non_target_len = non_target.len();
    if plan.max_slabs == 0 {
        let factory = SparseSlabFactory::new(1, non_target_len, needs_value, needs_index);
        SparseCore::Solo(SoloSparseCore {
            matrix,
            class,
            by_row,
            non_target,
            slab: factory.create(),
            oracle: oracle.map(OracleStream::new),
            scratch: Vec::new(),
        })
    } else {
        let factory = SparseSlabFactory::new(
            grid.max_chunk_len(),
            non_target_len,
            needs_value,
            needs_index,
        );
        if let Some(oracle) = oracle {
            SparseCore::Oracular(OracularSparseCore {
                matrix,
                class,
                by_row,
                non_target,
                grid,
                factory,
                cache: OracularSlabCache::new(oracle, plan.max_slabs),
                scratch: Vec::new(),
            })
        } else {
            SparseCore::Myopic(MyopicSparseCore {
                matrix,
                class,
                by_row,
                non_target,
                grid,
                factory,
                cache: LruSlabCache::new(plan.max_slabs),
                scratch: Vec::new(),
            })
        }
    }
}

/// Sparse extractor over foreign sparse storage.
pub struct SparseReader<'a, M: ForeignMatrix> {
    core: SparseCore<'a, M>,
    rebase: Rebase,
    needs_value: bool,
    needs_index: bool,
}

impl<'a, M: ForeignMatrix> SparseReader<'a, M> {
    pub(crate) fn new(
        core: SparseCore<'a, M>,
        rebase: Rebase,
        needs_value: bool,
        needs_index: bool,
    ) -> Self {
        Self {
            core,
            rebase,
            needs_value,
            needs_index,
        }
    }
}

impl<M: ForeignMatrix> SparseExtractor for SparseReader<'_, M> {
    fn fetch(
        &mut self,
        i: usize,
        value_buffer: &mut [f64],
        index_buffer: &mut [usize],
    ) -> Result<usize> {
        let needs_value = self.needs_value;
        let needs_index = self.needs_index;
        let (slab, offset) = self.core.fetch_raw(i)?;
        let count = slab.count(offset);

        if needs_value {
            value_buffer[..count].copy_from_slice(slab.values_row(offset));
        }
        if needs_index {
            let local = slab.indices_row(offset);
            match &self.rebase {
                Rebase::Identity => index_buffer[..count].copy_from_slice(local),
                Rebase::Shift(start) => {
                    for (out, &ix) in index_buffer.iter_mut().zip(local) {
                        *out = ix + start;
                    }
                }
                Rebase::Map(indices) => {
                    for (out, &ix) in index_buffer.iter_mut().zip(local) {
                        *out = indices[ix];
                    }
                }
            }
        }
        Ok(count)
    }
}

/// Dense extractor over foreign sparse storage: zero-fill then scatter.
pub struct DensifiedReader<'a, M: ForeignMatrix> {
    core: SparseCore<'a, M>,
    non_target_len: usize,
}

impl<'a, M: ForeignMatrix> DensifiedReader<'a, M> {
    pub(crate) fn new(core: SparseCore<'a, M>, non_target_len: usize) -> Self {
        Self {
            core,
            non_target_len,
        }
    }
}

impl<M: ForeignMatrix> DenseExtractor for DensifiedReader<'_, M> {
    fn fetch(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        assert_eq!(
            buffer.len(),
            self.non_target_len,
            "buffer length must equal the non-target selection length"
        );
        let (slab, offset) = self.core.fetch_raw(i)?;
        buffer.fill(0.0);
        for (&ix, &v) in slab.indices_row(offset).iter().zip(slab.values_row(offset)) {
            buffer[ix] = v;
        }
        Ok(())
    }
}

/// Sparse extractor over dense storage: every position is reported as a
/// structural non-zero.
pub struct SparsifiedReader<D> {
    inner: D,
    rebase: Rebase,
    non_target_len: usize,
    needs_value: bool,
    needs_index: bool,
}

impl<D: DenseExtractor> SparsifiedReader<D> {
    pub(crate) fn new(
        inner: D,
        rebase: Rebase,
        non_target_len: usize,
        needs_value: bool,
        needs_index: bool,
    ) -> Self {
        Self {
            inner,
            rebase,
            non_target_len,
            needs_value,
            needs_index,
        }
    }
}

impl<D: DenseExtractor> SparseExtractor for SparsifiedReader<D> {
    fn fetch(
        &mut self,
        i: usize,
        value_buffer: &mut [f64],
        index_buffer: &mut [usize],
    ) -> Result<usize> {
        let count = self.non_target_len;
        if self.needs_value {
            self.inner.fetch(i, &mut value_buffer[..count])?;
        }
        if self.needs_index {
            match &self.rebase {
                Rebase::Identity => {
                    for (out, ix) in index_buffer.iter_mut().zip(0..count) {
                        *out = ix;
                    }
                }
                Rebase::Shift(start) => {
                    for (out, ix) in index_buffer.iter_mut().zip(0..count) {
                        *out = start + ix;
                    }
                }
                Rebase::Map(indices) => index_buffer[..count].copy_from_slice(indices),
            }
        }
        Ok(count)
    }
}

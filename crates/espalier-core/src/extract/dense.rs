//! Dense extraction cores and their framework-facing adapter.

use std::sync::Arc;

use crate::api::DenseExtractor;
use crate::cache::{DenseSlab, DenseSlabFactory, LruSlabCache, OracularSlabCache, SlabPlan};
use crate::error::Result;
use crate::extract::decode::decode_dense;
use crate::foreign::{consecutive_indices, ForeignMatrix};
use crate::grid::AxisGrid;
use crate::oracle::{Oracle, OracleStream};
use crate::parallel::serialize;

/// Uncached: one boundary call per fetch, decoding straight into the
/// caller's buffer.
pub(crate) struct SoloDenseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    by_row: bool,
    non_target: Vec<usize>,
    oracle: Option<OracleStream>,
}

impl<M: ForeignMatrix> SoloDenseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        let i = match &mut self.oracle {
            Some(stream) => stream.advance(),
            None => i,
        };
        let target = [i];
        let payload = serialize(|| {
            if self.by_row {
                self.matrix.extract_dense(&target, &self.non_target)
            } else {
                self.matrix.extract_dense(&self.non_target, &target)
            }
        })?;
        decode_dense(&payload, 0, self.by_row, 1, self.non_target.len(), buffer);
        Ok(())
    }
}

/// LRU-cached: fetches materialize the whole chunk holding the target index
/// and later fetches in the same chunk are served from the slab.
pub(crate) struct MyopicDenseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    factory: DenseSlabFactory,
    cache: LruSlabCache<DenseSlab>,
}

impl<M: ForeignMatrix> MyopicDenseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        let Self {
            matrix,
            by_row,
            non_target,
            grid,
            factory,
            cache,
        } = self;
        let non_target_len = non_target.len();
        let chunk = grid.chunk_of(i);

        let slab = cache.find(
            chunk,
            || factory.create(),
            |id, slab| {
                let range = grid.chunk_range(id);
                let target = consecutive_indices(range.start, range.len());
                let payload = serialize(|| {
                    if *by_row {
                        matrix.extract_dense(&target, non_target)
                    } else {
                        matrix.extract_dense(non_target, &target)
                    }
                })?;
                decode_dense(
                    &payload,
                    0,
                    *by_row,
                    range.len(),
                    non_target_len,
                    slab.data_mut(),
                );
                Ok(())
            },
        )?;

        let offset = i - grid.chunk_range(chunk).start;
        buffer.copy_from_slice(&slab.data()[offset * non_target_len..(offset + 1) * non_target_len]);
        Ok(())
    }
}

/// Oracle-driven: misses across the look-ahead window are fetched with a
/// single boundary call over a concatenated, ascending target selection.
pub(crate) struct OracularDenseCore<'a, M: ForeignMatrix> {
    matrix: &'a M,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    factory: DenseSlabFactory,
    cache: OracularSlabCache<DenseSlab>,
}

impl<M: ForeignMatrix> OracularDenseCore<'_, M> {
    fn fetch_raw(&mut self, _i: usize, buffer: &mut [f64]) -> Result<()> {
        let Self {
            matrix,
            by_row,
            non_target,
            grid,
            factory,
            cache,
        } = self;
        let non_target_len = non_target.len();

        let (slab, offset) = cache.next(
            |i| {
                let chunk = grid.chunk_of(i);
                (chunk, i - grid.chunk_range(chunk).start)
            },
            || factory.create(),
            |batch| {
                let mut target = Vec::new();
                for (id, _) in batch.iter() {
                    target.extend(grid.chunk_range(*id));
                }
                let payload = serialize(|| {
                    if *by_row {
                        matrix.extract_dense(&target, non_target)
                    } else {
                        matrix.extract_dense(non_target, &target)
                    }
                })?;
                let mut cursor = 0usize;
                for (id, slab) in batch.iter_mut() {
                    let len = grid.chunk_range(*id).len();
                    decode_dense(
                        &payload,
                        cursor,
                        *by_row,
                        len,
                        non_target_len,
                        slab.data_mut(),
                    );
                    cursor += len;
                }
                Ok(())
            },
        )?;

        buffer.copy_from_slice(&slab.data()[offset * non_target_len..(offset + 1) * non_target_len]);
        Ok(())
    }
}

/// Cache-policy dispatch for dense extraction.
pub(crate) enum DenseCore<'a, M: ForeignMatrix> {
    Solo(SoloDenseCore<'a, M>),
    Myopic(MyopicDenseCore<'a, M>),
    Oracular(OracularDenseCore<'a, M>),
}

impl<M: ForeignMatrix> DenseCore<'_, M> {
    fn fetch_raw(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        match self {
            Self::Solo(core) => core.fetch_raw(i, buffer),
            Self::Myopic(core) => core.fetch_raw(i, buffer),
            Self::Oracular(core) => core.fetch_raw(i, buffer),
        }
    }
}

/// Pick the cache-policy variant from the slab plan and oracle.
pub(crate) fn build_dense_core<'a, M: ForeignMatrix>(
    matrix: &'a M,
    by_row: bool,
    non_target: Vec<usize>,
    grid: &'a AxisGrid,
    plan: SlabPlan,
    oracle: Option<Arc<dyn Oracle>>,
) -> DenseCore<'a, M> {
    if plan.max_slabs == 0 {
        DenseCore::Solo(SoloDenseCore {
            matrix,
            by_row,
            non_target,
            oracle: oracle.map(OracleStream::new),
        })
    } else if let Some(oracle) = oracle {
        DenseCore::Oracular(OracularDenseCore {
            matrix,
            by_row,
            non_target,
            grid,
            factory: DenseSlabFactory::new(plan.slab_elements),
            cache: OracularSlabCache::new(oracle, plan.max_slabs),
        })
    } else {
        DenseCore::Myopic(MyopicDenseCore {
            matrix,
            by_row,
            non_target,
            grid,
            factory: DenseSlabFactory::new(plan.slab_elements),
            cache: LruSlabCache::new(plan.max_slabs),
        })
    }
}

/// Dense extractor over foreign dense storage.
pub struct DenseReader<'a, M: ForeignMatrix> {
    core: DenseCore<'a, M>,
    non_target_len: usize,
}

impl<'a, M: ForeignMatrix> DenseReader<'a, M> {
    pub(crate) fn new(core: DenseCore<'a, M>, non_target_len: usize) -> Self {
        Self {
            core,
            non_target_len,
        }
    }
}

impl<M: ForeignMatrix> DenseExtractor for DenseReader<'_, M> {
    fn fetch(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        assert_eq!(
            buffer.len(),
            self.non_target_len,
            "buffer length must equal the non-target selection length"
        );
        self.core.fetch_raw(i, buffer)
    }
}

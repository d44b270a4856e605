//! The matrix façade over an opaque foreign object.

use std::mem::size_of;
use std::sync::Arc;

use crate::api::{DenseExtractor, Matrix, SparseExtractor, Subset};
use crate::cache::SlabPlan;
use crate::error::Result;
use crate::extract::dense::{build_dense_core, DenseReader};
use crate::extract::sparse::{build_sparse_core, DensifiedReader, SparseReader, SparsifiedReader};
use crate::extract::Rebase;
use crate::foreign::{consecutive_indices, ForeignMatrix};
use crate::grid::AxisGrid;
use crate::oracle::Oracle;

/// Extraction configuration.
#[derive(Debug, Clone, Copy)]
pub struct BridgeOptions {
    /// Upper bound on total slab storage, in bytes.
    pub maximum_cache_size: usize,
    /// Raise the effective budget so that at least one chunk spanning the
    /// whole non-target selection stays resident, preventing thrash when
    /// iterating consecutive rows or columns.
    pub require_minimum_cache: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            maximum_cache_size: 100_000_000,
            require_minimum_cache: true,
        }
    }
}

/// A foreign matrix-like object behind the chunk-aware caching engine.
///
/// Construction probes the foreign shape, sparsity and chunk grid exactly
/// once; the snapshots are immutable afterwards. It performs boundary calls
/// without taking the host lock, so it must run on the thread that owns the
/// host runtime. The extractors it produces borrow the handle and may then
/// be driven from worker threads, where all boundary crossings go through
/// [`crate::parallel::serialize`].
pub struct BridgedMatrix<M: ForeignMatrix> {
    matrix: M,
    class: String,
    nrow: usize,
    ncol: usize,
    sparse: bool,
    row_grid: AxisGrid,
    col_grid: AxisGrid,
    prefer_rows: bool,
    options: BridgeOptions,
}

impl<M: ForeignMatrix> std::fmt::Debug for BridgedMatrix<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedMatrix")
            .field("class", &self.class)
            .field("nrow", &self.nrow)
            .field("ncol", &self.ncol)
            .field("sparse", &self.sparse)
            .field("row_grid", &self.row_grid)
            .field("col_grid", &self.col_grid)
            .field("prefer_rows", &self.prefer_rows)
            .field("options", &self.options)
            .finish()
    }
}

impl<M: ForeignMatrix> BridgedMatrix<M> {
    pub fn new(matrix: M, options: BridgeOptions) -> Result<Self> {
        let class = matrix.class_name();
        let (nrow, ncol) = matrix.shape()?;
        let sparse = matrix.is_sparse()?;
        let (row_bounds, col_bounds) = matrix.chunk_boundaries()?;
        let row_grid = AxisGrid::new(nrow, &row_bounds, &class)?;
        let col_grid = AxisGrid::new(ncol, &col_bounds, &class)?;

        // Prefer the axis whose scan crosses fewer chunk boundaries.
        let chunks_per_row = col_grid.chunk_count();
        let chunks_per_col = row_grid.chunk_count();
        let prefer_rows = chunks_per_row <= chunks_per_col;

        tracing::debug!(class, nrow, ncol, sparse, prefer_rows, "bridged foreign matrix");

        Ok(Self {
            matrix,
            class,
            nrow,
            ncol,
            sparse,
            row_grid,
            col_grid,
            prefer_rows,
            options,
        })
    }

    /// The wrapped foreign object.
    #[must_use]
    pub fn foreign(&self) -> &M {
        &self.matrix
    }

    fn target_grid(&self, by_row: bool) -> &AxisGrid {
        if by_row {
            &self.row_grid
        } else {
            &self.col_grid
        }
    }

    fn non_target_dim(&self, by_row: bool) -> usize {
        if by_row {
            self.ncol
        } else {
            self.nrow
        }
    }

    /// Materialize the non-target index vector of a subset.
    fn non_target_indices(&self, by_row: bool, subset: &Subset) -> Vec<usize> {
        let extent = self.non_target_dim(by_row);
        match subset {
            Subset::Full => consecutive_indices(0, extent),
            Subset::Block { start, length } => {
                assert!(
                    start + length <= extent,
                    "block [{start}, {start} + {length}) exceeds the axis extent {extent}"
                );
                consecutive_indices(*start, *length)
            }
            Subset::Index(indices) => {
                debug_assert!(indices.iter().all(|&ix| ix < extent));
                indices.clone()
            }
        }
    }

    fn rebase_of(subset: &Subset) -> Rebase {
        match subset {
            Subset::Full => Rebase::Identity,
            Subset::Block { start, .. } => Rebase::Shift(*start),
            Subset::Index(indices) => Rebase::Map(indices.clone()),
        }
    }

    fn slab_plan(
        &self,
        by_row: bool,
        non_target_len: usize,
        element_size: usize,
    ) -> Result<SlabPlan> {
        let grid = self.target_grid(by_row);
        SlabPlan::new(
            grid.max_chunk_len(),
            non_target_len,
            grid.chunk_count(),
            self.options.maximum_cache_size,
            element_size,
            self.options.require_minimum_cache,
        )
    }
}

impl<M: ForeignMatrix> Matrix for BridgedMatrix<M> {
    fn nrow(&self) -> usize {
        self.nrow
    }

    fn ncol(&self) -> usize {
        self.ncol
    }

    fn is_sparse(&self) -> bool {
        self.sparse
    }

    fn prefer_rows(&self) -> bool {
        self.prefer_rows
    }

    fn uses_oracle(&self) -> bool {
        true
    }

    fn dense<'m>(
        &'m self,
        by_row: bool,
        subset: Subset,
        oracle: Option<Arc<dyn Oracle>>,
    ) -> Result<Box<dyn DenseExtractor + 'm>> {
        let non_target = self.non_target_indices(by_row, &subset);
        let non_target_len = non_target.len();
        let plan = self.slab_plan(by_row, non_target_len, size_of::<f64>())?;
        let grid = self.target_grid(by_row);

        if self.sparse {
            let core = build_sparse_core(
                &self.matrix,
                &self.class,
                by_row,
                non_target,
                grid,
                plan,
                oracle,
                true,
                true,
            );
            Ok(Box::new(DensifiedReader::new(core, non_target_len)))
        } else {
            let core = build_dense_core(&self.matrix, by_row, non_target, grid, plan, oracle);
            Ok(Box::new(DenseReader::new(core, non_target_len)))
        }
    }

    fn sparse<'m>(
        &'m self,
        by_row: bool,
        subset: Subset,
        oracle: Option<Arc<dyn Oracle>>,
        needs_value: bool,
        needs_index: bool,
    ) -> Result<Box<dyn SparseExtractor + 'm>> {
        if self.sparse {
            let non_target = self.non_target_indices(by_row, &subset);
            let non_target_len = non_target.len();
            let element_size = usize::from(needs_value) * size_of::<f64>()
                + usize::from(needs_index) * size_of::<usize>();
            let plan = self.slab_plan(by_row, non_target_len, element_size)?;
            let core = build_sparse_core(
                &self.matrix,
                &self.class,
                by_row,
                non_target,
                self.target_grid(by_row),
                plan,
                oracle,
                needs_value,
                needs_index,
            );
            Ok(Box::new(SparseReader::new(
                core,
                Self::rebase_of(&subset),
                needs_value,
                needs_index,
            )))
        } else {
            let non_target_len = subset.len(self.non_target_dim(by_row));
            let rebase = Self::rebase_of(&subset);
            let inner = self.dense(by_row, subset, oracle)?;
            Ok(Box::new(SparsifiedReader::new(
                inner,
                rebase,
                non_target_len,
                needs_value,
                needs_index,
            )))
        }
    }
}

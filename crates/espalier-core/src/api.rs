//! Contracts the matrix façade satisfies towards the matrix framework.
//!
//! These mirror the framework's extractor interfaces: a matrix hands out
//! single-owner extractors that fetch one row or column per call, with the
//! non-target axis optionally restricted to a block or an index list.

use std::sync::Arc;

use crate::error::Result;
use crate::oracle::Oracle;

/// Restriction of the non-target axis for an extractor.
#[derive(Debug, Clone)]
pub enum Subset {
    /// The whole perpendicular axis.
    Full,
    /// A contiguous block `[start, start + length)`.
    Block { start: usize, length: usize },
    /// An explicit index list; must be non-decreasing.
    Index(Vec<usize>),
}

impl Subset {
    /// Number of elements this subset selects out of an axis of `extent`.
    #[must_use]
    pub fn len(&self, extent: usize) -> usize {
        match self {
            Self::Full => extent,
            Self::Block { length, .. } => *length,
            Self::Index(indices) => indices.len(),
        }
    }
}

/// Fetches dense rows/columns of a matrix, one target index per call.
pub trait DenseExtractor {
    /// Fill `buffer` with the non-target slice of target index `i`. The
    /// buffer must hold exactly the non-target selection length.
    fn fetch(&mut self, i: usize, buffer: &mut [f64]) -> Result<()>;
}

impl<T: DenseExtractor + ?Sized> DenseExtractor for Box<T> {
    fn fetch(&mut self, i: usize, buffer: &mut [f64]) -> Result<()> {
        (**self).fetch(i, buffer)
    }
}

/// Fetches sparse rows/columns of a matrix, one target index per call.
pub trait SparseExtractor {
    /// Fetch the structural non-zeros of target index `i`, returning their
    /// count. Values land in `value_buffer` and indices in `index_buffer`
    /// according to the flags the extractor was created with; both buffers
    /// must hold at least the non-target selection length.
    fn fetch(
        &mut self,
        i: usize,
        value_buffer: &mut [f64],
        index_buffer: &mut [usize],
    ) -> Result<usize>;
}

impl<T: SparseExtractor + ?Sized> SparseExtractor for Box<T> {
    fn fetch(
        &mut self,
        i: usize,
        value_buffer: &mut [f64],
        index_buffer: &mut [usize],
    ) -> Result<usize> {
        (**self).fetch(i, value_buffer, index_buffer)
    }
}

/// The matrix contract: shape, layout hints, and extractor factories.
pub trait Matrix {
    fn nrow(&self) -> usize;

    fn ncol(&self) -> usize;

    /// Whether the underlying storage is sparse.
    fn is_sparse(&self) -> bool;

    /// Preferred iteration axis: true when scanning rows crosses no more
    /// chunk boundaries than scanning columns.
    fn prefer_rows(&self) -> bool;

    /// Whether supplying an oracle can reduce boundary crossings. Always
    /// true for this engine.
    fn uses_oracle(&self) -> bool;

    /// Create a dense extractor over the given target axis.
    fn dense<'m>(
        &'m self,
        by_row: bool,
        subset: Subset,
        oracle: Option<Arc<dyn Oracle>>,
    ) -> Result<Box<dyn DenseExtractor + 'm>>;

    /// Create a sparse extractor over the given target axis. `needs_value`
    /// and `needs_index` control which outputs are materialized.
    fn sparse<'m>(
        &'m self,
        by_row: bool,
        subset: Subset,
        oracle: Option<Arc<dyn Oracle>>,
        needs_value: bool,
        needs_index: bool,
    ) -> Result<Box<dyn SparseExtractor + 'm>>;
}

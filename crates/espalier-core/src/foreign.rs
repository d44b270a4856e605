//! Boundary contract with the host runtime.
//!
//! The engine never touches host-runtime objects directly. Everything it
//! needs from the foreign side goes through [`ForeignMatrix`], and everything
//! the foreign side hands back arrives as one of the typed payloads defined
//! here. Host bindings (e.g. the Python crate) implement the trait and are
//! responsible for acquiring whatever interpreter lock their runtime needs
//! inside each method; the engine additionally serializes all calls through
//! [`crate::parallel::serialize`].

use crate::error::Result;

/// Memory layout of a dense foreign buffer.
///
/// `RowMajor` corresponds to C-order, `ColumnMajor` to F-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    RowMajor,
    ColumnMajor,
}

/// A borrowed-from-nowhere copy of a foreign numeric buffer.
///
/// Only these ten element types are supported; the host bindings reject
/// anything else before it reaches the engine.
#[derive(Debug, Clone)]
pub enum ArrayBuf {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    I8(Vec<i8>),
    U64(Vec<u64>),
    U32(Vec<u32>),
    U16(Vec<u16>),
    U8(Vec<u8>),
}

impl ArrayBuf {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn dtype_name(&self) -> &'static str {
        match self {
            Self::F64(_) => "f64",
            Self::F32(_) => "f32",
            Self::I64(_) => "i64",
            Self::I32(_) => "i32",
            Self::I16(_) => "i16",
            Self::I8(_) => "i8",
            Self::U64(_) => "u64",
            Self::U32(_) => "u32",
            Self::U16(_) => "u16",
            Self::U8(_) => "u8",
        }
    }
}

/// A dense rectangular block returned by a foreign extraction call.
///
/// `data.len()` must equal `nrows * ncols`; the engine trusts the shape the
/// binding reports, the same way the original buffers are trusted to match
/// their own descriptors.
#[derive(Debug, Clone)]
pub struct DensePayload {
    pub nrows: usize,
    pub ncols: usize,
    pub order: MemoryOrder,
    pub data: ArrayBuf,
}

/// One non-empty leaf of a sparse payload: parallel index/value arrays.
///
/// Indices are local to the requested block and sorted by convention of the
/// upstream format.
#[derive(Debug, Clone)]
pub struct SparseLeaf {
    pub indices: ArrayBuf,
    pub values: ArrayBuf,
}

/// A sparse sub-block returned by a foreign extraction call, as one optional
/// leaf per column of the requested block. `leaves: None` means the whole
/// block is structurally empty.
#[derive(Debug, Clone)]
pub struct SparsePayload {
    pub ncols: usize,
    pub leaves: Option<Vec<Option<SparseLeaf>>>,
}

/// An opaque matrix-like object living in the host runtime.
///
/// Implementations must ensure that dense payload shapes match the requested
/// selections (`rows.len() x cols.len()`), and that sparse payloads carry one
/// leaf slot per requested column. Probes and extractions may be called from
/// any thread, but only ever under the host lock; implementations that need
/// their runtime's own lock must take it themselves.
pub trait ForeignMatrix {
    /// Best-effort class name of the foreign object, used in error messages.
    fn class_name(&self) -> String;

    /// `(nrow, ncol)` of the foreign matrix.
    fn shape(&self) -> Result<(usize, usize)>;

    /// Whether the foreign storage is sparse.
    fn is_sparse(&self) -> Result<bool>;

    /// Chunk boundary ticks for each axis, excluding the implicit leading 0.
    fn chunk_boundaries(&self) -> Result<(Vec<usize>, Vec<usize>)>;

    /// Materialize the dense sub-block selected by `rows` x `cols`.
    fn extract_dense(&self, rows: &[usize], cols: &[usize]) -> Result<DensePayload>;

    /// Materialize the sparse sub-block selected by `rows` x `cols`.
    fn extract_sparse(&self, rows: &[usize], cols: &[usize]) -> Result<SparsePayload>;
}

/// Build the integer index vector `[start, start + length)`.
///
/// All selections handed to a [`ForeignMatrix`] are index vectors; chunk and
/// block selections are consecutive runs built with this helper.
#[must_use]
pub fn consecutive_indices(start: usize, length: usize) -> Vec<usize> {
    (start..start + length).collect()
}

//! The extraction cores: solo, myopic and oracular variants for dense and
//! sparse foreign storage, plus the adapters that present them through the
//! framework extractor contracts.

pub(crate) mod decode;
pub mod dense;
pub mod sparse;

pub use dense::DenseReader;
pub use sparse::{DensifiedReader, SparseReader, SparsifiedReader};

/// How slab-local non-target indices translate into the caller's frame.
///
/// Full requests pass through, block requests shift by the block start, and
/// indexed requests remap through the original index vector.
#[derive(Debug, Clone)]
pub(crate) enum Rebase {
    Identity,
    Shift(usize),
    Map(Vec<usize>),
}

//! Slab cache primitives: sizing, slab factories, and the two caching
//! policies (LRU and oracle-driven).

pub mod lru;
pub mod oracular;
pub mod plan;
pub mod slab;

pub use lru::LruSlabCache;
pub use oracular::OracularSlabCache;
pub use plan::SlabPlan;
pub use slab::{DenseSlab, DenseSlabFactory, SparseSlab, SparseSlabFactory};

//! Chunk-aware caching extractor engine for foreign matrix-like objects.
//!
//! A foreign matrix lives in a host runtime and cannot be read element-wise
//! at acceptable cost: every read takes a process-wide lock and invokes a
//! user-supplied callable that materializes a rectangular slab. This crate
//! sits between a row/column iteration API and those expensive block
//! extractions. It discovers the foreign chunk grid, translates requested
//! rows, columns, blocks and index sets into the minimum number of boundary
//! crossings, caches extracted chunks under a byte budget, batches misses
//! when an oracle of future accesses is available, and serializes all
//! boundary crossings while keeping pure numeric work outside the lock.
//!
//! The engine is generic over [`ForeignMatrix`]; host bindings implement
//! that trait for their runtime's objects. See [`BridgedMatrix`] for the
//! entry point.

pub mod api;
pub mod cache;
pub mod error;
pub mod extract;
pub mod foreign;
pub mod grid;
pub mod matrix;
pub mod oracle;
pub mod parallel;

pub use api::{DenseExtractor, Matrix, SparseExtractor, Subset};
pub use cache::{LruSlabCache, OracularSlabCache, SlabPlan};
pub use error::{Error, Result};
pub use extract::{DenseReader, DensifiedReader, SparseReader, SparsifiedReader};
pub use foreign::{ArrayBuf, DensePayload, ForeignMatrix, MemoryOrder, SparseLeaf, SparsePayload};
pub use grid::AxisGrid;
pub use matrix::{BridgeOptions, BridgedMatrix};
pub use oracle::{ConsecutiveOracle, FixedOracle, Oracle};
pub use parallel::{host_lock, install_host_lock, parallelize, serialize};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

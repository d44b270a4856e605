//! Error kinds surfaced by the extractor engine.
//!
//! Every failure that crosses the host-runtime boundary names the foreign
//! class so that users can tell which of their objects misbehaved.

use thiserror::Error;

/// Errors produced while probing or extracting from a foreign matrix.
#[derive(Debug, Error)]
pub enum Error {
    /// The chunk grid reported by the foreign object is unusable: boundaries
    /// are not strictly increasing, the final tick does not match the axis
    /// extent, the grid is not 2-dimensional, or a tick does not fit the
    /// index type.
    #[error("malformed chunk grid for <{class}>: {reason}")]
    MalformedChunkGrid { class: String, reason: String },

    /// The foreign shape is negative or does not fit the index type.
    #[error("invalid shape for <{class}>: {reason}")]
    ShapeOutOfRange { class: String, reason: String },

    /// A foreign extraction callable raised; the original payload is carried
    /// verbatim in the message.
    #[error("extraction from <{class}> failed: {payload}")]
    BoundaryCallFailed { class: String, payload: String },

    /// A foreign buffer uses an element type outside the supported set.
    #[error("unsupported element type '{dtype}' from <{class}>")]
    DecodeTypeUnsupported { class: String, dtype: String },

    /// A sparse leaf is structurally broken: not a 2-tuple, mismatched
    /// index/value lengths, or indices outside the requested frame.
    #[error("malformed sparse leaf from <{class}>: {reason}")]
    MalformedSparseLeaf { class: String, reason: String },

    /// An internal size computation would overflow the index type.
    #[error("capacity computation overflowed: {reason}")]
    CapacityOverflow { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

//! Per-axis chunk geometry of a foreign matrix.

use std::ops::Range;

use crate::error::{Error, Result};

/// The chunk grid along one axis: boundary ticks, an element-to-chunk map,
/// and the largest chunk extent.
///
/// Invariants established at construction:
/// - `ticks[0] == 0`, `ticks.last() == extent`, strictly increasing;
/// - `ticks[elem_to_chunk[i]] <= i < ticks[elem_to_chunk[i] + 1]` for every
///   element `i`;
/// - `ticks.len() == chunk_count() + 1`.
#[derive(Debug, Clone)]
pub struct AxisGrid {
    ticks: Vec<usize>,
    elem_to_chunk: Vec<usize>,
    max_chunk_len: usize,
}

impl AxisGrid {
    /// Walk the foreign boundary ticks once, prepending the implicit 0 and
    /// filling the element map. `class` is the foreign class name, used in
    /// error messages.
    pub fn new(extent: usize, boundaries: &[usize], class: &str) -> Result<Self> {
        let mut ticks = Vec::with_capacity(boundaries.len() + 1);
        ticks.push(0);
        let mut elem_to_chunk = vec![0usize; extent];
        let mut max_chunk_len = 0usize;

        for (chunk, &tick) in boundaries.iter().enumerate() {
            let previous = *ticks.last().unwrap_or(&0);
            if tick <= previous {
                return Err(Error::MalformedChunkGrid {
                    class: class.to_string(),
                    reason: "boundaries are not strictly increasing".to_string(),
                });
            }
            if tick > extent {
                return Err(Error::MalformedChunkGrid {
                    class: class.to_string(),
                    reason: format!("boundary {tick} exceeds the axis extent {extent}"),
                });
            }
            for entry in &mut elem_to_chunk[previous..tick] {
                *entry = chunk;
            }
            if tick - previous > max_chunk_len {
                max_chunk_len = tick - previous;
            }
            ticks.push(tick);
        }

        if *ticks.last().unwrap_or(&0) != extent {
            return Err(Error::MalformedChunkGrid {
                class: class.to_string(),
                reason: format!("final boundary does not equal the axis extent {extent}"),
            });
        }

        Ok(Self {
            ticks,
            elem_to_chunk,
            max_chunk_len,
        })
    }

    /// Total number of elements along this axis.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> usize {
        self.elem_to_chunk.len()
    }

    /// Number of chunks along this axis.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.ticks.len() - 1
    }

    /// Chunk id holding element `i`.
    #[inline]
    #[must_use]
    pub fn chunk_of(&self, i: usize) -> usize {
        self.elem_to_chunk[i]
    }

    /// Half-open element range of chunk `c`.
    #[inline]
    #[must_use]
    pub fn chunk_range(&self, c: usize) -> Range<usize> {
        self.ticks[c]..self.ticks[c + 1]
    }

    /// Extent of the largest chunk; every slab is sized for this.
    #[inline]
    #[must_use]
    pub fn max_chunk_len(&self) -> usize {
        self.max_chunk_len
    }

    /// Boundary ticks, including the leading 0 and trailing extent.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> &[usize] {
        &self.ticks
    }
}

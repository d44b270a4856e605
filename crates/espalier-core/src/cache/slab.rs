//! Slab buffers and the factories that allocate them.
//!
//! A slab is the in-memory materialization of one chunk: a target-major
//! dense buffer, or per-row compressed index/value arrays with counts. Every
//! slab produced by one factory has the same capacity, sized for the largest
//! chunk along the target axis.

/// A dense slab: `target_length * non_target_length` cached values in
/// target-major order.
#[derive(Debug)]
pub struct DenseSlab {
    data: Vec<f64>,
}

impl DenseSlab {
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Allocates uniformly sized dense slabs.
#[derive(Debug, Clone, Copy)]
pub struct DenseSlabFactory {
    slab_elements: usize,
}

impl DenseSlabFactory {
    #[must_use]
    pub fn new(slab_elements: usize) -> Self {
        Self { slab_elements }
    }

    #[must_use]
    pub fn create(&self) -> DenseSlab {
        DenseSlab {
            data: vec![0.0; self.slab_elements],
        }
    }
}

/// A sparse slab: per-target-row value and index storage with a running
/// count, each row reserving space for up to `row_capacity` entries.
///
/// The value or index arrays are left empty when the extraction does not
/// need them; counts are always tracked.
#[derive(Debug)]
pub struct SparseSlab {
    values: Vec<f64>,
    indices: Vec<usize>,
    counts: Vec<usize>,
    row_capacity: usize,
}

impl SparseSlab {
    /// Zero the counts of the first `rows` rows before (re)populating.
    pub fn reset(&mut self, rows: usize) {
        for count in &mut self.counts[..rows] {
            *count = 0;
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self, row: usize) -> usize {
        self.counts[row]
    }

    #[inline]
    #[must_use]
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_indices(&self) -> bool {
        !self.indices.is_empty()
    }

    /// The stored values of `row`, in insertion order.
    #[inline]
    #[must_use]
    pub fn values_row(&self, row: usize) -> &[f64] {
        let start = row * self.row_capacity;
        &self.values[start..start + self.counts[row]]
    }

    /// The stored non-target indices of `row`, in insertion order.
    #[inline]
    #[must_use]
    pub fn indices_row(&self, row: usize) -> &[usize] {
        let start = row * self.row_capacity;
        &self.indices[start..start + self.counts[row]]
    }

    /// Append one entry to `row`. The caller guarantees the row count stays
    /// within `row_capacity`; the slice indexing enforces it.
    #[inline]
    pub fn push(&mut self, row: usize, index: usize, value: f64) {
        let at = row * self.row_capacity + self.counts[row];
        if !self.values.is_empty() {
            self.values[at] = value;
        }
        if !self.indices.is_empty() {
            self.indices[at] = index;
        }
        self.counts[row] += 1;
    }

    /// Overwrite the count of `row` directly, for column-target decoding
    /// where a whole leaf lands in one row at once.
    #[inline]
    pub fn set_count(&mut self, row: usize, count: usize) {
        self.counts[row] = count;
    }

    /// Mutable value storage of `row`, full capacity.
    #[inline]
    pub fn values_row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.row_capacity;
        &mut self.values[start..start + self.row_capacity]
    }

    /// Mutable index storage of `row`, full capacity.
    #[inline]
    pub fn indices_row_mut(&mut self, row: usize) -> &mut [usize] {
        let start = row * self.row_capacity;
        &mut self.indices[start..start + self.row_capacity]
    }

    #[inline]
    #[must_use]
    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }
}

/// Allocates uniformly sized sparse slabs.
#[derive(Debug, Clone, Copy)]
pub struct SparseSlabFactory {
    target_length: usize,
    row_capacity: usize,
    needs_value: bool,
    needs_index: bool,
}

impl SparseSlabFactory {
    #[must_use]
    pub fn new(
        target_length: usize,
        row_capacity: usize,
        needs_value: bool,
        needs_index: bool,
    ) -> Self {
        Self {
            target_length,
            row_capacity,
            needs_value,
            needs_index,
        }
    }

    #[must_use]
    pub fn create(&self) -> SparseSlab {
        let storage = self.target_length * self.row_capacity;
        SparseSlab {
            values: if self.needs_value {
                vec![0.0; storage]
            } else {
                Vec::new()
            },
            indices: if self.needs_index {
                vec![0; storage]
            } else {
                Vec::new()
            },
            counts: vec![0; self.target_length],
            row_capacity: self.row_capacity,
        }
    }
}

//! Access prediction for oracular extraction.

use std::sync::Arc;

/// A finite, restartable sequence of target-axis indices that will be
/// visited, in order.
pub trait Oracle: Send + Sync {
    /// Total number of predictions.
    fn total(&self) -> usize;

    /// The predicted target index at position `i`, with `i < total()`.
    fn get(&self, i: usize) -> usize;
}

/// An oracle backed by an explicit vector of predictions.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    predictions: Vec<usize>,
}

impl FixedOracle {
    #[must_use]
    pub fn new(predictions: Vec<usize>) -> Self {
        Self { predictions }
    }
}

impl Oracle for FixedOracle {
    fn total(&self) -> usize {
        self.predictions.len()
    }

    fn get(&self, i: usize) -> usize {
        self.predictions[i]
    }
}

/// An oracle predicting the consecutive run `[start, start + length)`, the
/// natural choice for a full scan along one axis.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveOracle {
    start: usize,
    length: usize,
}

impl ConsecutiveOracle {
    #[must_use]
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }
}

impl Oracle for ConsecutiveOracle {
    fn total(&self) -> usize {
        self.length
    }

    fn get(&self, i: usize) -> usize {
        self.start + i
    }
}

/// A shared oracle plus the consumption counter its owner advances.
///
/// Solo-oracular extractors advance this on every fetch; cached oracular
/// extractors keep their counter inside the slab cache instead.
pub(crate) struct OracleStream {
    oracle: Arc<dyn Oracle>,
    position: usize,
}

impl OracleStream {
    pub(crate) fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            position: 0,
        }
    }

    /// Consume and return the next prediction.
    pub(crate) fn advance(&mut self) -> usize {
        let i = self.oracle.get(self.position);
        self.position += 1;
        i
    }
}

//! Oracle-driven slab cache.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::Result;
use crate::oracle::Oracle;

/// A slab cache that batches misses by looking ahead in an oracle.
///
/// Each [`next`](Self::next) call consumes exactly one prediction. When the
/// scheduled window is exhausted, the cache walks ahead in the oracle by up
/// to `max_slabs` distinct chunk ids, retires slabs whose chunks left the
/// window, and asks `populate` to fill all missing chunks in one batch,
/// sorted by ascending chunk id so the foreign target selection stays
/// monotonic.
pub struct OracularSlabCache<S> {
    oracle: Arc<dyn Oracle>,
    position: usize,
    max_slabs: usize,
    slabs: HashMap<usize, S>,
    pending: VecDeque<(usize, usize)>,
    free: Vec<S>,
}

impl<S> OracularSlabCache<S> {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, max_slabs: usize) -> Self {
        assert!(
            max_slabs > 0,
            "an oracular cache needs room for at least one slab"
        );
        Self {
            oracle,
            position: 0,
            max_slabs,
            slabs: HashMap::with_capacity(max_slabs),
            pending: VecDeque::new(),
            free: Vec::new(),
        }
    }

    /// Serve the slab and intra-slab offset of the next predicted index.
    ///
    /// `identify` maps a predicted target index to `(chunk id, offset within
    /// the chunk)`; `create` allocates a slab; `populate` fills a batch of
    /// `(chunk id, slab)` pairs, presorted by ascending id, with one
    /// boundary call. If population fails, the batch slabs return to the
    /// free list and the prediction window rewinds so the same predictions
    /// are retried on the next call.
    pub fn next<I, C, P>(&mut self, identify: I, create: C, populate: P) -> Result<(&S, usize)>
    where
        I: Fn(usize) -> (usize, usize),
        C: FnMut() -> S,
        P: FnOnce(&mut [(usize, S)]) -> Result<()>,
    {
        if self.pending.is_empty() {
            self.refill(identify, create, populate)?;
        }

        let (id, offset) = self
            .pending
            .pop_front()
            .expect("oracle predictions exhausted");
        let slab = self.slabs.get(&id).expect("scheduled chunk is resident");
        Ok((slab, offset))
    }

    fn refill<I, C, P>(&mut self, identify: I, mut create: C, populate: P) -> Result<()>
    where
        I: Fn(usize) -> (usize, usize),
        C: FnMut() -> S,
        P: FnOnce(&mut [(usize, S)]) -> Result<()>,
    {
        let window_start = self.position;
        let mut window: HashSet<usize> = HashSet::with_capacity(self.max_slabs);

        while self.position < self.oracle.total() {
            let predicted = self.oracle.get(self.position);
            let (id, offset) = identify(predicted);
            if !window.contains(&id) {
                if window.len() == self.max_slabs {
                    break;
                }
                window.insert(id);
            }
            self.pending.push_back((id, offset));
            self.position += 1;
        }

        // Slabs whose chunks fell out of the look-ahead window are free for
        // reassignment.
        let retired: Vec<usize> = self
            .slabs
            .keys()
            .filter(|id| !window.contains(*id))
            .copied()
            .collect();
        for id in retired {
            if let Some(slab) = self.slabs.remove(&id) {
                self.free.push(slab);
            }
        }

        let mut missing: Vec<usize> = window
            .iter()
            .filter(|id| !self.slabs.contains_key(*id))
            .copied()
            .collect();
        missing.sort_unstable();

        if missing.is_empty() {
            return Ok(());
        }
        tracing::debug!(batch = missing.len(), "populating oracular slab batch");

        let mut batch: Vec<(usize, S)> = missing
            .into_iter()
            .map(|id| (id, self.free.pop().unwrap_or_else(&mut create)))
            .collect();

        match populate(&mut batch) {
            Ok(()) => {
                for (id, slab) in batch {
                    self.slabs.insert(id, slab);
                }
                Ok(())
            }
            Err(e) => {
                self.free.extend(batch.into_iter().map(|(_, slab)| slab));
                self.pending.clear();
                self.position = window_start;
                Err(e)
            }
        }
    }
}

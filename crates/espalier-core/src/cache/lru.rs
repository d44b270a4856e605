//! Least-recently-used slab cache.

use crate::error::Result;

/// An LRU cache of slabs keyed by chunk id.
///
/// Holds at most `max_slabs` entries; insertion beyond that evicts the least
/// recently used slab and reuses its buffer. Entries are kept in recency
/// order in a small vector, which beats a map for the slab counts a byte
/// budget allows.
#[derive(Debug)]
pub struct LruSlabCache<S> {
    max_slabs: usize,
    entries: Vec<(usize, S)>,
}

impl<S> LruSlabCache<S> {
    #[must_use]
    pub fn new(max_slabs: usize) -> Self {
        assert!(max_slabs > 0, "an LRU cache needs room for at least one slab");
        Self {
            max_slabs,
            entries: Vec::with_capacity(max_slabs),
        }
    }

    /// Fetch the slab for chunk `id`, creating and populating it on a miss.
    ///
    /// `create` allocates a fresh slab when the cache is not yet full;
    /// otherwise the evicted slab's buffer is reused and handed to
    /// `populate(id, slab)` for overwriting. If population fails the slab is
    /// discarded and the cache is left without an entry for `id`, so a miss
    /// that fails is a miss next time.
    pub fn find<C, P>(&mut self, id: usize, create: C, populate: P) -> Result<&S>
    where
        C: FnOnce() -> S,
        P: FnOnce(usize, &mut S) -> Result<()>,
    {
        if let Some(pos) = self.entries.iter().position(|(key, _)| *key == id) {
            let entry = self.entries.remove(pos);
            self.entries.push(entry);
            return Ok(&self.entries.last().expect("just pushed").1);
        }

        let mut slab = if self.entries.len() == self.max_slabs {
            tracing::trace!(id, "evicting least recently used slab");
            self.entries.remove(0).1
        } else {
            create()
        };
        populate(id, &mut slab)?;
        self.entries.push((id, slab));
        Ok(&self.entries.last().expect("just pushed").1)
    }

    /// Number of resident slabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

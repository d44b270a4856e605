//! Conversion of a byte budget into a slab count.

use crate::error::{Error, Result};

/// How many slabs of which size a cache may hold.
///
/// All slabs share one shape, sized for the largest chunk along the target
/// axis; irregular chunks leave tail rows unused rather than forcing
/// reallocation.
#[derive(Debug, Clone, Copy)]
pub struct SlabPlan {
    /// Elements per slab: `target_length * non_target_length`.
    pub slab_elements: usize,
    /// Upper bound on resident slabs. Zero selects the solo (uncached) core.
    pub max_slabs: usize,
}

impl SlabPlan {
    /// Derive the plan from the cache byte budget.
    ///
    /// `target_length` is the maximum chunk extent along the target axis,
    /// `target_num_slabs` the number of distinct chunks along it (an upper
    /// bound on useful residency), and `element_size` the bytes cached per
    /// slab element. With `require_minimum_cache`, a budget too small for
    /// even one slab is raised so a single chunk spanning the whole
    /// non-target selection stays resident, which keeps consecutive scans
    /// from thrashing.
    pub fn new(
        target_length: usize,
        non_target_length: usize,
        target_num_slabs: usize,
        cache_size_bytes: usize,
        element_size: usize,
        require_minimum_cache: bool,
    ) -> Result<Self> {
        let slab_elements = target_length.checked_mul(non_target_length).ok_or_else(|| {
            Error::CapacityOverflow {
                reason: format!("slab of {target_length} x {non_target_length} elements"),
            }
        })?;
        let slab_bytes = slab_elements
            .checked_mul(element_size)
            .ok_or_else(|| Error::CapacityOverflow {
                reason: format!("slab of {slab_elements} elements at {element_size} bytes each"),
            })?;

        let mut max_slabs = if slab_bytes == 0 {
            target_num_slabs
        } else {
            (cache_size_bytes / slab_bytes).min(target_num_slabs)
        };
        if require_minimum_cache && max_slabs == 0 && target_num_slabs > 0 {
            max_slabs = 1;
        }

        tracing::debug!(
            target_length,
            non_target_length,
            slab_bytes,
            max_slabs,
            "sized slab cache"
        );

        Ok(Self {
            slab_elements,
            max_slabs,
        })
    }
}

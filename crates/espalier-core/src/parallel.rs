//! Parallel driver and the process-wide host lock.
//!
//! All entry into the host runtime is serialized against a single mutex so
//! that at most one boundary call is in flight across the whole process.
//! Numeric work between boundary calls runs outside the lock.

use parking_lot::ReentrantMutex;
use rayon::prelude::*;
use std::sync::OnceLock;

static DEFAULT_HOST_LOCK: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());
static INSTALLED_HOST_LOCK: OnceLock<&'static ReentrantMutex<()>> = OnceLock::new();

/// Install a shared host lock instance.
///
/// Applications that load several copies of this engine (e.g. through
/// multiple extension modules) can point them all at one mutex so their
/// boundary calls serialize against each other. The first installation
/// wins and returns true; install before any boundary call is made, since
/// callers that already serialized against the default lock will keep
/// using it for guards taken earlier.
pub fn install_host_lock(lock: &'static ReentrantMutex<()>) -> bool {
    INSTALLED_HOST_LOCK.set(lock).is_ok()
}

/// The process-wide host lock, lazily defaulting to a local instance.
#[must_use]
pub fn host_lock() -> &'static ReentrantMutex<()> {
    INSTALLED_HOST_LOCK
        .get()
        .copied()
        .unwrap_or(&DEFAULT_HOST_LOCK)
}

/// Run `f` while holding the host lock.
///
/// The lock is reentrant, so a thread already inside a serialized section
/// may serialize again; this mirrors interpreter-lock semantics where
/// re-acquisition from the owning thread is a no-op.
pub fn serialize<R>(f: impl FnOnce() -> R) -> R {
    let _guard = host_lock().lock();
    f()
}

/// Apply `f` to contiguous task ranges across up to `threads` workers.
///
/// `f` receives `(worker, task_start, task_length)`. Tasks are partitioned
/// into at most `threads` ranges of near-equal size and dispatched on the
/// rayon pool. Callers must not hold the host lock when invoking this;
/// workers re-enter the host runtime through [`serialize`] as needed.
pub fn parallelize<F>(tasks: usize, threads: usize, f: F)
where
    F: Fn(usize, usize, usize) + Sync,
{
    if tasks == 0 {
        return;
    }
    let threads = threads.max(1).min(tasks);
    let per_worker = tasks / threads;
    let remainder = tasks % threads;

    let mut ranges = Vec::with_capacity(threads);
    let mut start = 0usize;
    for worker in 0..threads {
        let len = per_worker + usize::from(worker < remainder);
        ranges.push((worker, start, len));
        start += len;
    }

    ranges
        .into_par_iter()
        .for_each(|(worker, task_start, task_length)| f(worker, task_start, task_length));
}

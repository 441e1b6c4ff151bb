//! Process-wide thread control for the dense linear-algebra backend.
//!
//! This is configuration, not simulation state: it affects wall-clock
//! performance of dense eigensolves and block inversions, never their
//! results. It is kept separate from the sweep's own worker count, which
//! is configured per run.

use faer::Parallelism;

/// Set the number of threads the dense backend may use.
///
/// `0` restores the backend default (use all of rayon's threads); `1`
/// forces sequential kernels, which is usually the right choice when the
/// parallelism budget is spent on sweep workers instead.
pub fn set_linalg_threads(threads: usize) {
    let parallelism = match threads {
        0 => Parallelism::Rayon(0),
        1 => Parallelism::None,
        n => Parallelism::Rayon(n),
    };
    faer::set_global_parallelism(parallelism);
}

/// Current thread setting of the dense backend (`1` = sequential).
pub fn linalg_threads() -> usize {
    match faer::get_global_parallelism() {
        Parallelism::None => 1,
        Parallelism::Rayon(n) => n,
    }
}

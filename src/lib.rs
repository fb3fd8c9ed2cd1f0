//! scan-align: crop sequential scan series at their base plane and register
//! every later series onto the first one.
//!
//! The work is split over the member crates re-exported here:
//!
//! - [`core`]: point clouds, plane types, robust estimation, errors
//! - [`point_cloud`]: plane segmentation, orientation, partitioning, normals
//! - [`registration`]: correspondence registration
//! - [`io`]: PLY files
//! - [`pipeline`]: the geometry host seam and the per-series aligner

pub use align_core as core;
pub use align_io as io;
pub use align_pipeline as pipeline;
pub use align_point_cloud as point_cloud;
pub use align_registration as registration;

/// Initialize a single global Rayon thread pool for all CPU-parallel routines
/// and return the number of worker threads.
///
/// Call this once at application startup. Repeated calls are idempotent and
/// return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `SCAN_ALIGN_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> align_core::Result<usize> {
    align_core::init_global_thread_pool(num_threads)
}

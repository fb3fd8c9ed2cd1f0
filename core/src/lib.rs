//! Core types for scan-align: the indexed point cloud snapshot, oriented
//! planes and partitions, the seeded RANSAC engine and the shared error type.

pub mod error;
pub mod geometry;
pub mod point_cloud;
pub mod robust;
pub mod runtime;

pub use error::{BoxedSource, Error, ErrorKind, Result};
pub use geometry::*;
pub use point_cloud::PointCloud;
pub use robust::{Ransac, RobustConfig, RobustModel, RobustResult};
pub use runtime::{current_cpu_threads, init_global_thread_pool};

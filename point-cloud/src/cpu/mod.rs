//! CPU-based point cloud operations
//!
//! - Plane segmentation using seeded RANSAC
//! - Plane normal orientation
//! - Above/below partitioning
//! - Normal estimation

pub mod normals;
pub mod orientation;
pub mod partition;
pub mod segmentation;

// Re-export main functionality
pub use normals::*;
pub use orientation::*;
pub use partition::*;
pub use segmentation::*;

//! 3D File I/O Module
//!
//! Reads and writes measurement series as point clouds:
//! - PLY (Polygon File Format), ASCII

pub mod ply;

pub use ply::{read_ply, read_ply_file, write_ply, write_ply_file, PlyVertices};

pub use align_core::{Error, Result};

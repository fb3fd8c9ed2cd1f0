//! Series alignment driver
//!
//! Ties the plane, partition and registration building blocks to a
//! [`GeometryHost`], the application that owns the measurement series:
//!
//! - `host`: the collaborator trait and its value types
//! - `crop`: "cut below the base plane" requests
//! - `aligner`: the per-series state machine and run loop
//! - `memory`: an in-memory host for files and tests
//! - `config`: YAML run configuration

pub mod aligner;
pub mod config;
pub mod crop;
pub mod host;
pub mod memory;

pub use aligner::{
    AlignError, AlignmentReport, SeriesAligner, SeriesFailure, SeriesOutcome, SeriesState,
};
pub use config::{AlignConfig, MarkerConfig};
pub use crop::{CropPlanner, CropRequest};
pub use host::{
    ElementHandle, GeometryHost, HostError, HostResult, PlaneMarker, RegistrationSummary,
    SeriesRef,
};
pub use memory::{Element, HostCall, MemoryHost};

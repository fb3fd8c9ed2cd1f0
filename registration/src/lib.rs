//! Point cloud registration algorithms
//!
//! This crate provides rigid registration of a measurement series onto a
//! reference series from a set of correspondence feature points:
//! - SVD (Kabsch) rigid transform from paired points
//! - Nearest-neighbour correspondence registration iterated to convergence

pub mod registration;

pub use registration::{
    estimate_rigid_transform, evaluate_registration, registration_by_correspondence,
    CorrespondenceResult, RegistrationConfig,
};

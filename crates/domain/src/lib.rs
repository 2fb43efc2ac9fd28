//! Domain layer for Wayfinder
//!
//! Contains the geospatial value objects, place and route entities, the
//! navigation state and the pure distance estimator. This layer performs no
//! I/O and defines the ubiquitous language shared by every other crate.

pub mod entities;
pub mod errors;
pub mod estimator;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use estimator::DistanceEstimator;
pub use value_objects::*;

//! Adapters layer: Concrete implementations of ports.
//!
//! - `linear`: standard scaler and logistic regression artifacts
//! - `fs_store`: model directory loader with signed-manifest verification

pub mod fs_store;
pub mod linear;

pub use fs_store::{FsArtifactStore, IntegrityPolicy};
pub use linear::{LogisticModel, StandardScaler};

//! Application layer: Use cases and services.
//!
//! Wires the domain schemas to the model ports: the registry owns the loaded
//! artifacts, the scorer runs one domain's inference and the pipeline drives
//! all three domains per request.

mod pipeline;
mod registry;
mod scorer;

pub use pipeline::RiskPipeline;
pub use registry::ModelRegistry;
pub use scorer::RiskScorer;

//! Data model, error algebra, and pluggable-component traits shared by the
//! rest of the axiom workspace.

pub mod config;
pub mod errors;
pub mod model;
pub mod traits;

pub use config::CoreConfig;
pub use errors::{AxiomError, AxiomResult};
pub use model::{
    Edge, Frame, NodeAttrValue, NodeId, ProcessedStream, RawStream, StepFeatures, TopNode,
};

//! Data model registry, DAG compiler/executor, and the per-request query
//! execution context (components C3/C4/C5).

pub mod compile;
pub mod context;
pub mod dag;
pub mod error;
pub mod imperative;
pub mod node;
pub mod registry;

pub use context::QueryExecutionContext;
pub use dag::{Dag, ExternalConnectionResolver, NodeTiming};
pub use error::DagError;
pub use imperative::ImperativeModel;
pub use node::{ModelConfig, ModelNode, ModelType, QueryArtifact};
pub use registry::ModelRegistry;

//! Dataset/dashboard orchestration (C6): ties together parameter
//! resolution (C1/C2), the model DAG (C3/C4/C5), and the result cache
//! (C7) behind the `get_dataset` entry point.

pub mod get_dataset;
pub mod orientation;
pub mod project;

pub use get_dataset::{get_dataset, GetDatasetRequest};
pub use orientation::{paginate_and_orient, DataDetails, DatasetResultModel, FieldSchema, Orientation, SchemaModel};
pub use project::{DashboardDef, DatasetDef, ProjectDefinition};

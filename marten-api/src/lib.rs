//! Request-handler surface (C8, §4.8, §6): reserved key/header
//! normalization plus thin, framework-agnostic handler functions over the
//! orchestrator. Wiring these into axum routes (or any other framework)
//! is left to the embedding application.

pub mod handlers;
pub mod headers;
pub mod reserved;

pub use handlers::{
    dashboard, dashboard_parameters, data_catalog, dataset, elevated_configurables, resolve_parameters, DataCatalogEntry,
    DatasetResponse,
};
pub use reserved::ReservedKeys;

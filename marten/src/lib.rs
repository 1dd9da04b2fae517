//! Marten — a declarative analytics API engine.
//!
//! This facade crate re-exports the `marten-*` sub-crates behind feature
//! flags. Import everything with:
//!
//! ```ignore
//! use marten::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature        | Default | Crate                 |
//! |----------------|---------|------------------------|
//! | `params`       | **yes** | `marten-params` (C1/C2) |
//! | `dag`          | **yes** | `marten-dag` (C3/C4/C5) |
//! | `cache`        | **yes** | `marten-cache` (C7)     |
//! | `orchestrator` | **yes** | `marten-orchestrator` (C6) |
//! | `api`          | **yes** | `marten-api` (C8)       |
//! | `full`         | no      | All of the above        |

pub extern crate marten_core;

#[cfg(feature = "params")]
pub extern crate marten_params;

#[cfg(feature = "dag")]
pub extern crate marten_dag;

#[cfg(feature = "cache")]
pub extern crate marten_cache;

#[cfg(feature = "orchestrator")]
pub extern crate marten_orchestrator;

#[cfg(feature = "api")]
pub extern crate marten_api;

pub use marten_core::*;

/// Unified prelude — `use marten::prelude::*` pulls in the capability
/// traits, error type, and (with the matching feature) every sub-crate's
/// public surface.
pub mod prelude {
    pub use marten_core::capability::{Authenticator, EmbeddedSql, ExternalConnection, User};
    pub use marten_core::error::MartenError;

    #[cfg(feature = "params")]
    pub use marten_params::{resolve_all, resolve_subtree, ParameterConfigSet, ParameterSet, RawSelections};

    #[cfg(feature = "dag")]
    pub use marten_dag::{Dag, ExternalConnectionResolver, ModelRegistry, QueryExecutionContext};

    #[cfg(feature = "cache")]
    pub use marten_cache::{CoalescingCache, SelectionKey};

    #[cfg(feature = "orchestrator")]
    pub use marten_orchestrator::{get_dataset, DatasetResultModel, GetDatasetRequest, Orientation, ProjectDefinition};

    #[cfg(feature = "api")]
    pub use marten_api::{dashboard, data_catalog, dataset, resolve_parameters, ReservedKeys};
}

pub mod capability;
pub mod config;
pub mod error;
pub mod logging;
pub mod numeric;
pub mod selection;
pub mod text_value;

pub use capability::{
    Authenticator, CellValue, ColumnCategory, ColumnSchema, EmbeddedSql, EngineError,
    ExternalConnection, TableResult, User,
};
pub use config::{ConfigError, ProjectConfig, RawConfig};
pub use error::MartenError;
pub use logging::{init_tracing, RequestId};
pub use selection::{SelectionTuple, SelectionValue};
pub use text_value::{PlaceholderScope, PlaceholderSink, TextValue};

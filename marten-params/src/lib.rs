//! Parameter options, configs, and the cascading parameter-set resolver
//! (components C1/C2).

pub mod config;
pub mod datasource;
pub mod error;
pub mod option;
pub mod parameter;
pub mod raw;
pub mod resolver;

pub use config::{ParamMeta, ParameterConfig, ParameterConfigSet};
pub use error::ParamsError;
pub use option::{
    DateParameterOption, DateRangeParameterOption, InputType, NumberParameterOption,
    NumberRangeParameterOption, OptionFilters, ParameterOption, SelectParameterOption,
    TextParameterOption,
};
pub use parameter::Parameter;
pub use raw::RawSelection;
pub use resolver::{resolve_all, resolve_subtree, ParameterSet, RawSelections};

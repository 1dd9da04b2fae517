use marten_core::error::{sub_codes, MartenError};

/// Internal error type for parameter resolution, converted to
/// `MartenError` the way the teacher's `DataError` converts into
/// `r2e_core::HttpError`.
#[derive(Debug)]
pub enum ParamsError {
    InvalidSelection {
        parameter: String,
        raw_value: String,
        reason: String,
    },
    UnknownParameter(String),
    ConfigurationError(String),
    AmbiguousUpdateSelection,
}

impl std::fmt::Display for ParamsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamsError::InvalidSelection {
                parameter,
                raw_value,
                reason,
            } => write!(f, "invalid selection for '{parameter}' ('{raw_value}'): {reason}"),
            ParamsError::UnknownParameter(name) => write!(f, "unknown parameter: {name}"),
            ParamsError::ConfigurationError(msg) => write!(f, "configuration error: {msg}"),
            ParamsError::AmbiguousUpdateSelection => {
                write!(f, "more than one selection key supplied to the updates endpoint")
            }
        }
    }
}

impl std::error::Error for ParamsError {}

impl From<ParamsError> for MartenError {
    fn from(err: ParamsError) -> Self {
        match err {
            ParamsError::InvalidSelection {
                parameter,
                raw_value,
                reason,
            } => MartenError::InvalidParameterSelection {
                parameter,
                raw_value,
                reason,
            },
            ParamsError::UnknownParameter(name) => {
                MartenError::configuration_error(format!("unknown parameter: {name}"))
            }
            ParamsError::ConfigurationError(msg) => MartenError::configuration_error(msg),
            ParamsError::AmbiguousUpdateSelection => MartenError::invalid_input(
                sub_codes::AMBIGUOUS_UPDATE_SELECTION,
                "more than one selection key supplied to the updates endpoint",
            ),
        }
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// The wire-level error taxonomy from the error handling design.
///
/// Each variant maps to a fixed HTTP status; the `sub_code` fields carry a
/// numeric reason the way the original project's `InvalidInputError`
/// reserved ranges of integer codes per error category, without forcing
/// API consumers to string-match messages.
pub enum MartenError {
    /// Parse/validation failure while resolving a parameter selection.
    InvalidParameterSelection {
        parameter: String,
        raw_value: String,
        reason: String,
    },
    /// Reserved query key misuse, duplicate configurables, or other
    /// request-shape issues.
    InvalidInput { sub_code: u16, message: String },
    /// Missing or invalid credential.
    Unauthorized { sub_code: u16, message: String },
    /// Scope denial from the `Authenticator`.
    Forbidden { message: String },
    /// Project-side problem discovered at runtime; never attributed to
    /// the client.
    ConfigurationError(String),
    /// Result row count exceeds the configured maximum.
    DatasetResultTooLarge { num_rows: usize, max_rows: usize },
    /// Downstream SQL or imperative model failure, attributed to a node.
    ExecutionError { model: String, message: String },
}

impl MartenError {
    pub fn configuration_error(message: impl Into<String>) -> Self {
        MartenError::ConfigurationError(message.into())
    }

    pub fn execution_error(model: impl Into<String>, message: impl Into<String>) -> Self {
        MartenError::ExecutionError {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(sub_code: u16, message: impl Into<String>) -> Self {
        MartenError::InvalidInput {
            sub_code,
            message: message.into(),
        }
    }

    /// The wire-level error code string used in the JSON body and in logs.
    pub fn code(&self) -> &'static str {
        match self {
            MartenError::InvalidParameterSelection { .. } => "invalid_parameter_selection",
            MartenError::InvalidInput { .. } => "invalid_input",
            MartenError::Unauthorized { .. } => "unauthorized",
            MartenError::Forbidden { .. } => "forbidden",
            MartenError::ConfigurationError(_) => "configuration_error",
            MartenError::DatasetResultTooLarge { .. } => "dataset_result_too_large",
            MartenError::ExecutionError { .. } => "execution_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MartenError::InvalidParameterSelection { .. } => StatusCode::BAD_REQUEST,
            MartenError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            MartenError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            MartenError::Forbidden { .. } => StatusCode::FORBIDDEN,
            MartenError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MartenError::DatasetResultTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            MartenError::ExecutionError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MartenError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = match &self {
            MartenError::InvalidParameterSelection {
                parameter,
                raw_value,
                reason,
            } => serde_json::json!({
                "error": code,
                "parameter": parameter,
                "raw_value": raw_value,
                "reason": reason,
            }),
            MartenError::DatasetResultTooLarge { num_rows, max_rows } => serde_json::json!({
                "error": code,
                "num_rows": num_rows,
                "max_rows": max_rows,
            }),
            MartenError::ExecutionError { model, message } => serde_json::json!({
                "error": code,
                "model": model,
                "message": message,
            }),
            other => serde_json::json!({ "error": code, "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for MartenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MartenError::InvalidParameterSelection {
                parameter,
                raw_value,
                reason,
            } => write!(
                f,
                "invalid selection for parameter '{parameter}' (value: '{raw_value}'): {reason}"
            ),
            MartenError::InvalidInput { sub_code, message } => {
                write!(f, "invalid input [{sub_code}]: {message}")
            }
            MartenError::Unauthorized { sub_code, message } => {
                write!(f, "unauthorized [{sub_code}]: {message}")
            }
            MartenError::Forbidden { message } => write!(f, "forbidden: {message}"),
            MartenError::ConfigurationError(message) => {
                write!(f, "configuration error: {message}")
            }
            MartenError::DatasetResultTooLarge { num_rows, max_rows } => write!(
                f,
                "dataset result too large: {num_rows} rows exceeds max of {max_rows}"
            ),
            MartenError::ExecutionError { model, message } => {
                write!(f, "execution error in model '{model}': {message}")
            }
        }
    }
}

impl std::fmt::Debug for MartenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for MartenError {}

/// Error-code sub-ranges reserved the way the original project's
/// `InvalidInputError` reserved integer ranges per category. Only the
/// ranges this workspace actually raises are listed.
pub mod sub_codes {
    /// Invalid authorization token.
    pub const INVALID_TOKEN: u16 = 1;
    /// Missing credential entirely.
    pub const MISSING_TOKEN: u16 = 0;
    /// Could not determine parent parameter for the `x_parent_param` update.
    pub const UNRESOLVABLE_PARENT_PARAM: u16 = 202;
    /// More than one key supplied to the updates endpoint.
    pub const AMBIGUOUS_UPDATE_SELECTION: u16 = 201;
    /// Duplicate `x-config-<name>` header normalization.
    pub const DUPLICATE_CONFIGURABLE_HEADER: u16 = 203;
    /// Reserved query key used incorrectly (bad orientation, negative offset, ...).
    pub const MALFORMED_RESERVED_KEY: u16 = 204;
}

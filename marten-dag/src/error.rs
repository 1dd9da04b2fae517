use marten_core::error::MartenError;

/// Internal DAG error type (§4.4, §7), converted to `MartenError` at the
/// orchestrator boundary the way `ParamsError` converts for C1/C2.
#[derive(Debug)]
pub enum DagError {
    /// Unknown model name, cycle, duplicate model names, invalid parent
    /// typing — project-side problems, never attributed to the client.
    Configuration(String),
    /// A node's compiled query or imperative callable failed.
    Execution { model: String, message: String },
}

impl DagError {
    pub fn execution(model: impl Into<String>, message: impl Into<String>) -> Self {
        DagError::Execution {
            model: model.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DagError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            DagError::Execution { model, message } => {
                write!(f, "execution error in model '{model}': {message}")
            }
        }
    }
}

impl std::error::Error for DagError {}

impl From<DagError> for MartenError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::Configuration(msg) => MartenError::configuration_error(msg),
            DagError::Execution { model, message } => MartenError::execution_error(model, message),
        }
    }
}

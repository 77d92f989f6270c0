//! Error algebra for the axiom workspace.
//!
//! Load- and construction-time failures surface here. Per-step computation
//! never returns an error: degenerate input (empty frames, zero
//! denominators) yields a neutral record instead (spec §7).

/// Top-level error type. Subsystem errors convert into this via `From`.
#[derive(Debug, thiserror::Error)]
pub enum AxiomError {
    #[error("missing required file: {0}")]
    MissingRequiredFile(String),

    #[error("malformed CSV in {file}: {source}")]
    MalformedCsv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {file}: {source}")]
    MalformedJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("unknown reporter: {0}")]
    UnknownReporter(String),

    #[error("unknown head: {0}")]
    UnknownHead(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type AxiomResult<T> = Result<T, AxiomError>;

impl From<csv::Error> for AxiomError {
    fn from(source: csv::Error) -> Self {
        AxiomError::MalformedCsv {
            file: "<unknown>".to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for AxiomError {
    fn from(source: serde_json::Error) -> Self {
        AxiomError::MalformedJson {
            file: "<unknown>".to_string(),
            source,
        }
    }
}

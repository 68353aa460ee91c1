use thiserror::Error;

#[derive(Error, Debug)]
pub enum CeViewError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("Schedd not found: {0}")]
    ScheddNotFound(String),

    #[error("No graph data for {0}")]
    GraphNotFound(String),

    #[error("Unknown graph interval: {0}")]
    UnknownInterval(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CeViewError {
    /// True when the request named something that does not exist, as opposed
    /// to a failure talking to the scheduler or rendering a page.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CeViewError::GraphNotFound(_) | CeViewError::UnknownInterval(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CeViewError>;

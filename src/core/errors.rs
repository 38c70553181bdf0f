use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio_tungstenite::tungstenite;

use crate::registry::Facet;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("WebSocket send error: {0}")]
    WebSocketSend(String),

    #[error("Rule set index {index} is out of range (registry holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cell ({row}, {column}) is outside the {facet} grid")]
    CellOutOfRange { facet: Facet, row: usize, column: usize },

    #[error("Operation not supported on the {0} facet")]
    UnsupportedFacetOperation(Facet),

    #[error("The {facet} grid is limited to {max} rows")]
    RowLimit { facet: Facet, max: usize },

    #[error("CSV error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("StudioError: {0}")]
    Custom(String),
}

impl<T> From<SendError<T>> for StudioError {
    fn from(error: SendError<T>) -> Self {
        StudioError::WebSocketSend(error.to_string())
    }
}

impl From<std::io::Error> for StudioError {
    fn from(error: std::io::Error) -> Self {
        StudioError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for StudioError {
    fn from(error: reqwest::Error) -> Self {
        StudioError::Reqwest(Box::new(error))
    }
}

impl From<tungstenite::Error> for StudioError {
    fn from(error: tungstenite::Error) -> Self {
        StudioError::WebSocket(Box::new(error))
    }
}

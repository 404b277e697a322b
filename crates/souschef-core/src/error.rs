//! Error types for SousChef.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Dialogue service error: {0}")]
    Nlu(String),

    #[error("Recipe catalog error: {0}")]
    Catalog(String),

    #[error("Chat transport error: {0}")]
    Chat(String),

    #[error("Unexpected status: {0}")]
    UnexpectedStatus(u16),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

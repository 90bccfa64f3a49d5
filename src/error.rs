//! Error type for the fallible edges of the chart engine.
//!
//! The live data path never fails: malformed input is dropped or repaired.
//! Only persistence and deserialization surface errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown drawing tool type: {0}")]
    UnknownTool(String),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, ChartError>;

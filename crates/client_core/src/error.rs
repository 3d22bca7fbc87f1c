//! Error taxonomy surfaced by the menu client.

use thiserror::Error;

/// Every variant displays its message unchanged so callers can show it to the
/// user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("{0}")]
    Fetch(String),
    #[error("{0}")]
    Submit(String),
    #[error("{0}")]
    Validation(String),
    #[error("an order submission is already in progress")]
    SubmissionInProgress,
    #[error("request cancelled")]
    Cancelled,
    #[error("{0}")]
    Config(String),
}

impl ClientError {
    pub fn empty_selection() -> Self {
        Self::Validation(EMPTY_SELECTION_PROMPT.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub const EMPTY_SELECTION_PROMPT: &str = "Please select a menu item.";

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

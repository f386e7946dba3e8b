// Error conditions surfaced by the dashboard core
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// Malformed lag, missing metric column, unsorted or duplicate dates.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The row source failed or returned nothing to compute on.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
}

impl DashboardError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

//! Error taxonomy for the held order workflow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeldOrderError {
    /// The local database could not be opened, or an operation on it failed.
    #[error("held order storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("held order payload could not be encoded or decoded: {0}")]
    Serialization(String),

    #[error("held order not found: {0}")]
    NotFound(String),

    #[error("active cart is not empty")]
    CartNotEmpty,

    #[error("cannot hold an empty cart")]
    EmptyCart,

    #[error("invalid held order request: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, HeldOrderError>;

impl HeldOrderError {
    /// Short message suitable for a toast in the sale screen.
    pub fn notification_message(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "Held orders are unavailable on this device",
            Self::Serialization(_) => "A held order could not be read",
            Self::NotFound(_) => "That held order no longer exists",
            Self::CartNotEmpty => "Finish or clear the current sale before resuming",
            Self::EmptyCart => "Add items to the cart before holding it",
            Self::Invalid(_) => "Invalid held order request",
        }
    }

    /// Toast severity. Storage problems are warnings: the sale flow continues.
    pub fn notification_level(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) | Self::Serialization(_) => "warning",
            Self::NotFound(_) | Self::CartNotEmpty | Self::EmptyCart => "info",
            Self::Invalid(_) => "error",
        }
    }
}

impl From<rusqlite::Error> for HeldOrderError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for HeldOrderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

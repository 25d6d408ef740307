use std::path::PathBuf;

use thiserror::Error;

/// Recoverable failures surfaced by the edit session.
///
/// None of these are fatal: the session is left in the state it had before
/// the failing action.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Cannot load {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("Cannot write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    EmptyHistory(&'static str),
    #[error("No image in clipboard")]
    EmptyClipboard,
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("No image loaded")]
    NoImage,
}

impl EditError {
    /// Errors the user should see in a message box rather than the status bar.
    pub fn is_dialog_worthy(&self) -> bool {
        matches!(self, EditError::Decode { .. } | EditError::Encode { .. })
    }
}

pub type EditResult<T> = Result<T, EditError>;

// errors.rs
use std::fmt;

/// Errors from the Airtable sync layer. Any of these aborts the remaining
/// sync operations; batches already applied are not rolled back.
#[derive(Debug)]
pub enum SyncError {
    Network(String),
    Api { status: u16, body: String },
    UnexpectedShape(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Network(msg) => write!(f, "Network error: {msg}"),
            SyncError::Api { status, body } => write!(f, "Airtable API error {status}: {body}"),
            SyncError::UnexpectedShape(msg) => write!(f, "Unexpected response shape: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}

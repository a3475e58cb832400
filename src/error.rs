//! Error types for the subscription tracker.

use thiserror::Error;

/// Failure type returned by change handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Returned by a listener to unregister itself.
///
/// The dispatcher removes every registration of that listener, under any
/// event name, instead of reporting a failure.
#[derive(Debug, Error)]
#[error("listener detached")]
pub struct ListenerDetached;

/// Main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A listener failed while an event was being dispatched.
    ///
    /// Handlers registered after the failing one were not invoked, and the
    /// subscription state mutation that caused the event is kept.
    #[error("handler for '{event}' failed: {source}")]
    Handler {
        event: String,
        #[source]
        source: HandlerError,
    },

    #[error("Change feed disconnected")]
    FeedClosed,

    #[error("Change feed timed out")]
    FeedTimeout,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<crossbeam_channel::RecvError> for TrackerError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        TrackerError::FeedClosed
    }
}

impl From<crossbeam_channel::RecvTimeoutError> for TrackerError {
    fn from(e: crossbeam_channel::RecvTimeoutError) -> Self {
        match e {
            crossbeam_channel::RecvTimeoutError::Timeout => TrackerError::FeedTimeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => TrackerError::FeedClosed,
        }
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

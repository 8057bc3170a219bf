//! Pipeline error types

use thiserror::Error;

/// Pipeline errors
///
/// Only resource exhaustion ends a run; bad data and sink failures are
/// counted instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Supervisor started without any source
    #[error("no sources configured")]
    NoSources,

    /// Every configured source failed to open
    #[error("none of {attempted} sources could be opened")]
    NoSourcesOpened { attempted: usize },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

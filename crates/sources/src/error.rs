//! Source errors

/// Errors raised while opening or reading a detector connection
///
/// Every variant is fatal for the one source that raised it; sibling
/// sources keep running.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Config entry names neither a path nor an address
    #[error("source {id}: no path or address configured")]
    NoEndpoint { id: String },

    /// Connection could not be established
    #[error("source {id}: failed to open {endpoint}: {source}")]
    Open {
        id: String,
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Read attempted before `open` or after `close`
    #[error("source {id} is not open")]
    NotOpen { id: String },

    /// I/O error while reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn open(id: &str, endpoint: impl Into<String>, source: std::io::Error) -> Self {
        Self::Open {
            id: id.to_string(),
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn not_open(id: &str) -> Self {
        Self::NotOpen { id: id.to_string() }
    }
}

//! Error types for the ICY client

/// Result type alias for ICY operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when connecting to or decoding an ICY stream
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, TLS, transport)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The `icy-metaint` response header is not a positive integer within
    /// [`MAX_METAINT`](crate::headers::MAX_METAINT)
    #[error("Invalid icy-metaint header: {0:?}")]
    InvalidMetaint(String),

    /// The interleaved stream is corrupt or was cut short
    #[error("Stream framing error: {0}")]
    Framing(#[from] FramingError),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// Short reads detected by [`IcyMetadataReader`](crate::IcyMetadataReader).
///
/// These are reported through `AsyncRead` as [`std::io::ErrorKind::UnexpectedEof`]
/// with this value as the inner error, so callers can recover it with
/// [`std::io::Error::get_ref`] and `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Source ended inside an audio chunk
    #[error("stream ended inside an audio chunk ({received} of {expected} bytes)")]
    TruncatedAudio { expected: usize, received: usize },

    /// Source ended where the metadata length byte was expected
    #[error("stream ended before the metadata length byte")]
    TruncatedLength,

    /// Source ended inside a metadata block
    #[error("stream ended inside a metadata block ({received} of {expected} bytes)")]
    TruncatedMetadata { expected: usize, received: usize },
}

impl Error {
    /// Create a negotiation error for a bad `icy-metaint` value
    pub fn invalid_metaint(value: impl Into<String>) -> Self {
        Self::InvalidMetaint(value.into())
    }

    /// Extract the framing error carried by an I/O error, if any.
    ///
    /// Reads on a session go through `AsyncRead`, so framing failures arrive as
    /// `std::io::Error`. This turns them back into [`Error::Framing`].
    pub fn from_read_error(err: std::io::Error) -> Self {
        match err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<FramingError>())
        {
            Some(framing) => Self::Framing(framing.clone()),
            None => Self::Io(err),
        }
    }
}

impl From<FramingError> for std::io::Error {
    fn from(err: FramingError) -> Self {
        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_keeps_framing_cause() {
        let io_err: std::io::Error = FramingError::TruncatedLength.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::UnexpectedEof);

        match Error::from_read_error(io_err) {
            Error::Framing(FramingError::TruncatedLength) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(Error::from_read_error(io_err), Error::Io(_)));
    }
}

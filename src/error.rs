//! Client error types.
//!
//! [`ClientError`] is the top-level error for the crate. The realtime core
//! never returns it across its public contract: connection failures are
//! absorbed by the reconnect state machine and surface only as state, and
//! [`TransportError`] stays inside the [`crate::ws::Transport`] seam. The
//! variants here cover configuration, uploads, and local I/O.

/// Top-level error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category      |
/// |-----------|---------------|
/// | 1000–1999 | Configuration |
/// | 2000–2999 | Upload        |
/// | 3000–3999 | Local I/O     |
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Document upload failed.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Local filesystem or terminal I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns the numeric error code for this variant.
    ///
    /// The terminal binary prints it next to the message.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidConfig(_) => 1001,
            Self::Upload(UploadError::UnsupportedMimeType(_)) => 2001,
            Self::Upload(UploadError::Rejected { .. }) => 2002,
            Self::Upload(UploadError::Http(_)) => 2003,
            Self::Io(_) => 3001,
        }
    }
}

/// Errors raised by a [`crate::ws::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The handshake with the remote endpoint failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The remote endpoint spoke something other than WebSocket.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors raised by the document upload service.
///
/// `Display` output is the user-facing string the UI shows verbatim.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The document is not of the single accepted MIME type.
    #[error("Please upload a valid PDF file.")]
    UnsupportedMimeType(String),

    /// The server answered with a non-success status.
    #[error("Upload failed.")]
    Rejected {
        /// HTTP status returned by the server.
        status: u16,
    },

    /// The request could not be built or delivered.
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

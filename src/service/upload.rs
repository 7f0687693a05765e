//! Document upload service.
//!
//! Posts a study document to the backend's upload endpoint as a multipart
//! form. Validation happens before any network I/O, and nothing here
//! touches the realtime connection.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ClientError, UploadError};

/// The only MIME type the backend ingests.
pub const ACCEPTED_MIME_TYPE: &str = "application/pdf";

/// Multipart field name the backend reads the file from.
const FILE_FIELD: &str = "file";

/// A document ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name reported to the server.
    pub file_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Builds a document from raw parts.
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a document from disk, inferring its MIME type from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self {
            file_name,
            mime_type: mime_for_path(path).to_string(),
            bytes,
        })
    }

    /// Checks the document against the accepted type.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::UnsupportedMimeType`] for anything other than
    /// exactly [`ACCEPTED_MIME_TYPE`].
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.mime_type == ACCEPTED_MIME_TYPE {
            Ok(())
        } else {
            Err(UploadError::UnsupportedMimeType(self.mime_type.clone()))
        }
    }
}

/// Guesses a MIME type from a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt" | "md") => "text/plain",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    message: Option<String>,
}

/// HTTP client for the upload endpoint.
#[derive(Debug, Clone)]
pub struct Uploader {
    http: reqwest::Client,
    endpoint: String,
}

impl Uploader {
    /// Creates an uploader posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Upload endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Validates and uploads a document.
    ///
    /// Returns the server's confirmation message, or
    /// `Successfully uploaded: <name>` when the reply carries none.
    ///
    /// # Errors
    ///
    /// - [`UploadError::UnsupportedMimeType`] before any request is made;
    /// - [`UploadError::Rejected`] for a non-success status;
    /// - [`UploadError::Http`] if the request cannot be delivered.
    pub async fn upload(&self, document: Document) -> Result<String, UploadError> {
        document.validate()?;

        let Document {
            file_name,
            mime_type,
            bytes,
        } = document;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(&mime_type)?;
        let form = reqwest::multipart::Form::new().part(FILE_FIELD, part);

        let response = self.http.post(self.endpoint.as_str()).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, file = %file_name, "upload rejected");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let message = serde_json::from_str::<UploadReply>(&body)
            .ok()
            .and_then(|reply| reply.message)
            .unwrap_or_else(|| format!("Successfully uploaded: {file_name}"));

        tracing::info!(file = %file_name, size, "document uploaded");
        Ok(message)
    }
}

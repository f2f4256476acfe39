//! Error types for the PDF Toolkit server
//!
//! Every error renders as a plain-text body carrying the message, with 400
//! for problems in the request and 500 for failures on our side.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::ocr::OcrError;
use crate::pages::PageRangeError;
use crate::pdf::PdfError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PageRange(#[from] PageRangeError),

    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("{0}")]
    Ocr(#[from] OcrError),

    /// A file in a batch failed; the batch is aborted
    #[error("Error processing {file_name}: {source}")]
    File { file_name: String, source: PdfError },

    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to build zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn file(file_name: &str, source: PdfError) -> Self {
        AppError::File {
            file_name: file_name.to_string(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::PageRange(_) => StatusCode::BAD_REQUEST,
            AppError::Pdf(e) | AppError::File { source: e, .. } => e.status_code(),
            AppError::Ocr(e) => e.status_code(),
            AppError::Multipart(e) => match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            },
            AppError::Archive(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, "{}", message);
        } else {
            tracing::debug!(status = %status, "Rejected request: {}", message);
        }

        (status, message).into_response()
    }
}

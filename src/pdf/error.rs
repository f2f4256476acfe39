//! PDF error types

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while loading, transforming or saving a PDF
#[derive(Debug, Error)]
pub enum PdfError {
    /// Bytes could not be parsed as a PDF
    #[error("Failed to parse PDF: {0}")]
    Load(String),

    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    #[error("Incorrect password")]
    InvalidPassword,

    #[error("PDF is already encrypted")]
    AlreadyEncrypted,

    #[error("PDF is not encrypted")]
    NotEncrypted,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Page {page} not found (document has {page_count} pages)")]
    PageNotFound { page: u32, page_count: u32 },

    #[error("PDF has no pages")]
    NoPages,

    /// Broken object graph (missing catalog, dangling page tree)
    #[error("Malformed PDF structure: {0}")]
    Structure(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    /// MuPDF rendering or text extraction error
    #[error("Render error: {0}")]
    Render(String),

    #[error("Image error: {0}")]
    Image(String),
}

impl PdfError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(_)
            | Self::PasswordRequired
            | Self::InvalidPassword
            | Self::AlreadyEncrypted
            | Self::NotEncrypted
            | Self::PageNotFound { .. }
            | Self::NoPages => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<mupdf::Error> for PdfError {
    fn from(err: mupdf::Error) -> Self {
        PdfError::Render(err.to_string())
    }
}

pub type PdfResult<T> = std::result::Result<T, PdfError>;

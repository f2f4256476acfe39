//! OCR Types
//!
//! Defines types for OCR processing of scanned PDF pages.

use serde::{Deserialize, Serialize};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// Tesseract OCR (local binary)
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl OcrProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Ollama => "ollama",
        }
    }

    /// Parse a provider name as sent in a form field
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "tesseract" => Some(Self::Tesseract),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OCR result for one image
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Recognized text
    pub text: String,
    /// Provider used
    pub provider: OcrProvider,
}

/// OCR result for a whole document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOcr {
    pub provider: OcrProvider,
    /// One entry per rendered page, in page order
    pub pages: Vec<String>,
    /// Pages in the document (may exceed `pages.len()` when capped)
    pub page_count: usize,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Failed to render page image: {0}")]
    ImageExtractionError(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ProviderNotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_names() {
        assert_eq!(OcrProvider::parse(" Tesseract "), Some(OcrProvider::Tesseract));
        assert_eq!(OcrProvider::parse("ollama"), Some(OcrProvider::Ollama));
        assert_eq!(OcrProvider::parse("openai"), None);
        assert_eq!(OcrProvider::Ollama.to_string(), "ollama");
        assert_eq!(
            serde_json::to_string(&OcrProvider::Tesseract).unwrap(),
            "\"tesseract\""
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            OcrError::ProviderNotAvailable("x".into()).status_code(),
            axum::http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            OcrError::ProcessingError("x".into()).status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

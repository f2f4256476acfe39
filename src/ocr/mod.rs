//! OCR Module
//!
//! Provides OCR (Optical Character Recognition) for scanned PDFs.
//!
//! Supports multiple backends:
//! - Tesseract (local, requires installation)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdf_toolkit_server::config::OcrConfig;
//! use pdf_toolkit_server::ocr::OcrService;
//!
//! let service = OcrService::new(OcrConfig::default());
//!
//! // Check available providers
//! let providers = service.available_providers().await;
//!
//! // OCR every page of a PDF with the first available provider
//! let result = service.ocr_document(pdf_bytes, None, Some("eng")).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use service::OcrService;
pub use types::{DocumentOcr, OcrError, OcrProvider, OcrResult};

#[cfg(test)]
pub(crate) use provider::MockProvider;

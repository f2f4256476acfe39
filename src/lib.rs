//! PDF Toolkit Server
//!
//! A self-hosted web service for everyday PDF chores: encrypt, decrypt,
//! merge, split, compress, rearrange, extract text and images, and OCR
//! scanned documents. Every operation takes a multipart upload and answers
//! with a file download.

pub mod archive;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pages;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;

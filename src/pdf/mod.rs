//! PDF engine façade
//!
//! Structural edits (encrypt, decrypt, merge, split, rearrange, compress,
//! image extraction) go through `lopdf`; anything that needs a renderer
//! (text layer, rasterising pages for OCR) goes through MuPDF.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdf_toolkit_server::pdf::{self, PdfDocument};
//!
//! let first = PdfDocument::load(&bytes_a, None)?;
//! let second = PdfDocument::load(&bytes_b, None)?;
//! let merged = pdf::merge(&[first, second])?.to_bytes()?;
//! ```

mod assemble;
mod document;
mod error;
mod images;
pub mod render;

pub use assemble::{extract_pages, merge, PageAssembler};
pub use document::{decrypt, encrypt, PdfDocument};
pub use error::{PdfError, PdfResult};
pub use images::{extract_images, ExtractedImage};

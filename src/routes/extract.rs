//! Content extraction endpoints: text layer and embedded images

use axum::{extract::Multipart, response::Response, routing::post, Router};

use crate::archive::ZipBundle;
use crate::error::{AppError, Result};
use crate::pdf::{self, render, PdfDocument};
use crate::state::AppState;
use crate::upload::UploadForm;

use super::{attachment, run_blocking};

/// POST /extract-text
async fn extract_text(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let password = form.password().map(str::to_string);
    let output_name = format!("{}.txt", file.stem());

    let text = run_blocking(move || {
        let bytes = readable_bytes(&file.data, password.as_deref())?;
        Ok(render::extract_text(&bytes)?)
    })
    .await?;

    tracing::info!(characters = text.len(), "Extracted text");
    Ok(attachment(text.into_bytes(), &output_name))
}

/// POST /extract-images
async fn extract_images(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let password = form.password().map(str::to_string);
    let output_name = format!("{}_images.zip", file.stem());

    let (archive, count) = run_blocking(move || {
        let document = PdfDocument::load(&file.data, password.as_deref())?;
        let images = pdf::extract_images(&document)?;
        if images.is_empty() {
            return Err(AppError::BadRequest(
                "No images found in the PDF".to_string(),
            ));
        }

        let mut bundle = ZipBundle::new();
        for image in &images {
            bundle.add(&image.name, &image.data)?;
        }
        Ok((bundle.finish()?, images.len()))
    })
    .await?;

    tracing::info!(images = count, zip_size = archive.len(), "Extracted images");
    Ok(attachment(archive, &output_name))
}

/// Bytes MuPDF can open without a password: encrypted uploads are decrypted
/// through lopdf first.
pub(crate) fn readable_bytes(data: &[u8], password: Option<&str>) -> Result<Vec<u8>> {
    let mut document = PdfDocument::load(data, password)?;
    if document.was_encrypted() {
        Ok(document.to_bytes()?)
    } else {
        Ok(data.to_vec())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/extract-text", post(extract_text))
        .route("/extract-images", post(extract_images))
}

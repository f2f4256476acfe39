//! Compression endpoint

use axum::{extract::Multipart, response::Response, routing::post, Router};

use crate::error::Result;
use crate::pdf::PdfDocument;
use crate::state::AppState;
use crate::upload::UploadForm;

use super::{attachment, run_blocking};

/// POST /compress
async fn compress_pdf(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let password = form.password().map(str::to_string);
    let output_name = format!("compressed_{}", file.file_name);
    let original_size = file.data.len();

    let compressed = run_blocking(move || {
        let mut document = PdfDocument::load(&file.data, password.as_deref())?;
        document.compress();
        Ok(document.to_bytes()?)
    })
    .await?;

    tracing::info!(
        file_name = %output_name,
        original_size,
        compressed_size = compressed.len(),
        "Compressed PDF"
    );

    Ok(attachment(compressed, &output_name))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/compress", post(compress_pdf))
}

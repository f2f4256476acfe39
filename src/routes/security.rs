//! Password protection endpoints
//!
//! Both endpoints take a batch of PDFs under `pdfs` plus one `password` and
//! answer with a zip of the processed files. The first failing file aborts
//! the batch.

use axum::{extract::Multipart, response::Response, routing::post, Router};

use crate::archive::ZipBundle;
use crate::error::{AppError, Result};
use crate::pdf::{self, PdfResult};
use crate::state::AppState;
use crate::upload::{UploadForm, UploadedFile};

use super::{attachment, run_blocking};

/// POST /encrypt
async fn encrypt_pdfs(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let (password, files) = batch_input(&form)?;
    let count = files.len();

    let archive = run_blocking(move || process_batch(&files, "encrypted_", |data| {
        pdf::encrypt(data, &password)
    }))
    .await?;

    tracing::info!(files = count, zip_size = archive.len(), "Encrypted PDFs");
    Ok(attachment(archive, "encrypted_pdfs.zip"))
}

/// POST /decrypt
async fn decrypt_pdfs(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let (password, files) = batch_input(&form)?;
    let count = files.len();

    let archive = run_blocking(move || process_batch(&files, "decrypted_", |data| {
        pdf::decrypt(data, &password)
    }))
    .await?;

    tracing::info!(files = count, zip_size = archive.len(), "Decrypted PDFs");
    Ok(attachment(archive, "decrypted_pdfs.zip"))
}

/// Password and the uploaded PDFs. Non-PDF parts are ignored, but at least
/// one PDF must remain.
fn batch_input(form: &UploadForm) -> Result<(String, Vec<UploadedFile>)> {
    let password = match form.password() {
        Some(password) if !form.files("pdfs").is_empty() => password.to_string(),
        _ => {
            return Err(AppError::BadRequest(
                "Password and files are required".to_string(),
            ))
        }
    };

    let files: Vec<UploadedFile> = form.pdf_files("pdfs").into_iter().cloned().collect();
    if files.is_empty() {
        return Err(AppError::BadRequest("No PDF files uploaded".to_string()));
    }

    Ok((password, files))
}

fn process_batch<F>(files: &[UploadedFile], prefix: &str, operation: F) -> Result<Vec<u8>>
where
    F: Fn(&[u8]) -> PdfResult<Vec<u8>>,
{
    let mut bundle = ZipBundle::new();
    for file in files {
        let output = operation(&file.data).map_err(|e| AppError::file(&file.file_name, e))?;
        tracing::debug!(file_name = %file.file_name, input_size = file.data.len(), output_size = output.len(), "Processed file");
        bundle.add(&format!("{}{}", prefix, file.file_name), &output)?;
    }
    Ok(bundle.finish()?)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/encrypt", post(encrypt_pdfs))
        .route("/decrypt", post(decrypt_pdfs))
}

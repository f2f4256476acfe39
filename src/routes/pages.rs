//! Page-level endpoints: merge, split and rearrange

use axum::{extract::Multipart, response::Response, routing::post, Router};

use crate::archive::ZipBundle;
use crate::error::{AppError, Result};
use crate::pages::{parse_page_order, parse_page_ranges};
use crate::pdf::{self, PdfDocument};
use crate::state::AppState;
use crate::upload::UploadForm;

use super::{attachment, run_blocking};

/// POST /merge
///
/// Concatenates every uploaded PDF in upload order. An optional `password`
/// is tried on encrypted inputs.
async fn merge_pdfs(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let files: Vec<_> = form.pdf_files("pdfs").into_iter().cloned().collect();
    if files.len() < 2 {
        return Err(AppError::BadRequest(
            "At least two PDF files are required to merge".to_string(),
        ));
    }
    let password = form.password().map(str::to_string);

    let (merged, pages) = run_blocking(move || {
        let documents = files
            .iter()
            .map(|file| {
                PdfDocument::load(&file.data, password.as_deref())
                    .map_err(|e| AppError::file(&file.file_name, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut merged = pdf::merge(&documents)?;
        let pages = merged.page_count();
        Ok((merged.to_bytes()?, pages))
    })
    .await?;

    tracing::info!(pages, size = merged.len(), "Merged PDFs");
    Ok(attachment(merged, "merged.pdf"))
}

/// POST /split
///
/// Each range group becomes one PDF. A single group is returned directly,
/// several are zipped.
async fn split_pdf(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let ranges = form.require_text("ranges")?.to_string();
    let password = form.password().map(str::to_string);
    let stem = file.stem().to_string();

    let mut outputs = run_blocking(move || {
        let document = PdfDocument::load(&file.data, password.as_deref())?;
        let groups = parse_page_ranges(&ranges, document.page_count())?;

        groups
            .iter()
            .map(|pages| {
                let bytes = pdf::extract_pages(&document, pages)?.to_bytes()?;
                Ok((split_file_name(&stem, pages), bytes))
            })
            .collect::<Result<Vec<_>>>()
    })
    .await?;

    tracing::info!(parts = outputs.len(), "Split PDF");

    if outputs.len() == 1 {
        if let Some((name, bytes)) = outputs.pop() {
            return Ok(attachment(bytes, &name));
        }
    }

    let archive = run_blocking(move || {
        let mut bundle = ZipBundle::new();
        for (name, bytes) in &outputs {
            bundle.add(name, bytes)?;
        }
        Ok(bundle.finish()?)
    })
    .await?;

    Ok(attachment(archive, "split_pdfs.zip"))
}

/// POST /rearrange
async fn rearrange_pdf(multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let order = form.require_text("order")?.to_string();
    let password = form.password().map(str::to_string);
    let output_name = format!("rearranged_{}", file.file_name);

    let bytes = run_blocking(move || {
        let document = PdfDocument::load(&file.data, password.as_deref())?;
        let pages = parse_page_order(&order, document.page_count())?;
        tracing::debug!(?pages, "Rearranging pages");
        Ok(pdf::extract_pages(&document, &pages)?.to_bytes()?)
    })
    .await?;

    Ok(attachment(bytes, &output_name))
}

/// `report_pages_2-5.pdf`, or `report_page_3.pdf` for a single page
fn split_file_name(stem: &str, pages: &[u32]) -> String {
    match (pages.first(), pages.last()) {
        (Some(first), Some(last)) if first != last => {
            format!("{}_pages_{}-{}.pdf", stem, first, last)
        }
        (Some(page), _) => format!("{}_page_{}.pdf", stem, page),
        _ => format!("{}.pdf", stem),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/merge", post(merge_pdfs))
        .route("/split", post(split_pdf))
        .route("/rearrange", post(rearrange_pdf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("report", &[2, 3, 4, 5]), "report_pages_2-5.pdf");
        assert_eq!(split_file_name("report", &[3]), "report_page_3.pdf");
        assert_eq!(split_file_name("report", &[]), "report.pdf");
    }
}

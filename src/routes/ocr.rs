//! OCR endpoints

use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::ocr::{DocumentOcr, OcrProvider};
use crate::pdf::render;
use crate::state::AppState;
use crate::upload::UploadForm;

use super::{attachment, extract::readable_bytes, run_blocking};

#[derive(Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<OcrProvider>,
    pub default_language: String,
}

/// GET /ocr/providers
async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.ocr().available_providers().await,
        default_language: state.config().ocr.default_language.clone(),
    })
}

/// POST /ocr
///
/// Rasterises each page and runs it through an OCR provider. Optional
/// fields: `language`, `provider`, `password`.
async fn ocr_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = UploadForm::from_multipart(multipart).await?;
    let file = form.single_pdf(&["pdf"])?.clone();
    let password = form.password().map(str::to_string);
    let language = form.text("language").map(str::to_string);
    let provider = form
        .text("provider")
        .map(|name| {
            OcrProvider::parse(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown OCR provider '{}'", name)))
        })
        .transpose()?;
    let output_name = format!("{}_ocr.txt", file.stem());

    let bytes = run_blocking(move || readable_bytes(&file.data, password.as_deref())).await?;

    let result = state
        .ocr()
        .ocr_document(bytes, provider, language.as_deref())
        .await?;

    tracing::info!(
        provider = %result.provider,
        pages = result.pages.len(),
        page_count = result.page_count,
        "OCR complete"
    );

    Ok(attachment(ocr_text(&result).into_bytes(), &output_name))
}

/// Page texts with markers, noting pages left out by the page limit
fn ocr_text(result: &DocumentOcr) -> String {
    let mut text = render::join_pages(&result.pages);
    if result.page_count > result.pages.len() {
        text.push_str(&format!(
            "\n[OCR stopped after {} of {} pages]\n",
            result.pages.len(),
            result.page_count
        ));
    }
    text
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ocr", post(ocr_pdf))
        .route("/ocr/providers", get(list_providers))
}

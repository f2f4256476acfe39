//! Route modules for the PDF Toolkit server

pub mod compress;
pub mod extract;
pub mod health;
pub mod index;
pub mod ocr;
pub mod pages;
pub mod security;

use axum::{
    extract::DefaultBodyLimit,
    http::header,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::state::AppState;

/// Build the application router with all routes and layers
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().upload.max_body_bytes();

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(index::router())
        .merge(health::router())
        .merge(security::router())
        .merge(pages::router())
        .merge(compress::router())
        .merge(extract::router())
        .merge(ocr::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// File download response
pub(crate) fn attachment(data: Vec<u8>, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type(file_name).to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(file_name)),
        ],
        data,
    )
        .into_response()
}

fn content_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `attachment` disposition with an ASCII fallback name plus the RFC 5987
/// encoded original.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"' && *c != '\\')
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    }
}

/// Run CPU-bound PDF work on the blocking pool
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("merged.pdf"), "application/pdf");
        assert_eq!(content_type("ARCHIVE.ZIP"), "application/zip");
        assert_eq!(content_type("notes.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("merged.pdf"),
            "attachment; filename=\"merged.pdf\""
        );
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_errors() {
        let ok = run_blocking(|| Ok(2 + 2)).await.unwrap();
        assert_eq!(ok, 4);

        let err = run_blocking::<(), _>(|| Err(crate::AppError::BadRequest("nope".into()))).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_router_serves_health_and_unknown_routes() {
        let app = router(AppState::new(Config::default()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! OCR Service
//!
//! Orchestrates OCR providers and rasterises PDF pages for them.

use std::sync::Arc;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, TesseractProvider},
    types::{DocumentOcr, OcrError, OcrProvider, OcrResult},
};
use crate::config::OcrConfig;
use crate::pdf::render;

/// OCR service for processing scanned PDF pages
pub struct OcrService {
    config: OcrConfig,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a service with the providers named in the configuration
    pub fn new(config: OcrConfig) -> Self {
        let providers = config
            .providers
            .iter()
            .map(|provider| -> Arc<dyn OcrProviderTrait> {
                match provider {
                    OcrProvider::Tesseract => Arc::new(TesseractProvider::new(
                        &config.tesseract_path,
                        &config.default_language,
                    )),
                    OcrProvider::Ollama => {
                        Arc::new(OllamaProvider::new(&config.ollama_url, &config.ollama_model))
                    }
                }
            })
            .collect();

        Self { config, providers }
    }

    /// Create a service with explicit provider instances
    pub fn with_providers(config: OcrConfig, providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        Self { config, providers }
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Providers to try, in order: just the preferred one if given,
    /// otherwise every available provider in configured order.
    async fn candidates(
        &self,
        preferred: Option<OcrProvider>,
    ) -> Result<Vec<Arc<dyn OcrProviderTrait>>, OcrError> {
        if let Some(preferred) = preferred {
            let provider = self
                .providers
                .iter()
                .find(|provider| provider.provider_type() == preferred)
                .ok_or_else(|| {
                    OcrError::ProviderNotAvailable(format!("{} provider is not configured", preferred))
                })?;

            if !provider.is_available().await {
                return Err(OcrError::ProviderNotAvailable(format!(
                    "{} provider is not available",
                    preferred
                )));
            }
            return Ok(vec![provider.clone()]);
        }

        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.clone());
            }
        }

        if available.is_empty() {
            return Err(OcrError::ProviderNotAvailable(
                "No OCR providers available".to_string(),
            ));
        }
        Ok(available)
    }

    /// Render every page (up to the configured limit) and OCR each one.
    ///
    /// Without a preferred provider, a page that fails is retried with the
    /// next candidate, and later pages stay with the provider that worked.
    pub async fn ocr_document(
        &self,
        pdf_bytes: Vec<u8>,
        preferred_provider: Option<OcrProvider>,
        language: Option<&str>,
    ) -> Result<DocumentOcr, OcrError> {
        let candidates = self.candidates(preferred_provider).await?;
        let lang = language.unwrap_or(&self.config.default_language);

        let scale = self.config.render_scale;
        let max_pages = self.config.max_pages;
        let (images, page_count) = tokio::task::spawn_blocking(move || {
            let count = page_count(&pdf_bytes)?;
            let images = render::render_pages(&pdf_bytes, scale, max_pages)?;
            Ok::<_, crate::pdf::PdfError>((images, count))
        })
        .await
        .map_err(|e| OcrError::ImageExtractionError(format!("Task join error: {}", e)))?
        .map_err(|e| OcrError::ImageExtractionError(e.to_string()))?;

        let mut current = 0;
        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let (used, result) = recognize_from(&candidates, current, image, lang).await?;
            current = used;
            tracing::debug!(
                page = index + 1,
                provider = %result.provider,
                characters = result.text.len(),
                "Page recognized"
            );
            pages.push(result.text);
        }

        Ok(DocumentOcr {
            provider: candidates[current].provider_type(),
            pages,
            page_count,
        })
    }
}

/// Try `candidates[start..]` in order, returning the index of the provider
/// that succeeded.
async fn recognize_from(
    candidates: &[Arc<dyn OcrProviderTrait>],
    start: usize,
    image_data: &[u8],
    language: &str,
) -> Result<(usize, OcrResult), OcrError> {
    let mut last_error = None;
    for (index, provider) in candidates.iter().enumerate().skip(start) {
        match provider.recognize(image_data, Some(language)).await {
            Ok(result) => return Ok((index, result)),
            Err(e) => {
                tracing::warn!(
                    "OCR provider {} failed: {}, trying next",
                    provider.provider_type(),
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        OcrError::ProviderNotAvailable("No OCR providers available".to_string())
    }))
}

fn page_count(pdf_bytes: &[u8]) -> crate::pdf::PdfResult<usize> {
    let document = mupdf::Document::from_bytes(pdf_bytes, "application/pdf")?;
    Ok(document.page_count()?.max(0) as usize)
}

//! Configuration management for the PDF Toolkit server

use serde::Deserialize;
use std::env;

use crate::ocr::OcrProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum request body size in megabytes
    pub max_upload_mb: usize,
}

impl UploadConfig {
    pub fn max_body_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Provider order; the first available one wins
    pub providers: Vec<OcrProvider>,
    /// Default OCR language (tesseract language code)
    pub default_language: String,
    /// Scale factor used when rasterising pages for OCR
    pub render_scale: f32,
    /// Pages beyond this limit are not OCRed
    pub max_pages: usize,
    pub tesseract_path: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            upload: UploadConfig { max_upload_mb: 50 },
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            providers: vec![OcrProvider::Tesseract, OcrProvider::Ollama],
            default_language: "eng".to_string(),
            render_scale: 2.0,
            max_pages: 50,
            tesseract_path: "tesseract".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            upload: UploadConfig {
                max_upload_mb: parse_var("MAX_UPLOAD_MB", defaults.upload.max_upload_mb)?,
            },
            ocr: OcrConfig {
                providers: match env::var("OCR_PROVIDERS") {
                    Ok(raw) => parse_providers(&raw)?,
                    Err(_) => defaults.ocr.providers,
                },
                default_language: env::var("OCR_LANGUAGE")
                    .unwrap_or(defaults.ocr.default_language),
                render_scale: parse_var("OCR_RENDER_SCALE", defaults.ocr.render_scale)?,
                max_pages: parse_var("OCR_MAX_PAGES", defaults.ocr.max_pages)?,
                tesseract_path: env::var("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("unknown OCR provider '{0}' (expected tesseract or ollama)")]
    UnknownProvider(String),
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(default),
    }
}

fn parse_providers(raw: &str) -> Result<Vec<OcrProvider>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            OcrProvider::parse(name).ok_or_else(|| ConfigError::UnknownProvider(name.to_lowercase()))
        })
        .collect()
}

//! Multipart upload collection
//!
//! Handlers drain the request's `Multipart` into an [`UploadForm`] first and
//! then look up fields by name, so field order in the form does not matter.

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, Result};

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Base name as sent by the client (path components stripped)
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".pdf")
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

/// Text fields and file parts of a multipart form, in upload order
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
}

impl UploadForm {
    /// Read every part of the request body
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            // `pdfs[]` and `pdfs` name the same list
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();

            match field.file_name().map(sanitize_file_name) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    tracing::debug!(field = %name, file_name = %file_name, size = data.len(), "Received file");
                    form.files.push((name, UploadedFile { file_name, data }));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.push((name, value));
                }
            }
        }

        Ok(form)
    }

    /// Trimmed value of a text field; blank values count as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// The `password` field, untrimmed; blank counts as absent
    pub fn password(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == "password")
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Text field that must be present
    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {}", name)))
    }

    /// Every file part uploaded under `name` with a non-empty file name
    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.files
            .iter()
            .filter(|(field, file)| field == name && !file.file_name.is_empty())
            .map(|(_, file)| file)
            .collect()
    }

    /// Non-empty `.pdf` files uploaded under `name`
    pub fn pdf_files(&self, name: &str) -> Vec<&UploadedFile> {
        self.files(name)
            .into_iter()
            .filter(|file| file.is_pdf() && !file.data.is_empty())
            .collect()
    }

    /// The first file uploaded under any of `names`, which must be a PDF
    pub fn single_pdf(&self, names: &[&str]) -> Result<&UploadedFile> {
        let file = names
            .iter()
            .find_map(|name| self.files(name).into_iter().next())
            .ok_or_else(|| AppError::BadRequest("No PDF file uploaded".to_string()))?;

        if !file.is_pdf() {
            return Err(AppError::BadRequest(format!(
                "{} is not a PDF file",
                file.file_name
            )));
        }
        if file.data.is_empty() {
            return Err(AppError::BadRequest(format!("{} is empty", file.file_name)));
        }
        Ok(file)
    }
}

/// Strip directory components and characters that would break a
/// `Content-Disposition` header.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    base.chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

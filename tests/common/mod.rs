//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use pdf_toolkit_server::config::{Config, OcrConfig};
use pdf_toolkit_server::ocr::{OcrError, OcrProvider, OcrProviderTrait, OcrResult, OcrService};
use pdf_toolkit_server::{routes, AppState};

/// Server with no OCR providers configured
pub fn server() -> TestServer {
    server_with(Config::default(), Vec::new())
}

pub fn server_with(config: Config, providers: Vec<Arc<dyn OcrProviderTrait>>) -> TestServer {
    let ocr = OcrService::with_providers(config.ocr.clone(), providers);
    let app = routes::router(AppState::with_ocr(config, ocr));
    TestServer::new(app).expect("failed to start test server")
}

/// OCR provider that answers every page with fixed text
pub struct FixedTextProvider {
    pub provider: OcrProvider,
    pub text: &'static str,
}

impl FixedTextProvider {
    pub fn tesseract(text: &'static str) -> Self {
        Self {
            provider: OcrProvider::Tesseract,
            text,
        }
    }
}

#[async_trait]
impl OcrProviderTrait for FixedTextProvider {
    fn provider_type(&self) -> OcrProvider {
        self.provider
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> Result<OcrResult, OcrError> {
        Ok(OcrResult {
            text: self.text.to_string(),
            provider: self.provider,
        })
    }
}

/// Available provider whose every recognition fails, like tesseract
/// without the requested language data
pub struct FailingProvider;

#[async_trait]
impl OcrProviderTrait for FailingProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> Result<OcrResult, OcrError> {
        Err(OcrError::ProcessingError(
            "Tesseract failed: missing language data".to_string(),
        ))
    }
}

pub fn ocr_config(max_pages: usize) -> Config {
    Config {
        ocr: OcrConfig {
            max_pages,
            render_scale: 1.0,
            ..OcrConfig::default()
        },
        ..Config::default()
    }
}

/// `page_count` pages, each showing `Page N`
pub fn text_pdf(page_count: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in 1..=page_count {
        let content = format!("BT /F1 24 Tf 72 700 Td (Page {}) Tj ET", page);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// One page showing a 2x2 raw RGB image
pub fn image_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2i64,
            "Height" => 2i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        vec![255u8, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 0],
    ));
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        b"q 200 0 0 150 100 300 cm /Im0 Do Q".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// `bytes` protected with `password` as user and owner password
pub fn encrypted(bytes: &[u8], password: &str) -> Vec<u8> {
    pdf_toolkit_server::pdf::encrypt(bytes, password).expect("failed to encrypt test PDF")
}

/// `text_pdf` with an owner password and an empty user password
pub fn owner_locked_pdf(page_count: u32) -> Vec<u8> {
    let mut doc = Document::load_mem(&text_pdf(page_count)).expect("failed to load test PDF");
    let id = b"owner-locked-fixture".to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password: "",
        key_length: 128,
        permissions: Permissions::PRINTABLE,
    })
    .expect("encryption state");
    doc.encrypt(&state).expect("failed to encrypt test PDF");

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// The `(...)` string shown on each page, in page order
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).expect("page content");
            let content = String::from_utf8_lossy(&content).into_owned();
            let start = content.find('(').expect("text start") + 1;
            let end = content.find(')').expect("text end");
            content[start..end].to_string()
        })
        .collect()
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes)
        .expect("failed to load PDF")
        .get_pages()
        .len()
}

pub fn is_encrypted(bytes: &[u8]) -> bool {
    Document::load_mem(bytes)
        .map(|doc| doc.is_encrypted())
        .unwrap_or(true)
}

/// Entry names and contents of a zip archive
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).expect("zip entry");
            let mut data = Vec::new();
            file.read_to_end(&mut data).expect("zip entry data");
            (file.name().to_string(), data)
        })
        .collect()
}

//! MuPDF-backed text layer extraction and page rasterisation.
//!
//! These functions are CPU-bound; call them from `spawn_blocking`.

use std::io::Cursor;

use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Matrix, Pixmap, TextPageOptions};
use tracing::{debug, instrument};

use super::error::{PdfError, PdfResult};

const PDF_MIME: &str = "application/pdf";

/// Marker placed before each page's text in multi-page text output
pub fn page_marker(page: usize) -> String {
    format!("--- Page {} ---", page)
}

/// Join per-page texts with page markers
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut output = String::new();
    for (index, text) in pages.into_iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&page_marker(index + 1));
        output.push('\n');
        output.push_str(text.as_ref().trim_end());
        output.push('\n');
    }
    output
}

/// Extract the text layer of every page.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn extract_text(bytes: &[u8]) -> PdfResult<String> {
    let document = mupdf::Document::from_bytes(bytes, PDF_MIME)?;
    let page_count = document.page_count()?;

    let mut pages = Vec::with_capacity(page_count.max(0) as usize);
    for index in 0..page_count {
        let page = document.load_page(index)?;
        let text_page = page.to_text_page(TextPageOptions::empty())?;
        pages.push(text_page.to_text()?);
    }

    let characters: usize = pages.iter().map(|text| text.trim().len()).sum();
    debug!(pages = page_count, characters, "Text layer extracted");
    Ok(join_pages(pages))
}

/// Rasterise up to `max_pages` pages to PNG at `scale` (1.0 = 72 DPI).
#[instrument(skip_all, fields(bytes_len = bytes.len(), scale, max_pages))]
pub fn render_pages(bytes: &[u8], scale: f32, max_pages: usize) -> PdfResult<Vec<Vec<u8>>> {
    let document = mupdf::Document::from_bytes(bytes, PDF_MIME)?;
    let page_count = document.page_count()?.max(0) as usize;
    let render_count = page_count.min(max_pages);
    if render_count < page_count {
        debug!(page_count, render_count, "Page limit reached, rendering first pages only");
    }

    let scale = scale.clamp(0.5, 4.0);
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    let mut images = Vec::with_capacity(render_count);
    for index in 0..render_count {
        let page = document.load_page(index as i32)?;
        let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;
        images.push(encode_png(&pixmap)?);
    }
    Ok(images)
}

/// Byte length of a packed RGB buffer, computed without `u32` overflow
fn rgb_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(3)
}

fn encode_png(pixmap: &Pixmap) -> PdfResult<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let pixel_count = (width as usize).saturating_mul(height as usize);
    let mut rgb_buffer = Vec::with_capacity(rgb_len(width, height));
    for pixel in 0..pixel_count {
        let offset = pixel * n;
        let r = samples.get(offset).copied().unwrap_or(0);
        let (g, b) = if n >= 3 {
            (
                samples.get(offset + 1).copied().unwrap_or(0),
                samples.get(offset + 2).copied().unwrap_or(0),
            )
        } else {
            (r, r)
        };
        rgb_buffer.extend_from_slice(&[r, g, b]);
    }

    let img = RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| PdfError::Image("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| PdfError::Image(e.to_string()))?;
    Ok(output)
}

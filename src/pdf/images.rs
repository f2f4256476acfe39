//! Embedded image extraction
//!
//! Walks the image XObjects of every page. JPEG and JPEG 2000 streams are
//! written out as-is; raw 8-bit RGB/gray samples are re-encoded as PNG.
//! Anything else (CCITT, JBIG2, indexed colour, 16-bit) is skipped.

use std::collections::HashSet;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument};

use super::document::PdfDocument;
use super::error::{PdfError, PdfResult};

/// An image pulled out of a PDF
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// Archive entry name, e.g. `page3_img1.png`
    pub name: String,
    /// 1-based page the image was first found on
    pub page: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channels {
    Gray,
    Rgb,
}

/// Extract every distinct image XObject in page order.
#[instrument(skip_all, fields(pages = document.page_count()))]
pub fn extract_images(document: &PdfDocument) -> PdfResult<Vec<ExtractedImage>> {
    let doc = document.inner();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut images = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let mut index = 0;

        for (image_id, stream) in page_images(doc, page_id) {
            if let Some(id) = image_id {
                if !seen.insert(id) {
                    continue;
                }
            }

            match encode_image(doc, stream)? {
                Some((data, extension)) => {
                    index += 1;
                    images.push(ExtractedImage {
                        name: format!("page{}_img{}.{}", page_number, index, extension),
                        page: page_number,
                        data,
                    });
                }
                None => debug!(page = page_number, ?image_id, "Skipping unsupported image encoding"),
            }
        }
    }

    debug!(count = images.len(), "Images extracted");
    Ok(images)
}

/// Image XObject streams referenced from a page's resources
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(Option<ObjectId>, &Stream)> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, value)| {
            let id = value.as_reference().ok();
            let stream = resolve(doc, value)?.as_stream().ok()?;
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .map(|name| name == b"Image")
                .unwrap_or(false);
            is_image.then_some((id, stream))
        })
        .collect()
}

/// The page's /Resources, or the nearest ancestor's
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        if depth > 64 {
            break;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().ok();
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Encode one image stream; `None` when the encoding is not supported
fn encode_image(doc: &Document, stream: &Stream) -> PdfResult<Option<(Vec<u8>, &'static str)>> {
    let filters = filter_names(&stream.dict);

    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => return Ok(Some((stream.content.clone(), "jpg"))),
        Some(b"JPXDecode") if filters.len() == 1 => return Ok(Some((stream.content.clone(), "jp2"))),
        _ => {}
    }

    let supported = filters
        .iter()
        .all(|filter| matches!(filter.as_slice(), b"FlateDecode" | b"LZWDecode"));
    if !supported {
        return Ok(None);
    }

    let dict = &stream.dict;
    let int = |key: &[u8]| dict.get(key).and_then(Object::as_i64).ok();
    let (Some(width), Some(height)) = (int(b"Width"), int(b"Height")) else {
        return Ok(None);
    };
    if int(b"BitsPerComponent").unwrap_or(8) != 8 || width <= 0 || height <= 0 {
        return Ok(None);
    }
    let Some(channels) = color_channels(doc, dict) else {
        return Ok(None);
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        match stream.decompressed_content() {
            Ok(samples) => samples,
            Err(err) => {
                debug!(%err, "Cannot decompress image stream");
                return Ok(None);
            }
        }
    };

    let (width, height) = (width as u32, height as u32);
    let image = match channels {
        Channels::Rgb => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        Channels::Gray => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
    };
    let Some(image) = image else {
        return Ok(None);
    };

    let mut output = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|err| PdfError::Image(err.to_string()))?;
    Ok(Some((output, "png")))
}

fn color_channels(doc: &Document, dict: &Dictionary) -> Option<Channels> {
    match resolve(doc, dict.get(b"ColorSpace").ok()?)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => Some(Channels::Rgb),
            b"DeviceGray" | b"CalGray" => Some(Channels::Gray),
            _ => None,
        },
        // [/ICCBased stream]: channel count is the profile's /N
        Object::Array(items) => match items.first().and_then(|obj| obj.as_name().ok()) {
            Some(b"ICCBased") => {
                let profile = resolve(doc, items.get(1)?)?.as_stream().ok()?;
                match profile.dict.get(b"N").and_then(Object::as_i64).ok()? {
                    1 => Some(Channels::Gray),
                    3 => Some(Channels::Rgb),
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

//! Page assembly: build a new document out of pages from existing ones.
//!
//! Merge, split and rearrange are all the same operation: copy a sequence of
//! pages (and everything they reference) into a fresh page tree.

use std::collections::HashMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use super::document::PdfDocument;
use super::error::{PdfError, PdfResult};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Ancestor walk limit, guards against cyclic /Parent chains
const MAX_TREE_DEPTH: usize = 64;

/// Accumulates copied pages into a new document
pub struct PageAssembler {
    target: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PageAssembler {
    pub fn new() -> Self {
        let mut target = Document::with_version("1.7");
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Append the given 1-based pages of `source`, in order.
    ///
    /// Objects shared between the appended pages (fonts, images) are copied
    /// once per call. A page listed twice is copied as two page objects.
    /// References to pages that are not appended (link destinations,
    /// annotation owners) are dropped.
    pub fn append_pages(&mut self, source: &PdfDocument, pages: &[u32]) -> PdfResult<()> {
        let mut copied: HashMap<ObjectId, ObjectId> = HashMap::new();

        // Reserve targets for the appended pages up front so links between
        // them resolve to the copies.
        let mut placements = Vec::with_capacity(pages.len());
        for &page in pages {
            let page_id = source.page_id(page)?;
            let new_page_id = self.target.new_object_id();
            copied.entry(page_id).or_insert(new_page_id);
            placements.push((page_id, new_page_id));
        }

        for (page_id, new_page_id) in placements {
            self.append_page(source.inner(), page_id, new_page_id, &mut copied)?;
        }
        Ok(())
    }

    /// Append every page of `source`
    pub fn append_document(&mut self, source: &PdfDocument) -> PdfResult<()> {
        let pages: Vec<u32> = (1..=source.page_count()).collect();
        self.append_pages(source, &pages)
    }

    /// Close the page tree and return the finished document
    pub fn finish(mut self) -> PdfResult<PdfDocument> {
        if self.kids.is_empty() {
            return Err(PdfError::NoPages);
        }

        let count = self.kids.len() as i64;
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.target.trailer.set("Root", catalog_id);

        debug!(pages = count, objects = self.target.objects.len(), "Document assembled");
        Ok(PdfDocument::from_document(self.target))
    }

    fn append_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        new_page_id: ObjectId,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> PdfResult<()> {
        let page = source.get_dictionary(page_id).map_err(|err| {
            PdfError::Structure(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        // The page's place in the source tree is rebuilt, not copied.
        let mut new_page = Dictionary::new();
        for (key, value) in page.iter().filter(|(key, _)| key.as_slice() != b"Parent") {
            if let Some(value) = self.copy_entry(source, key, value, copied) {
                new_page.set(key.clone(), value);
            }
        }
        for (key, value) in inherited_attributes(source, page) {
            if let Some(value) = self.copy_entry(source, key, &value, copied) {
                new_page.set(key.to_vec(), value);
            }
        }
        new_page.set("Parent", self.pages_id);

        self.target.objects.insert(new_page_id, Object::Dictionary(new_page));
        self.kids.push(Object::Reference(new_page_id));
        Ok(())
    }

    /// Copy one dictionary value; `None` drops the key.
    fn copy_entry(
        &mut self,
        source: &Document,
        key: &[u8],
        value: &Object,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Option<Object> {
        let value = self.copy_object(source, value, copied);
        let dangling = match &value {
            Object::Null => true,
            Object::Array(items) => {
                is_destination_key(key) && matches!(items.first(), Some(Object::Null))
            }
            _ => false,
        };
        (!dangling).then_some(value)
    }

    fn copy_object(
        &mut self,
        source: &Document,
        object: &Object,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Object {
        match object {
            Object::Reference(id) => self
                .copy_reference(source, *id, copied)
                .map_or(Object::Null, Object::Reference),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(source, dict, copied)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, item, copied))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(source, &stream.dict, copied);
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(
        &mut self,
        source: &Document,
        dict: &Dictionary,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            if let Some(value) = self.copy_entry(source, key, value, copied) {
                new_dict.set(key.clone(), value);
            }
        }
        new_dict
    }

    /// Target ID for a source object, copying it on first use. Page tree
    /// nodes that are not being appended have no copy.
    fn copy_reference(
        &mut self,
        source: &Document,
        id: ObjectId,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Option<ObjectId> {
        if let Some(&new_id) = copied.get(&id) {
            return Some(new_id);
        }

        let object = match source.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, dropping it");
                return None;
            }
        };
        if is_page_tree_node(object) {
            return None;
        }

        // Reserve the ID first so reference cycles terminate.
        let new_id = self.target.new_object_id();
        copied.insert(id, new_id);

        let object = self.copy_object(source, object, copied);
        self.target.objects.insert(new_id, object);
        Some(new_id)
    }
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

/// Keys holding an explicit destination (`[page /XYZ ...]`)
fn is_destination_key(key: &[u8]) -> bool {
    key == b"Dest" || key == b"D"
}

/// Inheritable attributes the page does not define itself, taken from the
/// nearest ancestor that does.
fn inherited_attributes(source: &Document, page: &Dictionary) -> Vec<(&'static [u8], Object)> {
    let mut found = Vec::new();
    let mut missing: Vec<&'static [u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| page.get(key).is_err())
        .collect();

    let mut current = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = current {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(parent) = source.get_dictionary(parent_id) else {
            break;
        };

        missing.retain(|key| match parent.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });

        current = parent.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    found
}

/// Concatenate the pages of every document, in order.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn merge(documents: &[PdfDocument]) -> PdfResult<PdfDocument> {
    let mut assembler = PageAssembler::new();
    for document in documents {
        assembler.append_document(document)?;
    }
    assembler.finish()
}

/// New document containing the listed 1-based pages in the listed order.
pub fn extract_pages(source: &PdfDocument, pages: &[u32]) -> PdfResult<PdfDocument> {
    let mut assembler = PageAssembler::new();
    assembler.append_pages(source, pages)?;
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{page_texts, text_pdf};

    fn load(bytes: &[u8]) -> PdfDocument {
        PdfDocument::load(bytes, None).unwrap()
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let first = load(&text_pdf(2));
        let second = load(&text_pdf(3));

        let mut merged = merge(&[first, second]).unwrap();
        assert_eq!(merged.page_count(), 5);

        let bytes = merged.to_bytes().unwrap();
        assert_eq!(
            page_texts(&bytes),
            vec!["Page 1", "Page 2", "Page 1", "Page 2", "Page 3"]
        );
    }

    #[test]
    fn test_extract_pages_reorders_and_repeats() {
        let source = load(&text_pdf(3));
        let mut result = extract_pages(&source, &[3, 1, 3]).unwrap();
        let bytes = result.to_bytes().unwrap();
        assert_eq!(page_texts(&bytes), vec!["Page 3", "Page 1", "Page 3"]);
    }

    #[test]
    fn test_extract_pages_out_of_range() {
        let source = load(&text_pdf(2));
        assert!(matches!(
            extract_pages(&source, &[1, 5]),
            Err(PdfError::PageNotFound { page: 5, .. })
        ));
    }

    #[test]
    fn test_empty_assembly_rejected() {
        assert!(matches!(PageAssembler::new().finish(), Err(PdfError::NoPages)));
    }

    /// `text_pdf(3)` with a link on page 1 pointing at page 3, and a popup
    /// annotation whose /Parent is the link.
    fn linked_pdf() -> PdfDocument {
        let mut doc = Document::load_mem(&text_pdf(3)).unwrap();
        let pages = doc.get_pages();
        let (first, third) = (pages[&1], pages[&3]);

        let link_id = doc.new_object_id();
        let popup_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Popup",
            "Parent" => link_id,
            "P" => first,
        });
        doc.objects.insert(
            link_id,
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![0.into(), 0.into(), 100.into(), 20.into()],
                "Dest" => vec![third.into(), "Fit".into()],
                "P" => first,
                "Popup" => popup_id,
            }),
        );
        doc.get_dictionary_mut(first)
            .unwrap()
            .set("Annots", vec![Object::from(link_id), Object::from(popup_id)]);

        PdfDocument::from_document(doc)
    }

    fn annotations(doc: &Document, page: u32) -> Vec<&Dictionary> {
        let page_id = doc.get_pages()[&page];
        doc.get_dictionary(page_id)
            .unwrap()
            .get(b"Annots")
            .and_then(Object::as_array)
            .unwrap()
            .iter()
            .map(|annot| doc.get_dictionary(annot.as_reference().unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_links_to_dropped_pages_are_not_followed() {
        let mut result = extract_pages(&linked_pdf(), &[1]).unwrap();
        let reloaded = Document::load_mem(&result.to_bytes().unwrap()).unwrap();

        let streams = reloaded
            .objects
            .values()
            .filter(|object| object.as_stream().is_ok())
            .count();
        assert_eq!(streams, 1);
        assert_eq!(page_texts(&result.to_bytes().unwrap()), vec!["Page 1"]);

        let annots = annotations(&reloaded, 1);
        assert!(annots[0].get(b"Dest").is_err());
        assert_eq!(annots[0].get(b"P").unwrap().as_reference().unwrap(), reloaded.get_pages()[&1]);
    }

    #[test]
    fn test_links_between_kept_pages_are_remapped() {
        let mut result = extract_pages(&linked_pdf(), &[1, 3]).unwrap();
        let reloaded = Document::load_mem(&result.to_bytes().unwrap()).unwrap();
        let pages = reloaded.get_pages();

        let annots = annotations(&reloaded, 1);
        let dest = annots[0].get(b"Dest").and_then(Object::as_array).unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), pages[&2]);

        // Popup keeps its /Parent link to the annotation
        let annot_refs = reloaded
            .get_dictionary(pages[&1])
            .and_then(|page| page.get(b"Annots"))
            .and_then(Object::as_array)
            .unwrap();
        let link_id = annot_refs[0].as_reference().unwrap();
        assert_eq!(annots[1].get(b"Parent").unwrap().as_reference().unwrap(), link_id);
    }

    #[test]
    fn test_inherited_resources_are_copied() {
        let source = load(&text_pdf(1));
        let mut result = extract_pages(&source, &[1]).unwrap();
        let bytes = result.to_bytes().unwrap();

        let reloaded = Document::load_mem(&bytes).unwrap();
        let page_id = *reloaded.get_pages().get(&1).unwrap();
        let page = reloaded.get_dictionary(page_id).unwrap();
        assert!(page.get(b"MediaBox").is_ok());
        assert!(page.get(b"Resources").is_ok());
    }
}

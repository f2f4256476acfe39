//! In-memory zip archives for multi-file downloads

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Accumulates named files and finishes into a single deflated zip buffer.
///
/// Entry names are unique: adding `report.pdf` twice stores the second one
/// as `report (2).pdf`.
pub struct ZipBundle {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl ZipBundle {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            names: HashSet::new(),
        }
    }

    /// Add an entry, returning the name it was stored under
    pub fn add(&mut self, name: &str, data: &[u8]) -> ZipResult<String> {
        let name = self.unique_name(name);
        self.writer.start_file(name.as_str(), self.options)?;
        self.writer.write_all(data)?;
        self.names.insert(name.clone());
        Ok(name)
    }

    pub fn finish(self) -> ZipResult<Vec<u8>> {
        Ok(self.writer.finish()?.into_inner())
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.names.contains(name) {
            return name.to_string();
        }

        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };

        (2..)
            .map(|n| format!("{} ({}){}", stem, n, extension))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

impl Default for ZipBundle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_bundle_entries_in_order() {
        let mut bundle = ZipBundle::new();
        bundle.add("a.pdf", b"first").unwrap();
        bundle.add("b.txt", b"second").unwrap();

        let entries = entries(bundle.finish().unwrap());
        assert_eq!(entries[0], ("a.pdf".to_string(), b"first".to_vec()));
        assert_eq!(entries[1], ("b.txt".to_string(), b"second".to_vec()));
    }

    #[test]
    fn test_duplicate_names_are_numbered() {
        let mut bundle = ZipBundle::new();
        assert_eq!(bundle.add("doc.pdf", b"1").unwrap(), "doc.pdf");
        assert_eq!(bundle.add("doc.pdf", b"2").unwrap(), "doc (2).pdf");
        assert_eq!(bundle.add("doc.pdf", b"3").unwrap(), "doc (3).pdf");
        assert_eq!(bundle.add("README", b"4").unwrap(), "README");
        assert_eq!(bundle.add("README", b"5").unwrap(), "README (2)");

        let names: Vec<_> = entries(bundle.finish().unwrap())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["doc.pdf", "doc (2).pdf", "doc (3).pdf", "README", "README (2)"]);
    }
}

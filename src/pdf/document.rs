//! In-memory PDF document handle
//!
//! Thin wrapper around `lopdf::Document` covering the whole-document
//! operations: load (with optional decryption), encrypt, compress, save.

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, ObjectId, StringFormat};
use tracing::{debug, info, instrument};

use super::error::{PdfError, PdfResult};

/// Key length for the standard security handler (RC4, revision 3)
const ENCRYPTION_KEY_LENGTH: usize = 128;

/// A parsed PDF, owned for the duration of one operation
pub struct PdfDocument {
    document: Document,
    /// Whether the source bytes were encrypted before loading
    was_encrypted: bool,
}

impl PdfDocument {
    /// Parse PDF bytes, decrypting with `password` when the file is encrypted.
    ///
    /// Files whose user password is empty (owner-only restrictions) are
    /// decrypted by the loader itself and open without a password.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), has_password = password.is_some()))]
    pub fn load(bytes: &[u8], password: Option<&str>) -> PdfResult<Self> {
        let mut document =
            Document::load_mem(bytes).map_err(|err| PdfError::Load(err.to_string()))?;

        let opened_with_empty_password = document.encryption_state.is_some();
        let needs_password = document.is_encrypted();
        if needs_password {
            let password = password.ok_or(PdfError::PasswordRequired)?;
            decrypt_in_place(&mut document, password)?;
        }

        let was_encrypted = opened_with_empty_password || needs_password;
        debug!(
            pages = document.get_pages().len(),
            was_encrypted, "PDF loaded"
        );

        Ok(Self {
            document,
            was_encrypted,
        })
    }

    /// Wrap an already-built lopdf document
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            was_encrypted: false,
        }
    }

    pub fn inner(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    pub fn was_encrypted(&self) -> bool {
        self.was_encrypted
    }

    /// Object ID of a 1-based page
    pub fn page_id(&self, page: u32) -> PdfResult<ObjectId> {
        self.document
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::PageNotFound {
                page,
                page_count: self.page_count(),
            })
    }

    /// Protect the document with `password` as both user and owner password.
    #[instrument(skip_all)]
    pub fn encrypt(&mut self, password: &str) -> PdfResult<()> {
        if self.was_encrypted || self.document.is_encrypted() {
            return Err(PdfError::AlreadyEncrypted);
        }

        self.ensure_document_id();

        let version = EncryptionVersion::V2 {
            document: &self.document,
            owner_password: password,
            user_password: password,
            key_length: ENCRYPTION_KEY_LENGTH,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version)
            .map_err(|err| PdfError::Encryption(err.to_string()))?;

        self.document
            .encrypt(&state)
            .map_err(|err| PdfError::Encryption(err.to_string()))?;

        debug!(pages = self.page_count(), "PDF encrypted");
        Ok(())
    }

    /// Rewrite the document for size: drop unreachable objects and empty
    /// streams, Flate-compress the remaining streams, renumber objects.
    #[instrument(skip_all)]
    pub fn compress(&mut self) {
        let pruned = self.document.prune_objects();
        let empty_streams = self.document.delete_zero_length_streams();
        self.document.compress();
        self.document.renumber_objects();

        debug!(
            pruned = pruned.len(),
            empty_streams = empty_streams.len(),
            "PDF compressed"
        );
    }

    /// Serialise to bytes
    pub fn to_bytes(&mut self) -> PdfResult<Vec<u8>> {
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| PdfError::Save(err.to_string()))?;
        Ok(output)
    }

    /// The standard security handler derives its key from the first trailer ID.
    fn ensure_document_id(&mut self) {
        if self.document.trailer.get(b"ID").is_ok() {
            return;
        }
        let id = uuid::Uuid::new_v4().as_bytes().to_vec();
        self.document.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
    }
}

/// Decrypt an encrypted PDF and return the unprotected bytes.
#[instrument(skip_all, fields(bytes_len = bytes.len()))]
pub fn decrypt(bytes: &[u8], password: &str) -> PdfResult<Vec<u8>> {
    let mut document = PdfDocument::load(bytes, Some(password))?;
    if !document.was_encrypted() {
        return Err(PdfError::NotEncrypted);
    }
    info!(pages = document.page_count(), "PDF decrypted");
    document.to_bytes()
}

/// Encrypt PDF bytes with `password`.
pub fn encrypt(bytes: &[u8], password: &str) -> PdfResult<Vec<u8>> {
    let mut document = match PdfDocument::load(bytes, None) {
        Err(PdfError::PasswordRequired) => return Err(PdfError::AlreadyEncrypted),
        loaded => loaded?,
    };
    document.encrypt(password)?;
    document.to_bytes()
}

fn decrypt_in_place(document: &mut Document, password: &str) -> PdfResult<()> {
    document.decrypt(password).map_err(|err| {
        debug!(error = %err, "PDF decryption failed");
        PdfError::InvalidPassword
    })?;

    // Saved output must not advertise a security handler it no longer uses.
    if let Ok(encrypt_ref) = document.trailer.get(b"Encrypt").and_then(Object::as_reference) {
        document.objects.remove(&encrypt_ref);
    }
    document.trailer.remove(b"Encrypt");
    Ok(())
}

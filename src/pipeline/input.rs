//! Input classification: raw bytes plus a kind derived from the filename.
//!
//! The caller (a web form, the CLI) hands over bytes and the name the user
//! gave the file. A `.pdf` extension selects the paged path; anything else
//! is decoded as a single raster image. The magic-byte check only sharpens
//! the error message when the two disagree; it never overrides the kind.

use std::path::Path;

/// Which decoding path a document takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A single raster image (PNG, JPEG, …), one page.
    Image,
    /// A multi-page PDF, rasterised page by page.
    Paged,
}

impl DocumentKind {
    /// Derive the kind from a user-supplied filename (case-insensitive `.pdf`).
    pub fn from_filename(filename: &str) -> DocumentKind {
        let is_pdf = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            DocumentKind::Paged
        } else {
            DocumentKind::Image
        }
    }
}

/// One submitted document. Owned by a single pipeline run.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    /// Build a document, classifying it by `filename`.
    pub fn from_upload(bytes: Vec<u8>, filename: &str) -> Self {
        Self::new(bytes, DocumentKind::from_filename(filename))
    }

    /// The first four bytes, zero-padded, for error messages.
    pub fn magic(&self) -> [u8; 4] {
        let mut magic = [0u8; 4];
        let n = self.bytes.len().min(4);
        magic[..n].copy_from_slice(&self.bytes[..n]);
        magic
    }

    /// Whether the bytes start with the `%PDF` signature.
    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

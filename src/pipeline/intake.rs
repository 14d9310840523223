//! File intake: read user-supplied statement files and classify them.
//!
//! Content sniffing comes first (`%PDF` magic, image signatures) because
//! statement exports are frequently misnamed; the extension is only a
//! fallback for formats the `image` crate does not recognise by signature
//! (HEIC photos from phones, for example). Files that are neither PDF nor
//! image are skipped rather than rejected.

use crate::error::StatementError;
use image::ImageFormat;
use std::path::Path;
use tracing::{debug, warn};

/// What kind of document a statement file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Rasterised page by page before sending.
    Pdf,
    /// Sent as-is with its own MIME type.
    Image,
}

/// A statement file loaded into memory.
#[derive(Clone)]
pub struct StatementFile {
    /// File name as supplied by the user, used in logs and errors.
    pub name: String,
    pub kind: FileKind,
    /// `application/pdf` or the image MIME type, e.g. `image/png`.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StatementFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementFile")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl StatementFile {
    /// Classify in-memory bytes. Returns `None` for unsupported content.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Option<Self> {
        let name = name.into();
        let (kind, mime_type) = detect_kind(&name, &bytes)?;
        Some(Self {
            name,
            kind,
            mime_type,
            bytes,
        })
    }
}

/// Determine the file kind and MIME type from content, then extension.
pub fn detect_kind(name: &str, bytes: &[u8]) -> Option<(FileKind, String)> {
    if bytes.starts_with(b"%PDF") {
        return Some((FileKind::Pdf, "application/pdf".to_string()));
    }
    if let Ok(format) = image::guess_format(bytes) {
        return Some((FileKind::Image, format.to_mime_type().to_string()));
    }

    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some((FileKind::Pdf, "application/pdf".to_string())),
        "heic" => Some((FileKind::Image, "image/heic".to_string())),
        "heif" => Some((FileKind::Image, "image/heif".to_string())),
        other => ImageFormat::from_extension(other)
            .map(|f| (FileKind::Image, f.to_mime_type().to_string())),
    }
}

/// Read one file from disk.
///
/// Returns `Ok(None)` when the file exists but is neither PDF nor image.
pub async fn load_file(path: &Path) -> Result<Option<StatementFile>, StatementError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(StatementError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(StatementError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    match StatementFile::from_bytes(display_name(path), bytes) {
        Some(file) => {
            debug!(
                "Loaded {} ({}, {} bytes)",
                file.name,
                file.mime_type,
                file.bytes.len()
            );
            Ok(Some(file))
        }
        None => {
            warn!("Skipping unsupported file: {}", path.display());
            Ok(None)
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Outcome of loading a batch of paths.
#[derive(Debug, Default)]
pub struct Intake {
    pub files: Vec<StatementFile>,
    /// Names of files that were skipped as unsupported.
    pub skipped: Vec<String>,
}

/// Read every path in order. The first missing or unreadable file aborts.
pub async fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Intake, StatementError> {
    let mut intake = Intake::default();
    for path in paths {
        let path = path.as_ref();
        match load_file(path).await? {
            Some(file) => intake.files.push(file),
            None => intake.skipped.push(display_name(path)),
        }
    }
    Ok(intake)
}

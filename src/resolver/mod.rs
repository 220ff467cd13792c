//! Content resolution for file references.
//!
//! The processor only needs two capabilities from the outside world:
//! reading a referenced file and naming its MIME type. Both sit behind
//! [`ContentResolver`] so evaluation stays testable without touching the
//! real filesystem, and so hosts can substitute their own resolution
//! (e.g. an editor buffer cache).

use std::io;
use std::path::Path;

/// Filesystem/MIME collaborator consumed by the processor.
pub trait ContentResolver {
    /// Read the full contents of `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Best-effort MIME type for `path`. Used only when a reference
    /// carries no `;type=` override.
    fn mime_of(&self, path: &Path) -> io::Result<String>;
}

/// The standard resolver: plain `std::fs` reads plus an extension-based
/// MIME table with a UTF-8 sniff fallback.
pub struct FsResolver;

impl ContentResolver for FsResolver {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn mime_of(&self, path: &Path) -> io::Result<String> {
        if let Some(mime) = mime_from_extension(path) {
            return Ok(mime.to_string());
        }
        // Unknown extension: sniff the content.
        let bytes = std::fs::read(path)?;
        Ok(if std::str::from_utf8(&bytes).is_ok() {
            "text/plain".to_string()
        } else {
            "application/octet-stream".to_string()
        })
    }
}

/// MIME types for the extensions that matter to providers: images, PDF,
/// and common text formats. Everything else is sniffed.
fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime)
}

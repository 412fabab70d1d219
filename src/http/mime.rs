//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use std::collections::HashMap;
use std::path::Path;

/// Content-Type used when the extension is unknown
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Get the built-in MIME Content-Type for a lowercase file extension
///
/// # Examples
/// ```
/// use rootserve::http::mime::builtin_content_type;
/// assert_eq!(builtin_content_type("html"), Some("text/html; charset=utf-8"));
/// assert_eq!(builtin_content_type("mp4"), Some("video/mp4"));
/// assert_eq!(builtin_content_type("xyz"), None);
/// ```
pub fn builtin_content_type(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // JavaScript/WASM
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    };
    Some(content_type)
}

/// Extension to Content-Type table, built once at startup
///
/// Configured overrides take precedence over the built-in mapping.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    overrides: HashMap<String, String>,
}

impl MimeTable {
    pub fn new(overrides: &HashMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(ext, ty)| (ext.trim_start_matches('.').to_ascii_lowercase(), ty.clone()))
                .collect(),
        }
    }

    /// Content-Type for an extension, `text/plain` when unknown
    pub fn get_content_type(&self, extension: Option<&str>) -> &str {
        let Some(ext) = extension.map(str::to_ascii_lowercase) else {
            return DEFAULT_CONTENT_TYPE;
        };
        if let Some(ty) = self.overrides.get(&ext) {
            return ty;
        }
        builtin_content_type(&ext).unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn for_path(&self, path: &Path) -> &str {
        self.get_content_type(path.extension().and_then(|e| e.to_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        let table = MimeTable::default();
        assert_eq!(table.get_content_type(Some("html")), "text/html; charset=utf-8");
        assert_eq!(table.get_content_type(Some("CSS")), "text/css");
        assert_eq!(table.get_content_type(Some("js")), "application/javascript");
        assert_eq!(table.for_path(Path::new("/a/b/logo.png")), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        let table = MimeTable::default();
        assert_eq!(table.get_content_type(Some("xyz")), "text/plain");
        assert_eq!(table.get_content_type(None), "text/plain");
        assert_eq!(table.for_path(Path::new("/a/Makefile")), "text/plain");
    }

    #[test]
    fn test_overrides() {
        let overrides = HashMap::from([
            (".WebManifest".to_string(), "application/manifest+json".to_string()),
            ("js".to_string(), "text/javascript".to_string()),
        ]);
        let table = MimeTable::new(&overrides);
        assert_eq!(
            table.get_content_type(Some("webmanifest")),
            "application/manifest+json"
        );
        assert_eq!(table.get_content_type(Some("js")), "text/javascript");
        assert_eq!(table.get_content_type(Some("css")), "text/css");
    }
}

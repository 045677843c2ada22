//! Image-type conformance checks.

use std::path::Path;

/// File extensions treated as images.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "tiff", "tif", "bmp", "webp", "heic", "heif", "raw", "dng",
    "cr2", "nef", "arw",
];

/// Decides whether a directory entry counts as an image file.
///
/// Stands in for the platform's type-identifier service: the scanner
/// consults it, it is never consulted by the catalog itself. The
/// default set covers common photo formats; a custom set can be
/// supplied for testing or unusual collections.
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: Vec<String>,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter {
    /// Create a filter over the default photo extensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Create a filter over a custom extension set (lowercase, without
    /// the leading dot).
    #[must_use]
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Check whether a path's extension marks it as an image.
    #[must_use]
    pub fn is_image_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
    }
}

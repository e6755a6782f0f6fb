//! Image references and decoded pixel data.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Image loading errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Result type for image loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Image format of encoded image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Where an image comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on disk.
    Path(PathBuf),
    /// Encoded image bytes held in memory, tagged with a caller-chosen name.
    Bytes { name: String, data: Arc<[u8]> },
    /// Already decoded pixels.
    Decoded { name: String, image: Arc<DecodedImage> },
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ImageSource::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            ImageSource::Decoded { name, image } => f
                .debug_struct("Decoded")
                .field("name", name)
                .field("width", &image.width)
                .field("height", &image.height)
                .finish(),
        }
    }
}

/// A handle to an image supplied by an external collaborator.
///
/// Two references are the same image when their sources are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    source: ImageSource,
}

impl ImageRef {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ImageSource::Path(path.into()),
        }
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: ImageSource::Bytes {
                name: name.into(),
                data: data.into(),
            },
        }
    }

    pub fn from_decoded(name: impl Into<String>, image: DecodedImage) -> Self {
        Self {
            source: ImageSource::Decoded {
                name: name.into(),
                image: Arc::new(image),
            },
        }
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Human-readable name for logs.
    pub fn name(&self) -> String {
        match &self.source {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { name, .. } | ImageSource::Decoded { name, .. } => name.clone(),
        }
    }
}

/// Decoded RGBA8 pixels, row-major, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl DecodedImage {
    /// Wrap RGBA8 pixels, checking the buffer length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> LoadResult<Self> {
        if width == 0 || height == 0 {
            return Err(LoadError::Empty { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(LoadError::Decode(format!(
                "expected {} bytes of RGBA8, got {}",
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// A single-colour image, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self { width, height, pixels }
    }

    /// Width divided by height, with degenerate sizes reading as square.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width.max(1) as f32 / self.height as f32
    }

    /// RGBA at a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

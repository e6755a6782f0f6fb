//! Image decoding into RGBA8.

use facade_core::image::{DecodedImage, ImageFormat, ImageRef, ImageSource, LoadError, LoadResult};

/// Decode PNG, JPEG or WebP bytes.
pub fn decode_image(data: &[u8]) -> LoadResult<DecodedImage> {
    let format = ImageFormat::from_magic_bytes(data).ok_or(LoadError::UnsupportedFormat)?;
    let image_format = match format {
        ImageFormat::Png => ::image::ImageFormat::Png,
        ImageFormat::Jpeg => ::image::ImageFormat::Jpeg,
        ImageFormat::WebP => ::image::ImageFormat::WebP,
    };
    let decoded = ::image::load_from_memory_with_format(data, image_format)
        .map_err(|e| LoadError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    DecodedImage::new(width, height, rgba.into_vec())
}

/// Resolve an image handle to pixels, reading from disk if needed.
///
/// Blocking; loaders call this off the scene thread.
pub fn load_image(image: &ImageRef) -> LoadResult<DecodedImage> {
    match image.source() {
        ImageSource::Path(path) => {
            let data = std::fs::read(path).map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
            decode_image(&data)
        }
        ImageSource::Bytes { data, .. } => decode_image(data),
        ImageSource::Decoded { image, .. } => DecodedImage::new(image.width, image.height, image.pixels.clone()),
    }
}

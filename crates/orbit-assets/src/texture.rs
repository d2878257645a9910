use std::path::Path;

use image::DynamicImage;

use crate::error::TextureDecodeError;
use crate::material::TextureRef;

/// Pixel layout of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
}

impl TextureFormat {
    /// Map a channel count to a format. Only 3 and 4 are uploadable.
    pub fn from_bytes_per_pixel(bytes_per_pixel: u32) -> Option<Self> {
        match bytes_per_pixel {
            4 => Some(TextureFormat::Rgba8),
            3 => Some(TextureFormat::Rgb8),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
        }
    }
}

/// A decoded image with tightly packed 8-bit channels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn format(&self) -> Option<TextureFormat> {
        TextureFormat::from_bytes_per_pixel(self.bytes_per_pixel)
    }
}

impl From<DynamicImage> for DecodedImage {
    /// RGB and RGBA images keep their layout; anything else becomes RGBA8.
    fn from(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (bytes_per_pixel, pixels) = match img {
            DynamicImage::ImageRgb8(rgb) => (3, rgb.into_raw()),
            DynamicImage::ImageRgba8(rgba) => (4, rgba.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self {
            width,
            height,
            bytes_per_pixel,
            pixels,
        }
    }
}

/// Decode an image file from disk.
pub fn decode_file(path: &Path) -> Result<DecodedImage, TextureDecodeError> {
    if !path.exists() {
        return Err(TextureDecodeError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| TextureDecodeError::Io(path.to_path_buf(), e))?;
    decode_bytes(&bytes, &path.display().to_string())
}

/// Decode an encoded image held in memory. `label` only feeds error messages.
pub fn decode_bytes(bytes: &[u8], label: &str) -> Result<DecodedImage, TextureDecodeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| TextureDecodeError::DecodeFailed(label.to_string(), e.to_string()))?;
    Ok(img.into())
}

/// Decode a material texture, resolving relative paths against `base_dir`.
pub fn decode_texture(texture: &TextureRef, base_dir: &Path) -> Result<DecodedImage, TextureDecodeError> {
    match texture {
        TextureRef::Path(path) if path.is_absolute() => decode_file(path),
        TextureRef::Path(path) => decode_file(&base_dir.join(path)),
        TextureRef::Embedded { data, .. } => decode_bytes(data, &texture.label()),
    }
}

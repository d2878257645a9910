//! Seams between the renderer and a graphics API.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgb, Rgba};
use orbit_assets::{DecodedImage, TextureFormat, Vertex};

use crate::error::RenderError;
use crate::pipeline::FrameTransforms;

/// Creates GPU resources. Resources are released by dropping them.
pub trait GpuDevice {
    type VertexBuffer;
    type IndexBuffer;
    type Texture;

    /// Create a static vertex buffer holding `vertices`.
    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<Self::VertexBuffer, RenderError>;

    /// Create a static index buffer holding `indices`.
    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<Self::IndexBuffer, RenderError>;

    /// Create a sampled texture from a prepared mip chain.
    fn create_texture(&mut self, upload: &TextureUpload) -> Result<Self::Texture, RenderError>;
}

/// Per-frame command recording.
pub trait DrawTarget<D: GpuDevice> {
    /// Start the frame, clearing color and depth.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), RenderError>;

    fn set_transforms(&mut self, transforms: &FrameTransforms) -> Result<(), RenderError>;

    /// Bind `texture` to `unit`; `None` binds the "no texture" fallback.
    fn bind_texture(&mut self, unit: u32, texture: Option<&D::Texture>) -> Result<(), RenderError>;

    /// Bit `n` set when unit `n` holds a real texture for the next draws.
    fn set_texture_mask(&mut self, mask: u32) -> Result<(), RenderError>;

    fn bind_geometry(
        &mut self,
        vertices: &D::VertexBuffer,
        indices: &D::IndexBuffer,
    ) -> Result<(), RenderError>;

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError>;
}

/// One level of a mip chain, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A texture ready for upload: format plus every mip level, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub format: TextureFormat,
    pub levels: Vec<MipLevel>,
}

impl TextureUpload {
    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, |level| level.width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, |level| level.height)
    }

    pub fn mip_levels(&self) -> u32 {
        self.levels.len() as u32
    }
}

/// Number of levels in a full chain down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Validate a decoded image and build its full mip chain.
pub fn build_mip_chain(image: &DecodedImage) -> Result<TextureUpload, RenderError> {
    let format = image
        .format()
        .ok_or(RenderError::UnsupportedTextureFormat(image.bytes_per_pixel))?;

    let expected = image.width as usize * image.height as usize * image.bytes_per_pixel as usize;
    if expected == 0 || image.pixels.len() != expected {
        return Err(RenderError::TextureSize {
            expected,
            actual: image.pixels.len(),
        });
    }

    let levels = match format {
        TextureFormat::Rgba8 => downsample::<Rgba<u8>>(image),
        TextureFormat::Rgb8 => downsample::<Rgb<u8>>(image),
    }?;

    Ok(TextureUpload { format, levels })
}

fn downsample<P>(image: &DecodedImage) -> Result<Vec<MipLevel>, RenderError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let base: ImageBuffer<P, Vec<u8>> =
        ImageBuffer::from_raw(image.width, image.height, image.pixels.clone())
            .ok_or(RenderError::TextureSize {
                expected: image.width as usize * image.height as usize * P::CHANNEL_COUNT as usize,
                actual: image.pixels.len(),
            })?;

    let count = mip_level_count(image.width, image.height);
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(MipLevel {
        width: image.width,
        height: image.height,
        pixels: base.as_raw().clone(),
    });

    for level in 1..count {
        let width = (image.width >> level).max(1);
        let height = (image.height >> level).max(1);
        let scaled = imageops::resize(&base, width, height, FilterType::Triangle);
        levels.push(MipLevel {
            width,
            height,
            pixels: scaled.into_raw(),
        });
    }

    Ok(levels)
}

use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;

use orbit_assets::{TextureFormat, Vertex};
use vulkano::{
    buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    command_buffer::{
        allocator::CommandBufferAllocator, AutoCommandBufferBuilder, BufferImageCopy,
        CommandBufferUsage, CopyBufferToImageInfo, PrimaryCommandBufferAbstract,
    },
    device::Queue,
    format::Format,
    image::{view::ImageView, Image, ImageCreateInfo, ImageSubresourceLayers, ImageType, ImageUsage},
    memory::allocator::{AllocationCreateInfo, MemoryAllocator, MemoryTypeFilter},
    sync::GpuFuture,
    DeviceSize,
};

use super::context::VulkanContext;
use crate::backend::{GpuDevice, TextureUpload};
use crate::error::RenderError;
use crate::vertex::ShaderVertex;

/// Creates device-local buffers and sampled images.
///
/// Texture uploads are submitted immediately and waited on, so a texture is
/// ready to sample as soon as `create_texture` returns.
pub struct VulkanDevice {
    memory_allocator: Arc<dyn MemoryAllocator>,
    command_buffer_allocator: Arc<dyn CommandBufferAllocator>,
    queue: Arc<Queue>,
}

impl VulkanDevice {
    pub fn new(context: &VulkanContext) -> Self {
        Self {
            memory_allocator: context.memory_allocator.clone(),
            command_buffer_allocator: context.command_buffer_allocator.clone(),
            queue: context.queue.clone(),
        }
    }

    fn device_buffer_info() -> AllocationCreateInfo {
        AllocationCreateInfo {
            memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
            ..Default::default()
        }
    }
}

impl GpuDevice for VulkanDevice {
    type VertexBuffer = Subbuffer<[ShaderVertex]>;
    type IndexBuffer = Subbuffer<[u32]>;
    type Texture = Arc<ImageView>;

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<Self::VertexBuffer, RenderError> {
        if vertices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }

        Buffer::from_iter(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage: BufferUsage::VERTEX_BUFFER,
                ..Default::default()
            },
            Self::device_buffer_info(),
            vertices.iter().map(ShaderVertex::from),
        )
        .map_err(upload_err)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> Result<Self::IndexBuffer, RenderError> {
        if indices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }

        Buffer::from_iter(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage: BufferUsage::INDEX_BUFFER,
                ..Default::default()
            },
            Self::device_buffer_info(),
            indices.iter().copied(),
        )
        .map_err(upload_err)
    }

    fn create_texture(&mut self, upload: &TextureUpload) -> Result<Self::Texture, RenderError> {
        let (width, height) = (upload.width(), upload.height());
        if width == 0 || height == 0 || upload.levels.is_empty() {
            return Err(RenderError::TextureSize {
                expected: 1,
                actual: 0,
            });
        }

        // Every level goes into one staging buffer; regions point at each level.
        let mut staging = Vec::new();
        let mut offsets = Vec::with_capacity(upload.levels.len());
        for level in &upload.levels {
            offsets.push(staging.len() as DeviceSize);
            staging.extend_from_slice(&rgba_pixels(upload.format, &level.pixels));
        }

        let image = Image::new(
            self.memory_allocator.clone(),
            ImageCreateInfo {
                image_type: ImageType::Dim2d,
                format: Format::R8G8B8A8_UNORM,
                extent: [width, height, 1],
                mip_levels: upload.mip_levels(),
                array_layers: 1,
                usage: ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
                ..Default::default()
            },
            AllocationCreateInfo::default(),
        )
        .map_err(upload_err)?;

        let buffer: Subbuffer<[u8]> = Buffer::from_iter(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage: BufferUsage::TRANSFER_SRC,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_HOST
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            staging,
        )
        .map_err(upload_err)?;

        let regions: Vec<BufferImageCopy> = upload
            .levels
            .iter()
            .zip(offsets)
            .enumerate()
            .map(|(mip_level, (level, buffer_offset))| BufferImageCopy {
                buffer_offset,
                image_subresource: ImageSubresourceLayers {
                    mip_level: mip_level as u32,
                    ..image.subresource_layers()
                },
                image_extent: [level.width, level.height, 1],
                ..Default::default()
            })
            .collect();

        let mut builder = AutoCommandBufferBuilder::primary(
            self.command_buffer_allocator.clone(),
            self.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(upload_err)?;

        builder
            .copy_buffer_to_image(CopyBufferToImageInfo {
                regions: regions.into(),
                ..CopyBufferToImageInfo::buffer_image(buffer, image.clone())
            })
            .map_err(upload_err)?;

        builder
            .build()
            .map_err(upload_err)?
            .execute(self.queue.clone())
            .map_err(upload_err)?
            .then_signal_fence_and_flush()
            .map_err(upload_err)?
            .wait(None)
            .map_err(upload_err)?;

        ImageView::new_default(image).map_err(upload_err)
    }
}

fn upload_err(e: impl Display) -> RenderError {
    RenderError::Upload(e.to_string())
}

/// Three-channel images have no widely sampleable Vulkan format; pad them to RGBA.
fn rgba_pixels(format: TextureFormat, pixels: &[u8]) -> Cow<'_, [u8]> {
    match format {
        TextureFormat::Rgba8 => Cow::Borrowed(pixels),
        TextureFormat::Rgb8 => Cow::Owned(
            pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_passthrough() {
        let pixels = [1, 2, 3, 4, 5, 6, 7, 8];
        assert!(matches!(
            rgba_pixels(TextureFormat::Rgba8, &pixels),
            Cow::Borrowed(p) if p == &pixels[..]
        ));
    }

    #[test]
    fn test_rgb_expanded_with_opaque_alpha() {
        let pixels = [10, 20, 30, 40, 50, 60];
        assert_eq!(
            &*rgba_pixels(TextureFormat::Rgb8, &pixels),
            &[10, 20, 30, 255, 40, 50, 60, 255]
        );
    }
}

use std::fmt::Display;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3};
use vulkano::{
    buffer::Subbuffer,
    command_buffer::{
        AutoCommandBufferBuilder, PrimaryAutoCommandBuffer, RenderPassBeginInfo, SubpassBeginInfo,
        SubpassContents, SubpassEndInfo,
    },
    descriptor_set::{allocator::DescriptorSetAllocator, DescriptorSet, WriteDescriptorSet},
    image::{sampler::Sampler, view::ImageView},
    pipeline::{graphics::viewport::Viewport, GraphicsPipeline, Pipeline, PipelineBindPoint},
    render_pass::Framebuffer,
    swapchain::SwapchainAcquireFuture,
};

use super::device::VulkanDevice;
use crate::backend::DrawTarget;
use crate::binder::TEXTURE_SLOTS;
use crate::error::RenderError;
use crate::pipeline::FrameTransforms;
use crate::vertex::{DrawPushConstants, ShaderVertex};

const TEXTURE_UNITS: usize = TEXTURE_SLOTS.len();

/// One frame's command recording against an acquired swapchain image.
pub struct VulkanFrame {
    builder: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    framebuffer: Arc<Framebuffer>,
    image_index: u32,
    acquire_future: SwapchainAcquireFuture,
    pipeline: Arc<GraphicsPipeline>,
    sampler: Arc<Sampler>,
    fallback: Arc<ImageView>,
    descriptor_set_allocator: Arc<dyn DescriptorSetAllocator>,
    viewport: Viewport,
    in_render_pass: bool,
    transforms: FrameTransforms,
    texture_mask: u32,
    textures: [Option<Arc<ImageView>>; TEXTURE_UNITS],
}

impl VulkanFrame {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        builder: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        framebuffer: Arc<Framebuffer>,
        image_index: u32,
        acquire_future: SwapchainAcquireFuture,
        pipeline: Arc<GraphicsPipeline>,
        sampler: Arc<Sampler>,
        fallback: Arc<ImageView>,
        descriptor_set_allocator: Arc<dyn DescriptorSetAllocator>,
        viewport: Viewport,
    ) -> Self {
        Self {
            builder,
            framebuffer,
            image_index,
            acquire_future,
            pipeline,
            sampler,
            fallback,
            descriptor_set_allocator,
            viewport,
            in_render_pass: false,
            transforms: FrameTransforms {
                mvp: Mat4::IDENTITY,
                model: Mat4::IDENTITY,
                normal_matrix: Mat3::IDENTITY,
            },
            texture_mask: 0,
            textures: Default::default(),
        }
    }

    /// Close the render pass and build the command buffer.
    ///
    /// A frame that was never cleared still runs the render pass so the image
    /// reaches a presentable layout.
    pub(super) fn finish(
        mut self,
    ) -> Result<(Arc<PrimaryAutoCommandBuffer>, u32, SwapchainAcquireFuture), RenderError> {
        if !self.in_render_pass {
            self.begin_render_pass([0.0, 0.0, 0.0, 1.0])?;
        }

        let Self {
            mut builder,
            image_index,
            acquire_future,
            ..
        } = self;

        builder
            .end_render_pass(SubpassEndInfo::default())
            .map_err(frame_err)?;
        let command_buffer = builder.build().map_err(frame_err)?;

        Ok((command_buffer, image_index, acquire_future))
    }

    fn begin_render_pass(&mut self, color: [f32; 4]) -> Result<(), RenderError> {
        self.builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values: vec![Some(color.into()), Some(1f32.into())],
                    ..RenderPassBeginInfo::framebuffer(self.framebuffer.clone())
                },
                SubpassBeginInfo {
                    contents: SubpassContents::Inline,
                    ..Default::default()
                },
            )
            .map_err(frame_err)?
            .set_viewport(0, [self.viewport.clone()].into_iter().collect())
            .map_err(frame_err)?
            .bind_pipeline_graphics(self.pipeline.clone())
            .map_err(frame_err)?;

        self.in_render_pass = true;
        Ok(())
    }

    fn descriptor_set(&self) -> Result<Arc<DescriptorSet>, RenderError> {
        let layout = self
            .pipeline
            .layout()
            .set_layouts()
            .first()
            .cloned()
            .ok_or_else(|| RenderError::Frame("pipeline has no descriptor set layout".into()))?;

        let writes: Vec<WriteDescriptorSet> = self
            .textures
            .iter()
            .enumerate()
            .map(|(unit, texture)| (unit as u32, texture))
            .filter(|(binding, _)| layout.bindings().contains_key(binding))
            .map(|(binding, texture)| {
                let view = texture.as_ref().unwrap_or(&self.fallback).clone();
                WriteDescriptorSet::image_view_sampler(binding, view, self.sampler.clone())
            })
            .collect();

        DescriptorSet::new(self.descriptor_set_allocator.clone(), layout, writes, [])
            .map_err(frame_err)
    }
}

impl DrawTarget<VulkanDevice> for VulkanFrame {
    fn clear(&mut self, color: [f32; 4]) -> Result<(), RenderError> {
        if self.in_render_pass {
            return Err(RenderError::Frame("frame was already cleared".into()));
        }
        self.begin_render_pass(color)
    }

    fn set_transforms(&mut self, transforms: &FrameTransforms) -> Result<(), RenderError> {
        self.transforms = *transforms;
        Ok(())
    }

    fn set_texture_mask(&mut self, mask: u32) -> Result<(), RenderError> {
        self.texture_mask = mask;
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<&Arc<ImageView>>) -> Result<(), RenderError> {
        let slot = self
            .textures
            .get_mut(unit as usize)
            .ok_or_else(|| RenderError::Frame(format!("no texture unit {}", unit)))?;
        *slot = texture.cloned();
        Ok(())
    }

    fn bind_geometry(
        &mut self,
        vertices: &Subbuffer<[ShaderVertex]>,
        indices: &Subbuffer<[u32]>,
    ) -> Result<(), RenderError> {
        self.builder
            .bind_vertex_buffers(0, vertices.clone())
            .map_err(frame_err)?
            .bind_index_buffer(indices.clone())
            .map_err(frame_err)?;
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        if !self.in_render_pass {
            return Err(RenderError::Frame("draw before clear".into()));
        }

        let set = self.descriptor_set()?;
        let constants = push_constants(&self.transforms, self.texture_mask);
        let layout = self.pipeline.layout().clone();

        self.builder
            .bind_descriptor_sets(PipelineBindPoint::Graphics, layout.clone(), 0, set)
            .map_err(frame_err)?
            .push_constants(layout, 0, constants)
            .map_err(frame_err)?;

        // SAFETY: the bound index buffer only holds indices validated against
        // the bound vertex buffer when the mesh was uploaded.
        unsafe { self.builder.draw_indexed(index_count, 1, 0, 0, 0) }.map_err(frame_err)?;
        Ok(())
    }
}

/// Vulkan clip space has +Y pointing down.
fn vulkan_clip(mvp: Mat4) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)) * mvp
}

fn push_constants(transforms: &FrameTransforms, texture_mask: u32) -> DrawPushConstants {
    DrawPushConstants::new(
        vulkan_clip(transforms.mvp),
        transforms.normal_matrix,
        texture_mask,
    )
}

fn frame_err(e: impl Display) -> RenderError {
    RenderError::Frame(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_vulkan_clip_flips_y_only() {
        let clip = vulkan_clip(Mat4::IDENTITY) * Vec4::new(0.25, 0.5, 0.75, 1.0);
        assert_eq!(clip, Vec4::new(0.25, -0.5, 0.75, 1.0));
    }

    #[test]
    fn test_push_constants_carry_normal_matrix_and_mask() {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(5.0, 6.0, 7.0),
        );
        let transforms = FrameTransforms {
            mvp: model,
            model,
            normal_matrix: Mat3::from_mat4(model),
        };
        let constants = push_constants(&transforms, 0b0101);

        assert_eq!(constants.texture_mask, 0b0101);
        assert_eq!(constants.normal_matrix[0], [2.0, 0.0, 0.0, 0.0]);
        // Translation never reaches the normal matrix.
        assert_eq!(constants.normal_matrix[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(constants.mvp[1][1], -2.0);
    }

    #[test]
    fn test_one_unit_per_texture_slot() {
        assert_eq!(TEXTURE_UNITS, 4);
    }
}

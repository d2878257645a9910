use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, info};
use vulkano::{
    command_buffer::{AutoCommandBufferBuilder, CommandBufferUsage},
    device::Device,
    format::Format,
    image::{
        sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo, SamplerMipmapMode, LOD_CLAMP_NONE},
        view::ImageView,
        Image, ImageCreateInfo, ImageType, ImageUsage,
    },
    memory::allocator::{AllocationCreateInfo, MemoryAllocator},
    pipeline::{
        graphics::{
            color_blend::{ColorBlendAttachmentState, ColorBlendState},
            depth_stencil::{DepthState, DepthStencilState},
            input_assembly::InputAssemblyState,
            multisample::MultisampleState,
            rasterization::RasterizationState,
            vertex_input::{Vertex as _, VertexDefinition},
            viewport::{Viewport, ViewportState},
            GraphicsPipelineCreateInfo,
        },
        layout::PipelineDescriptorSetLayoutCreateInfo,
        DynamicState, GraphicsPipeline, PipelineLayout, PipelineShaderStageCreateInfo,
    },
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
    swapchain::{acquire_next_image, Swapchain, SwapchainCreateInfo, SwapchainPresentInfo},
    sync::{self, GpuFuture},
    Validated, VulkanError,
};
use winit::window::Window;

use super::context::VulkanContext;
use super::device::VulkanDevice;
use super::frame::VulkanFrame;
use super::shaders::ShaderModules;
use crate::backend::{GpuDevice, MipLevel, TextureUpload};
use crate::error::{DeviceInitError, RenderError};
use crate::vertex::ShaderVertex;
use orbit_assets::TextureFormat;

const DEPTH_FORMAT: Format = Format::D16_UNORM;

/// Owns the swapchain and everything needed to record and present frames.
pub struct VulkanRenderer {
    context: VulkanContext,
    window: Arc<Window>,
    swapchain: Arc<Swapchain>,
    render_pass: Arc<RenderPass>,
    framebuffers: Vec<Arc<Framebuffer>>,
    pipeline: Arc<GraphicsPipeline>,
    sampler: Arc<Sampler>,
    fallback: Arc<ImageView>,
    viewport: Viewport,
    recreate_swapchain: bool,
    previous_frame_end: Option<Box<dyn GpuFuture>>,
}

impl VulkanRenderer {
    pub fn new(context: VulkanContext, window: Arc<Window>) -> Result<Self, DeviceInitError> {
        let device = context.device.clone();
        let extent: [u32; 2] = window.inner_size().into();

        let (swapchain, images) = create_swapchain(&context, extent)?;

        let render_pass = vulkano::single_pass_renderpass!(
            device.clone(),
            attachments: {
                color: {
                    format: swapchain.image_format(),
                    samples: 1,
                    load_op: Clear,
                    store_op: Store,
                },
                depth_stencil: {
                    format: DEPTH_FORMAT,
                    samples: 1,
                    load_op: Clear,
                    store_op: DontCare,
                },
            },
            pass: {
                color: [color],
                depth_stencil: {depth_stencil},
            },
        )
        .map_err(|e| DeviceInitError::Pipeline(e.to_string()))?;

        let framebuffers = create_framebuffers(&images, &render_pass, &context.memory_allocator)
            .map_err(DeviceInitError::Swapchain)?;

        let shaders = ShaderModules::load(device.clone())?;
        let pipeline = create_pipeline(device.clone(), shaders, render_pass.clone())
            .map_err(DeviceInitError::Pipeline)?;

        let sampler = Sampler::new(
            device.clone(),
            SamplerCreateInfo {
                mag_filter: Filter::Linear,
                min_filter: Filter::Linear,
                mipmap_mode: SamplerMipmapMode::Linear,
                address_mode: [SamplerAddressMode::Repeat; 3],
                lod: 0.0..=LOD_CLAMP_NONE,
                ..Default::default()
            },
        )
        .map_err(|e| DeviceInitError::Pipeline(e.to_string()))?;

        // Bound wherever a material role has no texture.
        let fallback = VulkanDevice::new(&context)
            .create_texture(&TextureUpload {
                format: TextureFormat::Rgba8,
                levels: vec![MipLevel {
                    width: 1,
                    height: 1,
                    pixels: vec![u8::MAX; 4],
                }],
            })
            .map_err(|e| DeviceInitError::Device(format!("fallback texture: {}", e)))?;

        let viewport = Viewport {
            offset: [0.0, 0.0],
            extent: [extent[0] as f32, extent[1] as f32],
            ..Default::default()
        };

        info!(
            "Renderer ready: {}x{} swapchain, {:?}",
            extent[0],
            extent[1],
            swapchain.image_format()
        );

        Ok(Self {
            previous_frame_end: Some(sync::now(device).boxed()),
            context,
            window,
            swapchain,
            render_pass,
            framebuffers,
            pipeline,
            sampler,
            fallback,
            viewport,
            recreate_swapchain: false,
        })
    }

    /// A resource device sharing this renderer's queue and allocators.
    pub fn create_device(&self) -> VulkanDevice {
        VulkanDevice::new(&self.context)
    }

    /// Mark the swapchain stale; it is rebuilt before the next frame.
    pub fn resize(&mut self) {
        self.recreate_swapchain = true;
    }

    /// Acquire the next swapchain image and start recording.
    ///
    /// Returns `Ok(None)` when there is nothing to draw into this frame: the
    /// window is minimized or the swapchain went out of date.
    pub fn begin_frame(&mut self) -> Result<Option<VulkanFrame>, RenderError> {
        let extent: [u32; 2] = self.window.inner_size().into();
        if extent.contains(&0) {
            return Ok(None);
        }

        if let Some(previous) = self.previous_frame_end.as_mut() {
            previous.cleanup_finished();
        }

        if self.recreate_swapchain {
            self.recreate(extent)?;
        }

        let (image_index, suboptimal, acquire_future) =
            match acquire_next_image(self.swapchain.clone(), None) {
                Ok(r) => r,
                Err(Validated::Error(VulkanError::OutOfDate)) => {
                    self.recreate_swapchain = true;
                    return Ok(None);
                }
                Err(e) => return Err(frame_err(e)),
            };

        if suboptimal {
            self.recreate_swapchain = true;
        }

        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .cloned()
            .ok_or_else(|| RenderError::Frame(format!("no framebuffer for image {}", image_index)))?;

        let builder = AutoCommandBufferBuilder::primary(
            self.context.command_buffer_allocator.clone(),
            self.context.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(frame_err)?;

        Ok(Some(VulkanFrame::new(
            builder,
            framebuffer,
            image_index,
            acquire_future,
            self.pipeline.clone(),
            self.sampler.clone(),
            self.fallback.clone(),
            self.context.descriptor_set_allocator.clone(),
            self.viewport.clone(),
        )))
    }

    /// Finish recording, submit and present.
    pub fn submit(&mut self, frame: VulkanFrame) -> Result<(), RenderError> {
        let (command_buffer, image_index, acquire_future) = frame.finish()?;
        let queue = self.context.queue.clone();

        let future = self
            .previous_frame_end
            .take()
            .unwrap_or_else(|| sync::now(self.context.device.clone()).boxed())
            .join(acquire_future)
            .then_execute(queue.clone(), command_buffer)
            .map_err(frame_err)?
            .then_swapchain_present(
                queue,
                SwapchainPresentInfo::swapchain_image_index(self.swapchain.clone(), image_index),
            )
            .then_signal_fence_and_flush();

        match future {
            Ok(future) => {
                self.previous_frame_end = Some(future.boxed());
                Ok(())
            }
            Err(Validated::Error(VulkanError::OutOfDate)) => {
                self.recreate_swapchain = true;
                self.previous_frame_end = Some(sync::now(self.context.device.clone()).boxed());
                Ok(())
            }
            Err(e) => {
                self.previous_frame_end = Some(sync::now(self.context.device.clone()).boxed());
                Err(frame_err(e))
            }
        }
    }

    pub fn wait_idle(&self) {
        self.context.wait_idle();
    }

    fn recreate(&mut self, extent: [u32; 2]) -> Result<(), RenderError> {
        let (swapchain, images) = self
            .swapchain
            .recreate(SwapchainCreateInfo {
                image_extent: extent,
                ..self.swapchain.create_info()
            })
            .map_err(frame_err)?;

        self.swapchain = swapchain;
        self.framebuffers =
            create_framebuffers(&images, &self.render_pass, &self.context.memory_allocator)
                .map_err(RenderError::Frame)?;
        self.viewport.extent = [extent[0] as f32, extent[1] as f32];
        self.recreate_swapchain = false;

        debug!("Swapchain recreated at {}x{}", extent[0], extent[1]);
        Ok(())
    }
}

fn frame_err(e: impl Display) -> RenderError {
    RenderError::Frame(e.to_string())
}

fn create_swapchain(
    context: &VulkanContext,
    extent: [u32; 2],
) -> Result<(Arc<Swapchain>, Vec<Arc<Image>>), DeviceInitError> {
    let swapchain_err = |e: &dyn Display| DeviceInitError::Swapchain(e.to_string());
    let physical = context.device.physical_device();

    let capabilities = physical
        .surface_capabilities(&context.surface, Default::default())
        .map_err(|e| swapchain_err(&e))?;

    let (image_format, _) = physical
        .surface_formats(&context.surface, Default::default())
        .map_err(|e| swapchain_err(&e))?
        .first()
        .copied()
        .ok_or_else(|| DeviceInitError::Swapchain("surface reports no formats".into()))?;

    let composite_alpha = capabilities
        .supported_composite_alpha
        .into_iter()
        .next()
        .ok_or_else(|| DeviceInitError::Swapchain("no supported composite alpha".into()))?;

    let mut min_image_count = capabilities.min_image_count.max(2);
    if let Some(max) = capabilities.max_image_count {
        min_image_count = min_image_count.min(max);
    }

    Swapchain::new(
        context.device.clone(),
        context.surface.clone(),
        SwapchainCreateInfo {
            min_image_count,
            image_format,
            image_extent: extent,
            image_usage: ImageUsage::COLOR_ATTACHMENT,
            composite_alpha,
            ..Default::default()
        },
    )
    .map_err(|e| swapchain_err(&e))
}

fn create_framebuffers(
    images: &[Arc<Image>],
    render_pass: &Arc<RenderPass>,
    memory_allocator: &Arc<dyn MemoryAllocator>,
) -> Result<Vec<Arc<Framebuffer>>, String> {
    let extent = images
        .first()
        .map(|image| image.extent())
        .ok_or_else(|| "swapchain has no images".to_string())?;

    let depth = Image::new(
        memory_allocator.clone(),
        ImageCreateInfo {
            image_type: ImageType::Dim2d,
            format: DEPTH_FORMAT,
            extent,
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            ..Default::default()
        },
        AllocationCreateInfo::default(),
    )
    .map_err(|e| e.to_string())?;
    let depth = ImageView::new_default(depth).map_err(|e| e.to_string())?;

    images
        .iter()
        .map(|image| {
            let view = ImageView::new_default(image.clone()).map_err(|e| e.to_string())?;
            Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![view, depth.clone()],
                    ..Default::default()
                },
            )
            .map_err(|e| e.to_string())
        })
        .collect()
}

fn create_pipeline(
    device: Arc<Device>,
    shaders: ShaderModules,
    render_pass: Arc<RenderPass>,
) -> Result<Arc<GraphicsPipeline>, String> {
    let vertex_input_state = ShaderVertex::per_vertex()
        .definition(&shaders.vertex)
        .map_err(|e| e.to_string())?;

    let stages = [
        PipelineShaderStageCreateInfo::new(shaders.vertex),
        PipelineShaderStageCreateInfo::new(shaders.fragment),
    ];

    let layout = PipelineLayout::new(
        device.clone(),
        PipelineDescriptorSetLayoutCreateInfo::from_stages(&stages)
            .into_pipeline_layout_create_info(device.clone())
            .map_err(|e| e.to_string())?,
    )
    .map_err(|e| e.to_string())?;

    let subpass = Subpass::from(render_pass, 0).ok_or_else(|| "render pass has no subpass 0".to_string())?;

    GraphicsPipeline::new(
        device,
        None,
        GraphicsPipelineCreateInfo {
            stages: stages.into_iter().collect(),
            vertex_input_state: Some(vertex_input_state),
            input_assembly_state: Some(InputAssemblyState::default()),
            viewport_state: Some(ViewportState::default()),
            rasterization_state: Some(RasterizationState::default()),
            depth_stencil_state: Some(DepthStencilState {
                depth: Some(DepthState::simple()),
                ..Default::default()
            }),
            multisample_state: Some(MultisampleState::default()),
            color_blend_state: Some(ColorBlendState::with_attachment_states(
                subpass.num_color_attachments(),
                ColorBlendAttachmentState::default(),
            )),
            dynamic_state: [DynamicState::Viewport].into_iter().collect(),
            subpass: Some(subpass.into()),
            ..GraphicsPipelineCreateInfo::layout(layout)
        },
    )
    .map_err(|e| e.to_string())
}

//! Orbit Render - GPU resources, material binding and the frame pipeline
//!
//! Everything above [`backend::GpuDevice`] and [`backend::DrawTarget`] is
//! backend-agnostic; the Vulkan implementation lives in [`vulkan`].

pub mod backend;
pub mod binder;
pub mod error;
pub mod handle;
pub mod pipeline;
pub mod resources;
pub mod vertex;
pub mod vulkan;

pub use backend::{build_mip_chain, DrawTarget, GpuDevice, MipLevel, TextureUpload};
pub use binder::{MaterialBinder, TextureSlot, TEXTURE_SLOTS};
pub use error::{DeviceInitError, RenderError};
pub use handle::{GpuHandle, IndexBufferHandle, TextureHandle, VertexBufferHandle};
pub use pipeline::{FrameTransforms, RenderConfig, RenderPipeline};
pub use resources::{GpuMaterial, GpuMesh, GpuModel, GpuResourceManager};
pub use vertex::{DrawPushConstants, ShaderVertex};
pub use vulkan::{VulkanContext, VulkanDevice, VulkanFrame, VulkanRenderer};

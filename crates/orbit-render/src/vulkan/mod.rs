//! Vulkan implementation of the render backend

mod context;
mod device;
mod frame;
mod renderer;
mod shaders;

pub use context::VulkanContext;
pub use device::VulkanDevice;
pub use frame::VulkanFrame;
pub use renderer::VulkanRenderer;

use std::sync::Arc;

use tracing::info;
use vulkano::{
    command_buffer::allocator::{CommandBufferAllocator, StandardCommandBufferAllocator},
    descriptor_set::allocator::{DescriptorSetAllocator, StandardDescriptorSetAllocator},
    device::{
        physical::PhysicalDeviceType, Device, DeviceCreateInfo, DeviceExtensions, Queue,
        QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateFlags, InstanceCreateInfo},
    memory::allocator::{MemoryAllocator, StandardMemoryAllocator},
    swapchain::Surface,
    VulkanLibrary,
};
use winit::{event_loop::ActiveEventLoop, window::Window};

use crate::error::DeviceInitError;

/// Instance, device and allocators shared by the renderer and uploads.
pub struct VulkanContext {
    pub instance: Arc<Instance>,
    pub surface: Arc<Surface>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub memory_allocator: Arc<dyn MemoryAllocator>,
    pub command_buffer_allocator: Arc<dyn CommandBufferAllocator>,
    pub descriptor_set_allocator: Arc<dyn DescriptorSetAllocator>,
}

impl VulkanContext {
    /// Bring up Vulkan for `window`. Every failure here is fatal.
    pub fn new(event_loop: &ActiveEventLoop, window: Arc<Window>) -> Result<Self, DeviceInitError> {
        let library = VulkanLibrary::new().map_err(|e| DeviceInitError::Library(e.to_string()))?;

        // Get required extensions for windowing
        let required_extensions = Surface::required_extensions(event_loop)
            .map_err(|e| DeviceInitError::Instance(e.to_string()))?;

        let instance = Instance::new(
            library,
            InstanceCreateInfo {
                flags: InstanceCreateFlags::ENUMERATE_PORTABILITY,
                enabled_extensions: required_extensions,
                ..Default::default()
            },
        )
        .map_err(|e| DeviceInitError::Instance(e.to_string()))?;

        let surface = Surface::from_window(instance.clone(), window)
            .map_err(|e| DeviceInitError::Surface(e.to_string()))?;

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ..DeviceExtensions::empty()
        };

        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()
            .map_err(|e| DeviceInitError::Device(e.to_string()))?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                p.queue_family_properties()
                    .iter()
                    .enumerate()
                    .position(|(i, q)| {
                        q.queue_flags.contains(QueueFlags::GRAPHICS)
                            && p.surface_support(i as u32, &surface).unwrap_or(false)
                    })
                    .map(|i| (p, i as u32))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 0,
                PhysicalDeviceType::IntegratedGpu => 1,
                PhysicalDeviceType::VirtualGpu => 2,
                PhysicalDeviceType::Cpu => 3,
                _ => 4,
            })
            .ok_or(DeviceInitError::NoSuitableDevice)?;

        info!(
            "Using GPU: {} ({:?})",
            physical_device.properties().device_name,
            physical_device.properties().device_type
        );

        let (device, mut queues) = Device::new(
            physical_device,
            DeviceCreateInfo {
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                enabled_extensions: device_extensions,
                ..Default::default()
            },
        )
        .map_err(|e| DeviceInitError::Device(e.to_string()))?;

        let queue = queues
            .next()
            .ok_or_else(|| DeviceInitError::Device("device created without a queue".into()))?;

        let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        let command_buffer_allocator = Arc::new(StandardCommandBufferAllocator::new(
            device.clone(),
            Default::default(),
        ));
        let descriptor_set_allocator = Arc::new(StandardDescriptorSetAllocator::new(
            device.clone(),
            Default::default(),
        ));

        Ok(Self {
            instance,
            surface,
            device,
            queue,
            memory_allocator,
            command_buffer_allocator,
            descriptor_set_allocator,
        })
    }

    /// Block until the GPU has finished all submitted work.
    pub fn wait_idle(&self) {
        // SAFETY: called only from the frame loop thread, with no queue access in flight.
        if let Err(e) = unsafe { self.device.wait_idle() } {
            tracing::warn!("Device wait_idle failed: {}", e);
        }
    }
}

use std::sync::Arc;

use vulkano::{device::Device, shader::EntryPoint};

use crate::error::DeviceInitError;

pub mod model_vert {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "src/vulkan/shaders/model.vert",
    }
}

pub mod model_frag {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "src/vulkan/shaders/model.frag",
    }
}

pub struct ShaderModules {
    pub vertex: EntryPoint,
    pub fragment: EntryPoint,
}

impl ShaderModules {
    pub fn load(device: Arc<Device>) -> Result<Self, DeviceInitError> {
        let vertex = model_vert::load(device.clone())
            .map_err(|e| DeviceInitError::Shader(format!("model.vert: {}", e)))?
            .entry_point("main")
            .ok_or_else(|| DeviceInitError::Shader("model.vert has no main".into()))?;

        let fragment = model_frag::load(device)
            .map_err(|e| DeviceInitError::Shader(format!("model.frag: {}", e)))?
            .entry_point("main")
            .ok_or_else(|| DeviceInitError::Shader("model.frag has no main".into()))?;

        Ok(Self { vertex, fragment })
    }
}

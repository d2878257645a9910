/// Fatal errors while bringing up the GPU.
#[derive(Debug, thiserror::Error)]
pub enum DeviceInitError {
    #[error("failed to load Vulkan library: {0}")]
    Library(String),

    #[error("failed to create Vulkan instance: {0}")]
    Instance(String),

    #[error("failed to create window surface: {0}")]
    Surface(String),

    #[error("no suitable GPU found")]
    NoSuitableDevice,

    #[error("failed to create logical device: {0}")]
    Device(String),

    #[error("failed to load shader module: {0}")]
    Shader(String),

    #[error("failed to create swapchain: {0}")]
    Swapchain(String),

    #[error("failed to create graphics pipeline: {0}")]
    Pipeline(String),
}

/// Recoverable errors while uploading resources or recording a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("mesh has no geometry to upload")]
    EmptyMesh,

    #[error("mesh index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("unsupported texture layout: {0} bytes per pixel")]
    UnsupportedTextureFormat(u32),

    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureSize { expected: usize, actual: usize },

    #[error("GPU upload failed: {0}")]
    Upload(String),

    #[error("frame recording failed: {0}")]
    Frame(String),
}

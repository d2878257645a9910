use std::path::PathBuf;

/// Errors that can occur while importing a model.
///
/// Callers treat any of these as "empty model": nothing partial is surfaced.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("model not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load glTF file '{0}': {1}")]
    GltfLoadFailed(PathBuf, String),

    #[error("'{0}' contains no triangle geometry")]
    NoGeometry(PathBuf),

    #[error("index {index} is out of range for a sub-mesh with {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Errors that can occur while decoding a texture image.
#[derive(Debug, thiserror::Error)]
pub enum TextureDecodeError {
    #[error("texture not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to decode image '{0}': {1}")]
    DecodeFailed(String, String),

    #[error("I/O error reading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

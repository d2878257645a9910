use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::error::{ImportError, TextureDecodeError};
use crate::importer::{self, ImportedModel};
use crate::material::TextureRef;
use crate::options::ImportOptions;
use crate::texture::{self, DecodedImage};

/// Loads models and decodes the textures they reference.
///
/// Relative texture paths resolve against the texture directory. Decoded
/// file textures are cached by resolved path, so materials sharing an image
/// decode it once.
pub struct AssetServer {
    base_path: PathBuf,
    options: ImportOptions,
    textures: HashMap<PathBuf, Arc<DecodedImage>>,
}

impl AssetServer {
    /// Create a new AssetServer rooted at the given texture directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!("AssetServer created with texture directory: {}", base_path.display());
        Self {
            base_path,
            options: ImportOptions::VIEWER,
            textures: HashMap::new(),
        }
    }

    /// Override the post-processing steps used by [`AssetServer::load_model`].
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve a relative texture path against the base path.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Import a model file. The model path is taken as given.
    pub fn load_model(&self, path: &Path) -> Result<ImportedModel, ImportError> {
        let model = importer::import_model(path, self.options)?;
        info!(
            "Imported '{}': {} meshes, {} materials, {} vertices",
            path.display(),
            model.meshes.len(),
            model.materials.len(),
            model.vertex_count()
        );
        Ok(model)
    }

    /// Decode a material texture.
    /// Subsequent loads of the same file return the cached image.
    pub fn load_texture(&mut self, texture: &TextureRef) -> Result<Arc<DecodedImage>, TextureDecodeError> {
        match texture {
            TextureRef::Path(path) => {
                let full_path = self.resolve(path);

                if let Some(image) = self.textures.get(&full_path) {
                    return Ok(Arc::clone(image));
                }

                let image = Arc::new(texture::decode_file(&full_path)?);
                self.textures.insert(full_path, Arc::clone(&image));
                Ok(image)
            }
            TextureRef::Embedded { .. } => {
                Ok(Arc::new(texture::decode_texture(texture, &self.base_path)?))
            }
        }
    }

    /// Drop every cached image.
    pub fn clear_cache(&mut self) {
        self.textures.clear();
    }

    pub fn cached_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// The base path this server resolves relative paths against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

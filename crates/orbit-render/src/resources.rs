use std::collections::HashMap;

use orbit_assets::{AssetServer, DecodedImage, ImportedModel, Material, MaterialRole, MeshRecord};
use tracing::{debug, info, warn};

use crate::backend::{self, GpuDevice};
use crate::error::RenderError;
use crate::handle::{GpuHandle, HandleId, IndexBufferHandle, TextureHandle, VertexBufferHandle};

/// Texture handles for one material, indexed by [`MaterialRole::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuMaterial {
    pub textures: [TextureHandle; 4],
}

impl GpuMaterial {
    pub fn texture(&self, role: MaterialRole) -> TextureHandle {
        self.textures[role.index()]
    }
}

/// A mesh record resident on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuMesh {
    pub vertex_buffer: VertexBufferHandle,
    pub index_buffer: IndexBufferHandle,
    pub index_count: u32,
    pub material: GpuMaterial,
}

/// Every uploaded mesh of a model, in import order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuModel {
    pub meshes: Vec<GpuMesh>,
}

impl GpuModel {
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Owns the backend and every resource created through it.
///
/// Handles are allocated from a counter owned by the manager and are never
/// reused, so a stale handle can only miss.
pub struct GpuResourceManager<D: GpuDevice> {
    device: D,
    last_id: HandleId,
    vertex_buffers: HashMap<VertexBufferHandle, D::VertexBuffer>,
    index_buffers: HashMap<IndexBufferHandle, D::IndexBuffer>,
    textures: HashMap<TextureHandle, D::Texture>,
}

impl<D: GpuDevice> GpuResourceManager<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            last_id: 0,
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    fn allocate<T>(&mut self) -> GpuHandle<T> {
        self.last_id += 1;
        GpuHandle::new(self.last_id)
    }

    /// Upload a mesh record as one static vertex buffer and one index buffer.
    pub fn upload_mesh(
        &mut self,
        mesh: &MeshRecord,
    ) -> Result<(VertexBufferHandle, IndexBufferHandle), RenderError> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }
        if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= mesh.vertices.len()) {
            return Err(RenderError::IndexOutOfRange {
                index,
                vertex_count: mesh.vertices.len(),
            });
        }

        let vertex_buffer = self.device.create_vertex_buffer(&mesh.vertices)?;
        let index_buffer = self.device.create_index_buffer(&mesh.indices)?;

        let vb = self.allocate();
        let ib = self.allocate();
        self.vertex_buffers.insert(vb, vertex_buffer);
        self.index_buffers.insert(ib, index_buffer);

        debug!(
            "Uploaded mesh: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok((vb, ib))
    }

    /// Upload a decoded image with a full mip chain.
    ///
    /// Returns [`TextureHandle::NONE`] when the image cannot be uploaded.
    pub fn upload_texture(&mut self, image: &DecodedImage) -> TextureHandle {
        let texture = backend::build_mip_chain(image)
            .and_then(|upload| self.device.create_texture(&upload));

        match texture {
            Ok(texture) => {
                let handle = self.allocate();
                self.textures.insert(handle, texture);
                handle
            }
            Err(e) => {
                warn!("Texture upload failed: {}", e);
                TextureHandle::NONE
            }
        }
    }

    /// Decode and upload every texture role of a material.
    pub fn upload_material(&mut self, material: &Material, assets: &mut AssetServer) -> GpuMaterial {
        let mut gpu = GpuMaterial::default();

        for (role, texture) in material.textures() {
            let Some(texture) = texture else {
                continue;
            };
            match assets.load_texture(texture) {
                Ok(image) => gpu.textures[role.index()] = self.upload_texture(&image),
                Err(e) => warn!(
                    "Material '{}': {:?} texture {} unavailable: {}",
                    material.name,
                    role,
                    texture.label(),
                    e
                ),
            }
        }

        gpu
    }

    /// Upload every mesh of an imported model with its material.
    ///
    /// Meshes that fail to upload are skipped; the rest still draw.
    pub fn upload_model(&mut self, model: &ImportedModel, assets: &mut AssetServer) -> GpuModel {
        let mut meshes = Vec::with_capacity(model.meshes.len());

        for (i, mesh) in model.meshes.iter().enumerate() {
            let (vertex_buffer, index_buffer) = match self.upload_mesh(mesh) {
                Ok(buffers) => buffers,
                Err(e) => {
                    warn!("Skipping mesh {}: {}", i, e);
                    continue;
                }
            };

            let material = model
                .material_of(mesh)
                .map(|material| self.upload_material(material, assets))
                .unwrap_or_default();

            meshes.push(GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                material,
            });
        }

        info!(
            "Uploaded {} of {} meshes, {} textures resident",
            meshes.len(),
            model.meshes.len(),
            self.textures.len()
        );
        GpuModel { meshes }
    }

    /// Release a mesh's buffers and material textures together.
    ///
    /// Sentinel and already-released handles are ignored.
    pub fn release_mesh(&mut self, mesh: &GpuMesh) {
        self.vertex_buffers.remove(&mesh.vertex_buffer);
        self.index_buffers.remove(&mesh.index_buffer);
        for handle in &mesh.material.textures {
            self.textures.remove(handle);
        }
    }

    /// Release every mesh of a model and leave it empty.
    pub fn release_model(&mut self, model: &mut GpuModel) {
        let meshes = std::mem::take(&mut model.meshes);
        for mesh in &meshes {
            self.release_mesh(mesh);
        }
        info!("Released {} meshes", meshes.len());
    }

    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> Option<&D::VertexBuffer> {
        self.vertex_buffers.get(&handle)
    }

    pub fn index_buffer(&self, handle: IndexBufferHandle) -> Option<&D::IndexBuffer> {
        self.index_buffers.get(&handle)
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&D::Texture> {
        self.textures.get(&handle)
    }

    /// Number of live buffers and textures.
    pub fn resident_count(&self) -> usize {
        self.vertex_buffers.len() + self.index_buffers.len() + self.textures.len()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

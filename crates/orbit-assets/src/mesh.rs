use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position, normal, UV. Always 8 floats wide.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Number of floats per vertex in the interleaved layout.
    pub const FLOATS: usize = 8;

    /// Byte stride of one vertex.
    pub const STRIDE: usize = Self::FLOATS * std::mem::size_of::<f32>();

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Bit pattern of all eight components, used for exact welding.
    pub(crate) fn bits(&self) -> [u32; 8] {
        let floats: &[f32; 8] = bytemuck::cast_ref(self);
        floats.map(f32::to_bits)
    }
}

/// One drawable unit: merged vertices and indices referencing one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRecord {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Index into [`crate::ImportedModel::materials`].
    pub material: usize,
    /// Per-vertex tangents (xyz + handedness). Empty unless tangents were
    /// computed, otherwise exactly one per vertex.
    pub tangents: Vec<[f32; 4]>,
}

impl MeshRecord {
    /// Create an empty record for the given material slot.
    pub fn empty(material: usize) -> Self {
        Self {
            material,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The vertex array viewed as raw interleaved floats.
    pub fn interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Whether every index addresses a vertex of this record.
    pub fn indices_in_bounds(&self) -> bool {
        let count = self.vertices.len();
        self.indices.iter().all(|&i| (i as usize) < count)
    }
}

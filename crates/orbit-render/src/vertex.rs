//! GPU-side vertex and push-constant layouts

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use orbit_assets::Vertex;
use vulkano::buffer::BufferContents;
use vulkano::pipeline::graphics::vertex_input::Vertex as VertexInput;

/// Interleaved vertex as the vertex shader sees it: position, normal, uv.
#[derive(BufferContents, VertexInput, Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct ShaderVertex {
    #[format(R32G32B32_SFLOAT)]
    pub position: [f32; 3],
    #[format(R32G32B32_SFLOAT)]
    pub normal: [f32; 3],
    #[format(R32G32_SFLOAT)]
    pub uv: [f32; 2],
}

impl From<&Vertex> for ShaderVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

/// Push constants shared by both shader stages
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawPushConstants {
    pub mvp: [[f32; 4]; 4],
    /// Model transform for normals: the upper 3×3 of the model matrix
    pub normal_matrix: [[f32; 4]; 4],
    /// Bit `n` set when texture unit `n` holds a real texture
    pub texture_mask: u32,
}

impl DrawPushConstants {
    pub fn new(mvp: Mat4, normal_matrix: Mat3, texture_mask: u32) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            normal_matrix: Mat4::from_mat3(normal_matrix).to_cols_array_2d(),
            texture_mask,
        }
    }
}

impl Default for DrawPushConstants {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat3::IDENTITY, 0)
    }
}

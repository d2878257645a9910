//! Per-frame draw sequencing

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::backend::{DrawTarget, GpuDevice};
use crate::binder::MaterialBinder;
use crate::error::RenderError;
use crate::resources::{GpuModel, GpuResourceManager};

/// Projection, model placement and clear color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Width over height; normally taken from the configured window size
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    /// Uniform scale applied to the model
    pub model_scale: f32,
    pub model_translation: Vec3,
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect_ratio: 640.0 / 480.0,
            near: 0.1,
            far: 100.0,
            model_scale: 0.1,
            model_translation: Vec3::ZERO,
            clear_color: [0.2, 0.9, 0.2, 1.0],
        }
    }
}

impl RenderConfig {
    /// Set the aspect ratio from a window size. Zero-sized windows are ignored.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
        self
    }
}

/// Matrices handed to the shaders for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub mvp: Mat4,
    pub model: Mat4,
    /// Upper 3×3 of the model matrix
    pub normal_matrix: Mat3,
}

/// Draws an uploaded model with a fixed projection and model transform.
pub struct RenderPipeline {
    config: RenderConfig,
    projection: Mat4,
    model: Mat4,
}

impl RenderPipeline {
    pub fn new(config: RenderConfig) -> Self {
        let projection = Mat4::perspective_rh(
            config.fov_degrees.to_radians(),
            config.aspect_ratio,
            config.near,
            config.far,
        );
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(config.model_scale),
            glam::Quat::IDENTITY,
            config.model_translation,
        );
        Self {
            config,
            projection,
            model,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Combine the camera's view with the fixed projection and model.
    pub fn frame_transforms(&self, view: Mat4) -> FrameTransforms {
        FrameTransforms {
            mvp: self.projection * view * self.model,
            model: self.model,
            normal_matrix: Mat3::from_mat4(self.model),
        }
    }

    /// Record one frame: clear, transforms, then one draw per mesh.
    ///
    /// Returns the number of draws issued. Meshes whose buffers are no longer
    /// resident are skipped.
    pub fn render_frame<D, T>(
        &self,
        target: &mut T,
        resources: &GpuResourceManager<D>,
        model: &GpuModel,
        view: Mat4,
    ) -> Result<usize, RenderError>
    where
        D: GpuDevice,
        T: DrawTarget<D> + ?Sized,
    {
        target.clear(self.config.clear_color)?;
        target.set_transforms(&self.frame_transforms(view))?;

        let mut draws = 0;
        for mesh in &model.meshes {
            let (Some(vertices), Some(indices)) = (
                resources.vertex_buffer(mesh.vertex_buffer),
                resources.index_buffer(mesh.index_buffer),
            ) else {
                trace!("Mesh buffers not resident, skipping draw");
                continue;
            };

            MaterialBinder::bind(target, resources, &mesh.material)?;
            target.bind_geometry(vertices, indices)?;
            target.draw_indexed(mesh.index_count)?;
            draws += 1;
        }

        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Command, RecordingDevice, RecordingTarget};
    use crate::resources::{GpuMaterial, GpuMesh};
    use orbit_assets::{MeshRecord, Vertex};

    fn quad() -> MeshRecord {
        MeshRecord {
            vertices: vec![Vertex::default(); 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..MeshRecord::empty(0)
        }
    }

    fn upload(gpu: &mut GpuResourceManager<RecordingDevice>, mesh: &MeshRecord) -> GpuMesh {
        let (vertex_buffer, index_buffer) = gpu.upload_mesh(mesh).unwrap();
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            material: GpuMaterial::default(),
        }
    }

    #[test]
    fn defaults_match_viewer_setup() {
        let config = RenderConfig::default();
        assert_eq!(config.fov_degrees, 45.0);
        assert_eq!(config.near, 0.1);
        assert_eq!(config.far, 100.0);
        assert_eq!(config.model_scale, 0.1);
        assert_eq!(config.clear_color, [0.2, 0.9, 0.2, 1.0]);
        assert_eq!(
            RenderConfig::default().with_window_size(800, 400).aspect_ratio,
            2.0
        );
        assert_eq!(
            RenderConfig::default().with_window_size(0, 400).aspect_ratio,
            config.aspect_ratio
        );
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RenderConfig = toml::from_str("fov_degrees = 60.0\nclear_color = [0.0, 0.0, 0.0, 1.0]").unwrap();
        assert_eq!(config.fov_degrees, 60.0);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.far, 100.0);
        assert_eq!(config.model_translation, Vec3::ZERO);
    }

    #[test]
    fn mvp_is_projection_view_model() {
        let pipeline = RenderPipeline::new(RenderConfig::default());
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let t = pipeline.frame_transforms(view);

        assert_eq!(t.mvp, pipeline.projection() * view * pipeline.model());
        assert_eq!(t.model, Mat4::from_scale(Vec3::splat(0.1)));
        assert_eq!(t.normal_matrix, Mat3::from_diagonal(Vec3::splat(0.1)));
    }

    #[test]
    fn model_at_origin_projects_to_screen_center() {
        let pipeline = RenderPipeline::new(RenderConfig::default());
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let clip = pipeline.frame_transforms(view).mvp * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn frame_draws_every_mesh_in_order() {
        let mut gpu = GpuResourceManager::new(RecordingDevice::default());
        let mut small = quad();
        small.indices.truncate(3);
        let model = GpuModel {
            meshes: vec![upload(&mut gpu, &quad()), upload(&mut gpu, &small)],
        };

        let pipeline = RenderPipeline::new(RenderConfig::default());
        let mut target = RecordingTarget::default();
        let draws = pipeline
            .render_frame(&mut target, &gpu, &model, Mat4::IDENTITY)
            .unwrap();

        assert_eq!(draws, 2);
        assert_eq!(target.draws(), vec![6, 3]);
        assert_eq!(target.commands[0], Command::Clear([0.2, 0.9, 0.2, 1.0]));
        assert!(matches!(target.commands[1], Command::Transforms(_)));
        // Four texture binds and the mask precede each geometry bind.
        assert_eq!(target.texture_binds().len(), 8);
        assert_eq!(target.texture_masks(), vec![0, 0]);
        assert_eq!(
            target.commands[7],
            Command::BindGeometry { vertices: 4, indices: 6 }
        );
    }

    #[test]
    fn empty_model_still_clears() {
        let gpu = GpuResourceManager::new(RecordingDevice::default());
        let pipeline = RenderPipeline::new(RenderConfig::default());
        let mut target = RecordingTarget::default();
        let draws = pipeline
            .render_frame(&mut target, &gpu, &GpuModel::default(), Mat4::IDENTITY)
            .unwrap();
        assert_eq!(draws, 0);
        assert_eq!(target.commands.len(), 2);
    }

    #[test]
    fn released_meshes_are_not_drawn() {
        let mut gpu = GpuResourceManager::new(RecordingDevice::default());
        let mesh = upload(&mut gpu, &quad());
        let model = GpuModel { meshes: vec![mesh] };
        gpu.release_mesh(&mesh);

        let pipeline = RenderPipeline::new(RenderConfig::default());
        let mut target = RecordingTarget::default();
        let draws = pipeline
            .render_frame(&mut target, &gpu, &model, Mat4::IDENTITY)
            .unwrap();
        assert_eq!(draws, 0);
        assert!(target.draws().is_empty());
    }
}

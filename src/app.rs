//! Application context and the winit frame loop

use std::sync::Arc;

use anyhow::Context;
use glam::Vec2;
use orbit_assets::{AssetServer, ImportedModel};
use orbit_camera::{CameraController, InputHandler};
use orbit_render::{
    GpuModel, GpuResourceManager, RenderPipeline, VulkanContext, VulkanDevice, VulkanRenderer,
};
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{Touch, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::settings::ViewerSettings;

/// Everything that exists only while a window and GPU are up.
struct Viewer {
    window: Arc<Window>,
    renderer: VulkanRenderer,
    resources: GpuResourceManager<VulkanDevice>,
    model: GpuModel,
    pipeline: RenderPipeline,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, settings: &ViewerSettings) -> anyhow::Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(settings.window.title.clone())
            .with_inner_size(LogicalSize::new(settings.window.width, settings.window.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );

        let context =
            VulkanContext::new(event_loop, window.clone()).context("Failed to initialize Vulkan")?;
        let renderer =
            VulkanRenderer::new(context, window.clone()).context("Failed to create renderer")?;
        let mut resources = GpuResourceManager::new(renderer.create_device());

        let model = upload_model(settings, &mut resources);

        let pipeline = RenderPipeline::new(
            settings
                .render
                .clone()
                .with_window_size(settings.window.width, settings.window.height),
        );

        Ok(Self {
            window,
            renderer,
            resources,
            model,
            pipeline,
        })
    }
}

/// Import the configured model and move it onto the GPU.
///
/// Import failures leave the viewer running with nothing to draw.
fn upload_model(settings: &ViewerSettings, resources: &mut GpuResourceManager<VulkanDevice>) -> GpuModel {
    let mut assets = AssetServer::new(settings.model.texture_dir());

    let imported = match assets.load_model(&settings.model.path) {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to import model: {}", e);
            ImportedModel::empty()
        }
    };

    let model = resources.upload_model(&imported, &mut assets);
    info!(
        "{} of {} meshes resident on the GPU",
        model.meshes.len(),
        imported.meshes.len()
    );
    model
}

/// Application context: settings, input, camera and the live viewer.
pub struct ViewerApp {
    settings: ViewerSettings,
    viewer: Option<Viewer>,
    input: InputHandler,
    camera: CameraController,
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(settings: ViewerSettings) -> Self {
        let camera = CameraController::with_config(settings.camera.clone());
        Self {
            settings,
            viewer: None,
            input: InputHandler::new(),
            camera,
            fatal: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn redraw(&mut self) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };

        for event in self.input.drain() {
            self.camera.handle_event(&event);
        }
        let view = self.camera.view_matrix();

        let mut frame = match viewer.renderer.begin_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!("Skipping frame: {}", e);
                return;
            }
        };

        match viewer
            .pipeline
            .render_frame(&mut frame, &viewer.resources, &viewer.model, view)
        {
            Ok(draws) => debug!("Recorded {} draws", draws),
            Err(e) => warn!("Frame recording failed: {}", e),
        }

        // Submit even after a recording error so the acquired image is presented.
        if let Err(e) = viewer.renderer.submit(frame) {
            warn!("Frame submission failed: {}", e);
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        match Viewer::new(event_loop, &self.settings) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(e) => {
                error!("{:#}", e);
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.renderer.resize();
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.handle_mouse_button(button, state);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .handle_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.handle_scroll(delta);
            }
            WindowEvent::Touch(Touch {
                id, phase, location, ..
            }) => {
                self.input
                    .handle_touch(id, phase, Vec2::new(location.x as f32, location.y as f32));
            }
            WindowEvent::Focused(false) => {
                self.input.handle_focus_lost();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewer) = self.viewer.as_ref() {
            viewer.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.renderer.wait_idle();
            viewer.resources.release_model(&mut viewer.model);
            info!("Released GPU resources");
        }
    }
}

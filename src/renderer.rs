//! GPU frame orchestration: surface/device ownership, the scene pass over
//! the active room, and the egui overlay drawn on top.

mod scene_pass;
mod window_surface;

use crate::camera::Camera3D;
use crate::config::WindowConfig;
use crate::registry::SceneRegistry;
use anyhow::{Context, Result};
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use scene_pass::ScenePass;
pub use window_surface::{SurfaceFrame, WindowSurface};

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One frame's worth of egui output, ready for the painter.
pub struct EguiFrame<'a> {
    pub painter: &'a mut EguiRenderer,
    pub paint_jobs: &'a [egui::ClippedPrimitive],
    pub screen: &'a ScreenDescriptor,
}

pub struct Renderer {
    surface: WindowSurface,
    scene_pass: Option<ScenePass>,
}

impl Renderer {
    pub fn new(window_cfg: &WindowConfig) -> Self {
        Self { surface: WindowSurface::new(window_cfg), scene_pass: None }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.surface.ensure_window(event_loop)
    }

    pub fn init_scene_pipeline(&mut self) -> Result<()> {
        if self.scene_pass.is_some() {
            return Ok(());
        }
        let device = self.surface.device()?;
        let format = self.surface.surface_format()?;
        self.scene_pass = Some(ScenePass::new(device, format)?);
        Ok(())
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(new_size);
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn window(&self) -> Option<&Window> {
        self.surface.window()
    }

    pub fn device(&self) -> Result<&wgpu::Device> {
        self.surface.device()
    }

    pub fn queue(&self) -> Result<&wgpu::Queue> {
        self.surface.queue()
    }

    pub fn surface_format(&self) -> Result<wgpu::TextureFormat> {
        self.surface.surface_format()
    }

    /// Renders one frame: scene pass, then the egui overlay, then present.
    /// Surface errors come back as `Err` after any reconfiguration; the
    /// caller just skips the frame.
    pub fn render_frame(
        &mut self,
        registry: &SceneRegistry,
        camera: &Camera3D,
        egui_frame: Option<EguiFrame<'_>>,
    ) -> Result<()> {
        let frame = self.surface.acquire_surface_frame()?;
        let scene_pass = self.scene_pass.as_mut().context("Scene pipeline not initialized")?;
        let device = self.surface.device()?;
        let queue = self.surface.queue()?;
        let depth_view = self.surface.depth_view()?;
        let viewport = self.surface.size();

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

        scene_pass.sync_fragment(device, registry);
        scene_pass.render(
            device,
            queue,
            &mut encoder,
            frame.view(),
            depth_view,
            registry,
            camera,
            viewport,
        );

        let mut commands = Vec::new();
        if let Some(ui) = egui_frame {
            commands =
                ui.painter.update_buffers(device, queue, &mut encoder, ui.paint_jobs, ui.screen);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let pass = unsafe {
                std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                    &mut pass,
                )
            };
            ui.painter.render(pass, ui.paint_jobs, ui.screen);
        }

        commands.push(encoder.finish());
        queue.submit(commands);
        frame.present();
        Ok(())
    }
}

//! Hand-off of the scene to a renderer.
//!
//! Rasterization lives behind the [`Renderer`] trait. The viewer calls it once
//! per frame with the current scene and camera. [`crate::gpu::GpuRenderer`]
//! draws into the window; [`HeadlessRenderer`] only records what would have
//! been drawn.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use winit::window::Window;

use crate::{camera::ArcRotateCamera, data_structures::scene_graph::SceneGraph};

/// Builds a renderer for a freshly created window.
pub type RendererConstructor =
    Box<dyn FnOnce(Arc<Window>) -> LocalBoxFuture<'static, anyhow::Result<Box<dyn Renderer>>>>;

pub trait Renderer {
    /// Called whenever the surface changes size.
    fn resize(&mut self, width: u32, height: u32);

    /// Draws every visible mesh of `scene` as seen from `camera`.
    fn render(&mut self, scene: &SceneGraph, camera: &ArcRotateCamera) -> anyhow::Result<()>;
}

/// What a frame contained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub visible_meshes: usize,
    pub shadow_casters: usize,
    pub visible_vertices: usize,
}

impl FrameStats {
    pub fn collect(scene: &SceneGraph, frame: u64) -> Self {
        let (visible_meshes, visible_vertices) = scene
            .visible_meshes()
            .fold((0, 0), |(meshes, vertices), (_, mesh)| {
                (meshes + 1, vertices + mesh.geometry.vertex_count())
            });
        Self {
            frame,
            visible_meshes,
            shadow_casters: scene.shadow_generator.casters().len(),
            visible_vertices,
        }
    }
}

/// A renderer without output; keeps statistics of the last frame.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    size: (u32, u32),
    last: FrameStats,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constructor() -> RendererConstructor {
        Box::new(|_window| Box::pin(async { Ok(Box::new(HeadlessRenderer::new()) as Box<dyn Renderer>) }))
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Renderer for HeadlessRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &ArcRotateCamera) -> anyhow::Result<()> {
        let stats = FrameStats::collect(scene, self.last.frame + 1);
        if stats.visible_meshes != self.last.visible_meshes {
            log::debug!(
                "Frame {}: {} visible meshes, camera at {:?}",
                stats.frame,
                stats.visible_meshes,
                camera.position()
            );
        }
        self.last = stats;
        Ok(())
    }
}

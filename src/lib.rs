//! flow-tones
//!
//! A cross-platform character viewer for skin-tone variants. Every variant of
//! a character is imported concurrently, kept hidden while the others are
//! still loading, and once all of them have arrived exactly one is revealed.
//! A slider then switches between the variants without any further loading.
//! Runs natively (tokio) and in the browser (wasm-bindgen).
//!
//! High-level modules
//! - `camera`: orbit camera with inertia and its pointer controller
//! - `context`: viewer configuration and the window context
//! - `coordinator`: the load coordinator and its state machine
//! - `data_structures`: tones, the tone registry, meshes, materials and the scene
//! - `flow`: the winit event loop tying everything together
//! - `gpu`: the wgpu renderer drawing into the window
//! - `resources`: asynchronous glTF and texture import
//! - `pipelines`: the mesh pipeline, its shader and uniforms
//! - `render`: the renderer seam and a headless implementation
//! - `ui`: the tone slider, keyboard and DOM bindings
//!

pub mod camera;
pub mod context;
pub mod coordinator;
pub mod data_structures;
pub mod flow;
pub mod gpu;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod ui;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point: shows the stock tone variants in `<canvas id="canvas">`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run(
        context::ViewerConfig::default(),
        resources::GltfImporter::new(),
        gpu::GpuRenderer::constructor(),
    )
    .map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}

//! Viewer data structures: tones, meshes, materials and the scene.
//!
//! - `tone` holds tone keys, their quantization and the configured tone set
//! - `registry` maps every tone to the meshes it loaded
//! - `mesh` contains CPU-side geometry and the cylinder builder
//! - `material` and `texture` describe surfaces and image data
//! - `transform` is a decomposed translation/rotation/scale
//! - `scene_graph` owns every mesh plus light, shadows and environment

pub mod material;
pub mod mesh;
pub mod registry;
pub mod scene_graph;
pub mod texture;
pub mod tone;
pub mod transform;

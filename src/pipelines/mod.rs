//! Render pipelines and the GPU-side data they read.

pub mod mesh;

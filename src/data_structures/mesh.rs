//! CPU-side mesh data and procedural mesh builders.

use std::f32::consts::TAU;

use crate::data_structures::{material::Material, transform::Transform};

/// Vertex and index streams of a single mesh primitive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A mesh as produced by importers and builders, before it is added to a scene.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub geometry: Geometry,
    pub transform: Transform,
    pub material: Option<Material>,
}

impl MeshData {
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            transform: Transform::default(),
            material: None,
        }
    }

    /// A geometry-less node that groups the meshes of an imported file.
    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, Geometry::default())
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CylinderOptions {
    pub diameter: f32,
    pub height: f32,
    pub tessellation: u32,
}

impl Default for CylinderOptions {
    fn default() -> Self {
        Self {
            diameter: 1.0,
            height: 2.0,
            tessellation: 24,
        }
    }
}

/// Builds a capped cylinder centred on the origin, its axis along +Y.
///
/// The side wall duplicates the seam vertex so uvs wrap cleanly; each cap is a
/// triangle fan around its own centre vertex.
pub fn cylinder(name: impl Into<String>, options: CylinderOptions) -> MeshData {
    let segments = options.tessellation.max(3);
    let radius = options.diameter / 2.0;
    let half = options.height / 2.0;
    let mut geometry = Geometry::default();

    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let (sin, cos) = (u * TAU).sin_cos();
        for (y, v) in [(-half, 0.0), (half, 1.0)] {
            geometry.positions.push([cos * radius, y, sin * radius]);
            geometry.normals.push([cos, 0.0, sin]);
            geometry.uvs.push([u, v]);
        }
    }
    for i in 0..segments {
        let bottom = i * 2;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;
        geometry
            .indices
            .extend_from_slice(&[bottom, top, next_bottom, top, next_top, next_bottom]);
    }

    for (y, normal_y) in [(half, 1.0), (-half, -1.0)] {
        let centre = geometry.positions.len() as u32;
        geometry.positions.push([0.0, y, 0.0]);
        geometry.normals.push([0.0, normal_y, 0.0]);
        geometry.uvs.push([0.5, 0.5]);
        for i in 0..=segments {
            let (sin, cos) = (i as f32 / segments as f32 * TAU).sin_cos();
            geometry.positions.push([cos * radius, y, sin * radius]);
            geometry.normals.push([0.0, normal_y, 0.0]);
            geometry.uvs.push([0.5 + cos * 0.5, 0.5 + sin * 0.5]);
        }
        for i in 0..segments {
            let current = centre + 1 + i;
            let next = current + 1;
            // top cap faces up, bottom cap faces down
            if normal_y > 0.0 {
                geometry.indices.extend_from_slice(&[centre, next, current]);
            } else {
                geometry.indices.extend_from_slice(&[centre, current, next]);
            }
        }
    }

    MeshData::new(name, geometry)
}

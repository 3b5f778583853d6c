//! Scene graph handed to the renderer every frame.
//!
//! The scene owns every mesh in an arena and hands out stable [`MeshId`]
//! handles. Besides the meshes it holds the environment, the directional light
//! and the shadow generator whose render list decides which meshes cast shadows.
//!
//! The [`Scene`] trait is the seam the tone coordinator talks to, so the
//! coordinator can run against any engine that exposes these few operations.

use cgmath::Vector3;

use crate::{
    context::SceneConfig,
    data_structures::{
        material::Material,
        mesh::{self, CylinderOptions, Geometry, MeshData},
        transform::Transform,
    },
};

/// Stable handle of a mesh inside a [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

impl MeshId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Operations the tone coordinator needs from a scene.
pub trait Scene {
    fn add_mesh(&mut self, data: MeshData) -> MeshId;

    fn set_visible(&mut self, id: MeshId, visible: bool);

    fn is_visible(&self, id: MeshId) -> bool;

    /// Moves the mesh along the vertical axis by `dy`.
    fn offset_y(&mut self, id: MeshId, dy: f32);

    fn set_receive_shadows(&mut self, id: MeshId, receive: bool);

    /// Appends the mesh to the shadow map render list. No duplicate check.
    fn add_shadow_caster(&mut self, id: MeshId);

    fn material_mut(&mut self, id: MeshId) -> Option<&mut Material>;
}

/// A mesh living in the scene.
#[derive(Clone, Debug)]
pub struct MeshNode {
    pub name: String,
    pub geometry: Geometry,
    pub transform: Transform,
    pub visible: bool,
    pub receive_shadows: bool,
    pub material: Option<Material>,
}

impl From<MeshData> for MeshNode {
    fn from(data: MeshData) -> Self {
        Self {
            name: data.name,
            geometry: data.geometry,
            transform: data.transform,
            visible: true,
            receive_shadows: false,
            material: data.material,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub name: String,
    pub direction: Vector3<f32>,
    pub position: Vector3<f32>,
}

/// Shadow map settings and the list of meshes rendered into the map.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowGenerator {
    pub map_size: u32,
    pub use_blur_exponential_shadow_map: bool,
    pub blur_kernel: u32,
    render_list: Vec<MeshId>,
}

impl ShadowGenerator {
    pub fn new(map_size: u32, blur_kernel: u32) -> Self {
        Self {
            map_size,
            use_blur_exponential_shadow_map: true,
            blur_kernel,
            render_list: Vec::new(),
        }
    }

    pub fn add_caster(&mut self, id: MeshId) {
        self.render_list.push(id);
    }

    pub fn casters(&self) -> &[MeshId] {
        &self.render_list
    }
}

/// Skybox and ground colours of the default environment.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub skybox_color: [f32; 3],
    pub ground_color: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    meshes: Vec<MeshNode>,
    pub environment: Option<Environment>,
    pub light: Option<DirectionalLight>,
    pub shadow_generator: ShadowGenerator,
}

impl SceneGraph {
    /// An empty scene without environment or light.
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            environment: None,
            light: None,
            shadow_generator: ShadowGenerator::new(1024, 32),
        }
    }

    /// Environment, light, shadow generator and pedestals as configured.
    pub fn with_environment(config: &SceneConfig) -> Self {
        let mut scene = Self {
            meshes: Vec::new(),
            environment: Some(Environment {
                skybox_color: config.skybox_color,
                ground_color: config.ground_color,
            }),
            light: Some(DirectionalLight {
                name: "dir01".to_string(),
                direction: config.light_direction.into(),
                position: config.light_position.into(),
            }),
            shadow_generator: ShadowGenerator::new(config.shadow_map_size, config.shadow_blur_kernel),
        };
        for pedestal in &config.pedestals {
            let data = mesh::cylinder(
                pedestal.name.clone(),
                CylinderOptions {
                    diameter: pedestal.diameter,
                    height: pedestal.height,
                    tessellation: config.tessellation,
                },
            )
            .with_transform(Vector3::from(pedestal.position).into())
            .with_material(Material::standard(
                format!("{}Mat", pedestal.name),
                [1.0, 1.0, 1.0],
            ));
            let id = scene.add_mesh(data);
            scene.set_receive_shadows(id, true);
        }
        scene
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshNode> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut MeshNode> {
        self.meshes.get_mut(id.0)
    }

    pub fn find_by_name(&self, name: &str) -> Option<MeshId> {
        self.meshes
            .iter()
            .position(|mesh| mesh.name == name)
            .map(MeshId)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &MeshNode)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(idx, mesh)| (MeshId(idx), mesh))
    }

    pub fn visible_meshes(&self) -> impl Iterator<Item = (MeshId, &MeshNode)> {
        self.meshes().filter(|(_, mesh)| mesh.visible)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    fn with_mesh(&mut self, id: MeshId, mutation: impl FnOnce(&mut MeshNode)) {
        match self.meshes.get_mut(id.0) {
            Some(mesh) => mutation(mesh),
            None => log::warn!("Mesh {:?} is not part of this scene", id),
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for SceneGraph {
    fn add_mesh(&mut self, data: MeshData) -> MeshId {
        self.meshes.push(data.into());
        MeshId(self.meshes.len() - 1)
    }

    fn set_visible(&mut self, id: MeshId, visible: bool) {
        self.with_mesh(id, |mesh| mesh.visible = visible);
    }

    fn is_visible(&self, id: MeshId) -> bool {
        self.mesh(id).is_some_and(|mesh| mesh.visible)
    }

    fn offset_y(&mut self, id: MeshId, dy: f32) {
        self.with_mesh(id, |mesh| mesh.transform.position.y += dy);
    }

    fn set_receive_shadows(&mut self, id: MeshId, receive: bool) {
        self.with_mesh(id, |mesh| mesh.receive_shadows = receive);
    }

    fn add_shadow_caster(&mut self, id: MeshId) {
        self.shadow_generator.add_caster(id);
    }

    fn material_mut(&mut self, id: MeshId) -> Option<&mut Material> {
        self.meshes
            .get_mut(id.0)
            .and_then(|mesh| mesh.material.as_mut())
    }
}

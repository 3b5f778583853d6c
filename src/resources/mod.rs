use std::future::Future;

use anyhow::{Context, bail};
use futures::FutureExt;

use crate::{
    context::AssetRef,
    data_structures::{
        material::{Material, PbrMaterial},
        mesh::{Geometry, MeshData},
        texture::Texture,
        transform::Transform,
    },
    resources::texture::{load_binary, load_texture},
};

/**
 * This module contains all logic for loading meshes and textures from external files.
 */
pub mod texture;

/// Name of the container entry that precedes the meshes of every imported file.
pub const ROOT_MESH_NAME: &str = "__root__";

/// Everything one tone variant produced: its meshes and an optional albedo override.
#[derive(Clone, Debug, Default)]
pub struct ImportedMeshes {
    pub meshes: Vec<MeshData>,
    pub albedo: Option<Texture>,
}

/// Import futures are spawned on tokio natively and therefore `Send`; the
/// browser futures (reqwest, wasm-bindgen) are not.
#[cfg(not(target_arch = "wasm32"))]
pub type ImportFuture = futures::future::BoxFuture<'static, anyhow::Result<ImportedMeshes>>;
#[cfg(target_arch = "wasm32")]
pub type ImportFuture = futures::future::LocalBoxFuture<'static, anyhow::Result<ImportedMeshes>>;

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn box_future<T>(fut: impl Future<Output = T> + Send + 'static) -> futures::future::BoxFuture<'static, T> {
    fut.boxed()
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn box_future<T>(fut: impl Future<Output = T> + 'static) -> futures::future::LocalBoxFuture<'static, T> {
    fut.boxed_local()
}

/// Turns an asset reference into meshes, asynchronously.
///
/// Every call starts an independent import; the returned future owns all it
/// needs so it can run while the caller continues issuing further imports.
pub trait MeshImporter {
    fn import(&self, asset: &AssetRef) -> ImportFuture;
}

/// Imports glTF/GLB characters from the asset store.
#[derive(Clone, Debug)]
pub struct GltfImporter {
    /// Rebind the albedo override mirrored on both axes.
    pub flip_albedo: bool,
}

impl GltfImporter {
    pub fn new() -> Self {
        Self { flip_albedo: true }
    }
}

impl Default for GltfImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshImporter for GltfImporter {
    fn import(&self, asset: &AssetRef) -> ImportFuture {
        let model = asset.model.clone();
        let albedo = asset.albedo.clone();
        let flip = self.flip_albedo;
        box_future(async move {
            let meshes = load_model_gltf(&model).await?;
            let albedo = match albedo {
                Some(file_name) => Some(load_texture(&file_name, flip).await?),
                None => None,
            };
            Ok(ImportedMeshes { meshes, albedo })
        })
    }
}

/// Resolves `uri` relative to the directory of `file_name`.
pub fn resolve_relative(file_name: &str, uri: &str) -> String {
    match file_name.rfind('/') {
        Some(idx) => format!("{}/{}", &file_name[..idx], uri),
        None => uri.to_string(),
    }
}

/// Loads a glTF or GLB file.
///
/// The result starts with a geometry-less [`ROOT_MESH_NAME`] container,
/// followed by one mesh per primitive in scene order with node transforms
/// baked into world space.
pub async fn load_model_gltf(file_name: &str) -> anyhow::Result<Vec<MeshData>> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("Could not parse glTF {}", file_name))?;

    // Collect sources first so no document borrow is held across the awaits below
    let sources: Vec<Option<String>> = gltf
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => None,
            gltf::buffer::Source::Uri(uri) => Some(uri.to_string()),
        })
        .collect();

    let mut buffer_data: Vec<Vec<u8>> = Vec::with_capacity(sources.len());
    for source in sources {
        match source {
            None => {
                let blob = gltf
                    .blob
                    .clone()
                    .with_context(|| format!("{} references a binary chunk it does not contain", file_name))?;
                buffer_data.push(blob);
            }
            Some(uri) if uri.starts_with("data:") => {
                bail!("{} embeds its buffers as data URIs, which are not supported", file_name)
            }
            Some(uri) => {
                let bin = load_binary(&resolve_relative(file_name, &uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    let materials: Vec<Material> = gltf
        .materials()
        .map(|material| to_material(&material, file_name))
        .collect();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{} contains no scene", file_name))?;

    let mut meshes = vec![MeshData::container(ROOT_MESH_NAME)];
    for node in scene.nodes() {
        collect_meshes(&node, &Transform::default(), &buffer_data, &materials, &mut meshes);
    }
    log::debug!("Loaded {} meshes from {}", meshes.len() - 1, file_name);

    Ok(meshes)
}

fn to_material(material: &gltf::Material, file_name: &str) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let albedo = pbr.base_color_texture().map(|info| {
        let source = match info.texture().source().source() {
            gltf::image::Source::Uri { uri, .. } => resolve_relative(file_name, uri),
            gltf::image::Source::View { view, .. } => {
                format!("{}#bufferView{}", file_name, view.index())
            }
        };
        Texture::new(source)
    });
    let name = material
        .name()
        .map(String::from)
        .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0)));
    Material::Pbr(PbrMaterial {
        name,
        base_color: pbr.base_color_factor(),
        albedo,
    })
}

fn collect_meshes(
    node: &gltf::Node,
    parent: &Transform,
    buffers: &[Vec<u8>],
    materials: &[Material],
    out: &mut Vec<MeshData>,
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let world = *parent * Transform::from_decomposed(translation, rotation, scale);

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .or(node.name())
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let primitive_count = mesh.primitives().count();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

            let geometry = Geometry {
                positions: reader
                    .read_positions()
                    .map(|iter| iter.collect())
                    .unwrap_or_default(),
                normals: reader
                    .read_normals()
                    .map(|iter| iter.collect())
                    .unwrap_or_default(),
                uvs: reader
                    .read_tex_coords(0)
                    .map(|iter| iter.into_f32().collect())
                    .unwrap_or_default(),
                indices: reader
                    .read_indices()
                    .map(|iter| iter.into_u32().collect())
                    .unwrap_or_default(),
            };
            if geometry.is_empty() {
                log::warn!("Primitive {} of mesh {} has no positions", primitive.index(), mesh_name);
            }

            let name = if primitive_count > 1 {
                format!("{}_primitive{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            };
            let material = primitive
                .material()
                .index()
                .and_then(|idx| materials.get(idx).cloned());

            out.push(MeshData {
                name,
                geometry,
                transform: world,
                material,
            });
        }
    }

    for child in node.children() {
        collect_meshes(&child, &world, buffers, materials, out);
    }
}

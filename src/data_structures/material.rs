//! Material kinds attached to scene meshes.

use crate::data_structures::texture::Texture;

/// Metallic-roughness material as produced by the glTF importer.
#[derive(Clone, Debug)]
pub struct PbrMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub albedo: Option<Texture>,
}

/// Flat diffuse material used for procedural meshes such as the pedestals.
#[derive(Clone, Debug)]
pub struct StandardMaterial {
    pub name: String,
    pub diffuse_color: [f32; 3],
}

#[derive(Clone, Debug)]
pub enum Material {
    Pbr(PbrMaterial),
    Standard(StandardMaterial),
}

impl Material {
    pub fn pbr(name: impl Into<String>, albedo: Option<Texture>) -> Self {
        Self::Pbr(PbrMaterial {
            name: name.into(),
            base_color: [1.0; 4],
            albedo,
        })
    }

    pub fn standard(name: impl Into<String>, diffuse_color: [f32; 3]) -> Self {
        Self::Standard(StandardMaterial {
            name: name.into(),
            diffuse_color,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pbr(pbr) => &pbr.name,
            Self::Standard(standard) => &standard.name,
        }
    }

    pub fn albedo(&self) -> Option<&Texture> {
        match self {
            Self::Pbr(pbr) => pbr.albedo.as_ref(),
            Self::Standard(_) => None,
        }
    }

    /// The albedo slot, if this material already carries an albedo texture.
    ///
    /// Standard materials and PBR materials without a base color texture
    /// return `None`, so rebinding never adds a slot the mesh was not authored with.
    pub fn albedo_slot_mut(&mut self) -> Option<&mut Texture> {
        match self {
            Self::Pbr(pbr) => pbr.albedo.as_mut(),
            Self::Standard(_) => None,
        }
    }
}

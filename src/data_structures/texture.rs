//! Texture references and decoded texture data.
//!
//! This module provides [`Texture`], the texture reference bound to a material
//! slot, and [`TextureData`], decoded RGBA8 pixels produced from image files.

use std::sync::Arc;

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// Decoded RGBA8 pixels of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// Decode raw image file data (PNG, JPEG, etc.).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data
    /// * `format` is an optional file extension hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(bytes: &[u8], format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &image::DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        }
    }
}

/// A texture bound to a material slot.
///
/// `u_scale`/`v_scale` of `-1.0` mirror the texture along that axis; the
/// renderer applies them when sampling. `data` is only present for textures
/// that were decoded by this crate (albedo overrides).
#[derive(Clone, Debug)]
pub struct Texture {
    pub source: String,
    pub u_scale: f32,
    pub v_scale: f32,
    pub data: Option<Arc<TextureData>>,
}

impl Texture {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            u_scale: 1.0,
            v_scale: 1.0,
            data: None,
        }
    }

    /// Mirrors both axes, the orientation the baked character textures are authored in.
    pub fn flipped(mut self) -> Self {
        self.u_scale = -1.0;
        self.v_scale = -1.0;
        self
    }

    pub fn with_data(mut self, data: TextureData) -> Self {
        self.data = Some(Arc::new(data));
        self
    }
}

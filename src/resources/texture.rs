use std::path::Path;

use anyhow::Context;

use crate::data_structures::texture::{Texture, TextureData};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    if let Ok(url) = reqwest::Url::parse(file_name) {
        return Ok(url);
    }
    let window = web_sys::window().context("No browser window available")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("Could not read the page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name.trim_start_matches('/'))?)
}

/// Copy of `assets/` the build script places in `OUT_DIR`.
#[cfg(not(target_arch = "wasm32"))]
pub const BUNDLED_ASSET_DIR: &str = concat!(env!("OUT_DIR"), "/assets");

/// Where a relative asset name is read from natively: `./assets` if the file
/// is there, otherwise the bundled copy if that has it. Absolute paths are kept.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_path(file_name: &str) -> std::path::PathBuf {
    let local = Path::new("./").join("assets").join(file_name);
    if local.exists() {
        return local;
    }
    let bundled = Path::new(BUNDLED_ASSET_DIR).join(file_name);
    if bundled.exists() { bundled } else { local }
}

/// Reads an asset. Relative names resolve through [`asset_path`] natively and
/// against `<origin>/assets/` in the browser; absolute paths and URLs are used as is.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read asset {}", path.display()))?
    };

    Ok(data)
}

/// Loads and decodes an image. `flip` mirrors both texture axes when it is sampled.
pub async fn load_texture(file_name: &str, flip: bool) -> anyhow::Result<Texture> {
    let bytes = load_binary(file_name).await?;
    let format = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    let data = TextureData::from_bytes(&bytes, format)
        .with_context(|| format!("Could not decode texture {}", file_name))?;
    let texture = Texture::new(file_name).with_data(data);
    Ok(if flip { texture.flipped() } else { texture })
}

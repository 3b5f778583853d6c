//! Viewer configuration and the per-window runtime context.
//!
//! Every tunable the viewer uses lives in [`ViewerConfig`] with defaults that
//! reproduce the stock character scene. Adjust the fields before calling
//! [`crate::flow::run`].

use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::{ArcRotateCamera, CameraController},
    coordinator::LoadFailurePolicy,
    data_structures::tone::{DEFAULT_TONE_SCALE, ToneKey, ToneSet},
};

/// Files that make up one tone variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    /// glTF/GLB file of the character.
    pub model: String,
    /// Optional image bound to the albedo slot of the character mesh after loading.
    pub albedo: Option<String>,
}

impl AssetRef {
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            albedo: None,
        }
    }

    pub fn with_albedo(mut self, albedo: impl Into<String>) -> Self {
        self.albedo = Some(albedo.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToneAsset {
    pub key: ToneKey,
    pub asset: AssetRef,
}

/// Bounds, start value and scale of the tone slider.
#[derive(Clone, Debug, PartialEq)]
pub struct SliderConfig {
    pub min: i32,
    pub max: i32,
    pub initial: i32,
    pub scale: f64,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 5,
            initial: 0,
            scale: DEFAULT_TONE_SCALE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PedestalConfig {
    pub name: String,
    pub diameter: f32,
    pub height: f32,
    pub position: [f32; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub skybox_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub light_direction: [f32; 3],
    pub light_position: [f32; 3],
    pub shadow_map_size: u32,
    pub shadow_blur_kernel: u32,
    pub tessellation: u32,
    pub pedestals: Vec<PedestalConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            skybox_color: [0.8, 0.8, 0.8],
            ground_color: [0.0, 0.0, 0.0],
            light_direction: [-1.0, -2.0, -1.0],
            light_position: [20.0, 40.0, 20.0],
            shadow_map_size: 1024,
            shadow_blur_kernel: 32,
            tessellation: 64,
            pedestals: vec![
                PedestalConfig {
                    name: "cylinder_top".to_string(),
                    diameter: 2.0,
                    height: 0.2,
                    position: [0.0; 3],
                },
                PedestalConfig {
                    name: "cylinder_bottom".to_string(),
                    diameter: 3.0,
                    height: 0.1,
                    position: [0.0; 3],
                },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub tones: Vec<ToneAsset>,
    pub slider: SliderConfig,
    /// Vertical offset applied to every loaded character mesh so it stands on the pedestal.
    pub mesh_y_offset: f32,
    /// Index, within a tone's mesh list, of the mesh that receives the albedo override.
    pub albedo_target: usize,
    pub failure_policy: LoadFailurePolicy,
    pub camera: ArcRotateCamera,
    pub scene: SceneConfig,
    pub canvas_id: String,
    pub slider_element_id: String,
    pub display_element_id: String,
}

impl ViewerConfig {
    /// One tone variant per slider position, models named `pey_tone_<key>.gltf`.
    pub fn tone_variants() -> Self {
        let slider = SliderConfig::default();
        let tones = ToneSet::from_control_range(slider.min, slider.max, slider.scale)
            .iter()
            .map(|key| ToneAsset {
                key: key.clone(),
                asset: AssetRef::model(format!("pey_tone_{}.gltf", key)),
            })
            .collect();
        Self::with_tones(tones, slider)
    }

    /// A single character with its baked texture rebound after loading.
    pub fn single_character(model: &str, albedo: Option<&str>) -> Self {
        let mut asset = AssetRef::model(model);
        asset.albedo = albedo.map(String::from);
        let slider = SliderConfig {
            min: 0,
            max: 0,
            initial: 0,
            scale: DEFAULT_TONE_SCALE,
        };
        let tones = vec![ToneAsset {
            key: ToneKey::quantize(0.0, slider.scale),
            asset,
        }];
        Self::with_tones(tones, slider)
    }

    pub fn with_tones(tones: Vec<ToneAsset>, slider: SliderConfig) -> Self {
        Self {
            title: "flow-tones".to_string(),
            tones,
            slider,
            mesh_y_offset: 0.06,
            albedo_target: 1,
            failure_policy: LoadFailurePolicy::default(),
            camera: ArcRotateCamera::default(),
            scene: SceneConfig::default(),
            canvas_id: "canvas".to_string(),
            slider_element_id: "toneSlider".to_string(),
            display_element_id: "toneValue".to_string(),
        }
    }

    pub fn tone_set(&self) -> ToneSet {
        self.tones.iter().map(|tone| tone.key.clone()).collect()
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::tone_variants()
    }
}

/// Window, camera and surface size of a running viewer.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub camera: ArcRotateCamera,
    pub controller: CameraController,
    pub width: u32,
    pub height: u32,
}

impl Context {
    pub fn new(window: Arc<Window>, camera: ArcRotateCamera) -> Self {
        let size = window.inner_size();
        Self {
            window,
            camera,
            controller: CameraController::new(),
            width: size.width,
            height: size.height,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

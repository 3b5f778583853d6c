//! Tone-variant load coordination.
//!
//! The [`ToneCoordinator`] issues one import per registered tone, stores each
//! result in its [`ToneRegistry`] as it arrives and reveals exactly one tone
//! once every import has completed. After that it only reacts to slider input.
//!
//! # Lifecycle
//!
//! `Idle -> Loading { loaded, expected } -> Ready`
//!
//! 1. [`ToneCoordinator::begin_load`] is called once per tone and returns a
//!    [`PendingLoad`]. The caller runs these futures however its platform
//!    allows (spawned on tokio, `spawn_local` in the browser, or all at once via
//!    [`ToneCoordinator::run_to_ready`]).
//! 2. Each resolved [`LoadCompletion`] is handed back through
//!    [`ToneCoordinator::complete_load`] on the thread that owns the scene, in
//!    whatever order the imports finished.
//! 3. The completion that brings the count to `expected` switches to `Ready`
//!    and applies visibility for the current control value, exactly once.
//!
//! Meshes are hidden as soon as they are added, so nothing of a tone is visible
//! before the reveal.

use std::collections::HashSet;

use anyhow::bail;
use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::{
    context::{AssetRef, ViewerConfig},
    data_structures::{
        registry::ToneRegistry,
        scene_graph::{MeshId, Scene},
        tone::{DEFAULT_TONE_SCALE, ToneKey, ToneSet},
    },
    resources::{ImportedMeshes, MeshImporter, box_future},
};

/// What to do when an import fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadFailurePolicy {
    /// Log the failure and leave the tone unloaded. The coordinator never
    /// reaches `Ready`, so no tone is ever revealed.
    #[default]
    Stall,
    /// Log the failure and count the tone as loaded with no meshes, so the
    /// remaining tones are still revealed.
    CompleteEmpty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading { loaded: usize, expected: usize },
    Ready,
}

/// Outcome of feeding one completion into the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadEvent {
    /// The tone was stored; more are outstanding.
    Progress { loaded: usize, expected: usize },
    /// The last tone was stored and `active` was revealed.
    Ready { active: ToneKey },
    /// The import failed and the failure policy stalls the coordinator.
    Failed { key: ToneKey },
    /// The completion was unexpected (unknown tone or delivered twice) and was dropped.
    Ignored { key: ToneKey },
}

/// Result of a single import, tagged with the tone it was started for.
#[derive(Debug)]
pub struct LoadCompletion {
    pub key: ToneKey,
    pub result: anyhow::Result<ImportedMeshes>,
}

#[cfg(not(target_arch = "wasm32"))]
pub type PendingLoad = futures::future::BoxFuture<'static, LoadCompletion>;
#[cfg(target_arch = "wasm32")]
pub type PendingLoad = futures::future::LocalBoxFuture<'static, LoadCompletion>;

/// Side effects applied to every loaded mesh, and how the slider maps to tones.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorSettings {
    pub scale: f64,
    pub mesh_y_offset: f32,
    pub albedo_target: usize,
    pub failure_policy: LoadFailurePolicy,
    pub initial_control_value: f64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_TONE_SCALE,
            mesh_y_offset: 0.06,
            albedo_target: 1,
            failure_policy: LoadFailurePolicy::default(),
            initial_control_value: 0.0,
        }
    }
}

impl From<&ViewerConfig> for CoordinatorSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            scale: config.slider.scale,
            mesh_y_offset: config.mesh_y_offset,
            albedo_target: config.albedo_target,
            failure_policy: config.failure_policy,
            initial_control_value: config.slider.initial as f64,
        }
    }
}

#[derive(Debug)]
pub struct ToneCoordinator {
    tones: ToneSet,
    registry: ToneRegistry,
    requested: HashSet<ToneKey>,
    loaded: usize,
    state: LoadState,
    control_value: f64,
    settings: CoordinatorSettings,
}

impl ToneCoordinator {
    pub fn new(tones: ToneSet, settings: CoordinatorSettings) -> Self {
        let registry = ToneRegistry::new(&tones);
        Self {
            tones,
            registry,
            requested: HashSet::new(),
            loaded: 0,
            state: LoadState::Idle,
            control_value: settings.initial_control_value,
            settings,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.tone_set(), config.into())
    }

    /// Starts the import of one tone.
    ///
    /// Fails without side effects if the tone is not registered or was
    /// requested before. The import itself runs when the returned future is polled.
    pub fn begin_load<I>(
        &mut self,
        key: &ToneKey,
        asset: &AssetRef,
        importer: &I,
    ) -> anyhow::Result<PendingLoad>
    where
        I: MeshImporter + ?Sized,
    {
        if !self.tones.contains(key) {
            bail!("Tone {} is not registered", key);
        }
        if self.requested.contains(key) {
            bail!("Tone {} was already requested", key);
        }
        self.requested.insert(key.clone());
        if self.state == LoadState::Idle {
            self.state = LoadState::Loading {
                loaded: 0,
                expected: self.tones.len(),
            };
        }
        log::debug!("Loading tone {} from {}", key, asset.model);

        let key = key.clone();
        let import = importer.import(asset);
        Ok(box_future(async move {
            LoadCompletion {
                key,
                result: import.await,
            }
        }))
    }

    /// Stores a finished import and reveals the selected tone if it was the last one.
    pub fn complete_load<S>(&mut self, completion: LoadCompletion, scene: &mut S) -> LoadEvent
    where
        S: Scene + ?Sized,
    {
        let LoadCompletion { key, result } = completion;
        if !self.requested.contains(&key) || self.registry.is_populated(&key) {
            log::warn!("Dropping unexpected completion for tone {}", key);
            return LoadEvent::Ignored { key };
        }

        let imported = match result {
            Ok(imported) => imported,
            Err(e) => {
                log::error!("Loading tone {} failed: {:#}", key, e);
                match self.settings.failure_policy {
                    LoadFailurePolicy::Stall => return LoadEvent::Failed { key },
                    LoadFailurePolicy::CompleteEmpty => ImportedMeshes::default(),
                }
            }
        };

        let ids = self.add_to_scene(&key, imported, scene);
        if let Err(e) = self.registry.insert(key.clone(), ids) {
            log::warn!("{}", e);
            return LoadEvent::Ignored { key };
        }
        self.loaded += 1;

        let expected = self.tones.len();
        if self.loaded < expected {
            self.state = LoadState::Loading {
                loaded: self.loaded,
                expected,
            };
            log::debug!("Tone {} loaded ({}/{})", key, self.loaded, expected);
            return LoadEvent::Progress {
                loaded: self.loaded,
                expected,
            };
        }

        self.state = LoadState::Ready;
        let active = self.apply_visibility(self.control_value, scene);
        log::info!("All {} tones loaded, showing tone {}", expected, active);
        LoadEvent::Ready { active }
    }

    fn add_to_scene<S>(&self, key: &ToneKey, imported: ImportedMeshes, scene: &mut S) -> Vec<MeshId>
    where
        S: Scene + ?Sized,
    {
        let ids: Vec<MeshId> = imported
            .meshes
            .into_iter()
            .map(|data| {
                let id = scene.add_mesh(data);
                scene.set_visible(id, false);
                scene.offset_y(id, self.settings.mesh_y_offset);
                scene.add_shadow_caster(id);
                scene.set_receive_shadows(id, true);
                id
            })
            .collect();

        if let Some(texture) = imported.albedo {
            let slot = ids
                .get(self.settings.albedo_target)
                .and_then(|&id| scene.material_mut(id))
                .and_then(|material| material.albedo_slot_mut());
            match slot {
                Some(slot) => *slot = texture,
                None => log::warn!(
                    "Mesh {} of tone {} has no albedo slot, keeping its texture",
                    self.settings.albedo_target,
                    key
                ),
            }
        }
        ids
    }

    /// Shows the meshes of the tone selected by `control_value` and hides all others.
    ///
    /// Tones that have not loaded yet are skipped. Returns the selected key,
    /// which matches no tone if the value is out of range.
    pub fn apply_visibility<S>(&self, control_value: f64, scene: &mut S) -> ToneKey
    where
        S: Scene + ?Sized,
    {
        let active = ToneKey::quantize(control_value, self.settings.scale);
        if !self.tones.contains(&active) {
            log::debug!("Control value {} selects unknown tone {}", control_value, active);
        }
        for (key, meshes) in self.registry.iter() {
            let visible = *key == active;
            for &id in meshes {
                scene.set_visible(id, visible);
            }
        }
        active
    }

    /// Records a new control value and, once ready, applies it.
    ///
    /// Before `Ready` only the value is stored; the reveal picks it up.
    pub fn set_control_value<S>(&mut self, control_value: f64, scene: &mut S) -> ToneKey
    where
        S: Scene + ?Sized,
    {
        self.control_value = control_value;
        if self.is_ready() {
            self.apply_visibility(control_value, scene)
        } else {
            self.active_key()
        }
    }

    /// Runs all pending loads concurrently and applies each completion as it arrives.
    ///
    /// Returns once every future resolved. A load that never resolves keeps
    /// this future pending as well.
    pub async fn run_to_ready<S>(&mut self, pending: Vec<PendingLoad>, scene: &mut S) -> LoadState
    where
        S: Scene + ?Sized,
    {
        let mut pending: FuturesUnordered<PendingLoad> = pending.into_iter().collect();
        while let Some(completion) = pending.next().await {
            self.complete_load(completion, scene);
        }
        self.state.clone()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// `(loaded, expected)`
    pub fn progress(&self) -> (usize, usize) {
        (self.loaded, self.tones.len())
    }

    pub fn control_value(&self) -> f64 {
        self.control_value
    }

    pub fn active_key(&self) -> ToneKey {
        ToneKey::quantize(self.control_value, self.settings.scale)
    }

    pub fn tones(&self) -> &ToneSet {
        &self.tones
    }

    pub fn registry(&self) -> &ToneRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }
}

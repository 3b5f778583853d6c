use std::{cell::RefCell, collections::HashMap};

use flow_tones::{
    context::{AssetRef, ViewerConfig},
    coordinator::{LoadEvent, PendingLoad, ToneCoordinator},
    data_structures::{
        material::Material,
        mesh::{Geometry, MeshData},
        scene_graph::{Scene, SceneGraph},
        texture::Texture,
        tone::ToneKey,
    },
    resources::{ImportFuture, ImportedMeshes, MeshImporter, ROOT_MESH_NAME},
};
use futures::{FutureExt, channel::oneshot};

type Reply = anyhow::Result<ImportedMeshes>;

/// Importer whose loads only finish when the test resolves them.
#[derive(Default)]
pub(crate) struct ChannelImporter {
    senders: RefCell<HashMap<String, oneshot::Sender<Reply>>>,
    imports: RefCell<Vec<String>>,
}

impl ChannelImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes the outstanding import of `model`.
    pub fn resolve(&self, model: &str, result: Reply) {
        let sender = self
            .senders
            .borrow_mut()
            .remove(model)
            .unwrap_or_else(|| panic!("no import of {} is outstanding", model));
        assert!(sender.send(result).is_ok(), "load future was dropped");
    }

    /// Drops the outstanding import of `model` without an answer.
    pub fn abandon(&self, model: &str) {
        self.senders.borrow_mut().remove(model);
    }

    pub fn imports(&self) -> Vec<String> {
        self.imports.borrow().clone()
    }
}

impl MeshImporter for ChannelImporter {
    fn import(&self, asset: &AssetRef) -> ImportFuture {
        let (sender, receiver) = oneshot::channel();
        self.senders.borrow_mut().insert(asset.model.clone(), sender);
        self.imports.borrow_mut().push(asset.model.clone());
        let model = asset.model.clone();
        async move {
            match receiver.await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("import of {} was abandoned", model)),
            }
        }
        .boxed()
    }
}

fn triangle(y: f32) -> Geometry {
    Geometry {
        positions: vec![[0.0, y, 0.0], [1.0, y, 0.0], [0.0, y + 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        indices: vec![0, 1, 2],
    }
}

/// What the importer yields for a character: the root container, the body
/// carrying the baked skin texture and the eyes with a flat material.
pub(crate) fn character(tone: &str) -> ImportedMeshes {
    ImportedMeshes {
        meshes: vec![
            MeshData::container(ROOT_MESH_NAME),
            MeshData::new(format!("body_{}", tone), triangle(0.0))
                .with_material(Material::pbr("skin", Some(Texture::new("baked_skin.png")))),
            MeshData::new(format!("eyes_{}", tone), triangle(1.5))
                .with_material(Material::standard("eyes", [0.1, 0.1, 0.1])),
        ],
        albedo: None,
    }
}

pub(crate) fn character_with_albedo(tone: &str, albedo: &str) -> ImportedMeshes {
    ImportedMeshes {
        albedo: Some(Texture::new(albedo).flipped()),
        ..character(tone)
    }
}

/// A coordinator that has started every configured load against a [`ChannelImporter`].
pub(crate) struct Harness {
    pub coordinator: ToneCoordinator,
    pub scene: SceneGraph,
    pub importer: ChannelImporter,
    pub pending: HashMap<ToneKey, PendingLoad>,
    config: ViewerConfig,
}

impl Harness {
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_scene(config, SceneGraph::new())
    }

    pub fn with_scene(config: ViewerConfig, scene: SceneGraph) -> Self {
        let importer = ChannelImporter::new();
        let mut coordinator = ToneCoordinator::from_config(&config);
        let mut pending = HashMap::new();
        for tone in &config.tones {
            let load = coordinator
                .begin_load(&tone.key, &tone.asset, &importer)
                .expect("every configured tone can be loaded once");
            pending.insert(tone.key.clone(), load);
        }
        Self {
            coordinator,
            scene,
            importer,
            pending,
            config,
        }
    }

    pub fn model_of(&self, key: &str) -> String {
        self.config
            .tones
            .iter()
            .find(|tone| tone.key.as_str() == key)
            .map(|tone| tone.asset.model.clone())
            .unwrap_or_else(|| panic!("tone {} is not configured", key))
    }

    /// Resolves the import of `key` and feeds its completion to the coordinator.
    pub fn finish(&mut self, key: &str, result: anyhow::Result<ImportedMeshes>) -> LoadEvent {
        self.importer.resolve(&self.model_of(key), result);
        let load = self
            .pending
            .remove(&ToneKey::from(key))
            .unwrap_or_else(|| panic!("tone {} is not pending", key));
        let completion = load
            .now_or_never()
            .expect("a resolved import completes without further polling");
        self.coordinator.complete_load(completion, &mut self.scene)
    }

    /// Finishes `key` with a stock character.
    pub fn load(&mut self, key: &str) -> LoadEvent {
        self.finish(key, Ok(character(key)))
    }

    pub fn visible_tones(&self) -> Vec<String> {
        visible_tones(&self.coordinator, &self.scene)
    }
}

/// Tones that have at least one visible mesh, in registration order.
pub(crate) fn visible_tones(coordinator: &ToneCoordinator, scene: &SceneGraph) -> Vec<String> {
    coordinator
        .registry()
        .iter()
        .filter(|(_, meshes)| meshes.iter().any(|&id| scene.is_visible(id)))
        .map(|(key, _)| key.to_string())
        .collect()
}

pub(crate) const ALL_TONES: [&str; 6] = ["0.0", "0.1", "0.2", "0.3", "0.4", "0.5"];

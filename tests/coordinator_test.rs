use flow_tones::{
    context::{AssetRef, SliderConfig, ToneAsset, ViewerConfig},
    coordinator::{
        CoordinatorSettings, LoadCompletion, LoadEvent, LoadFailurePolicy, LoadState, ToneCoordinator,
    },
    data_structures::{
        scene_graph::{Scene, SceneGraph},
        tone::{ToneKey, ToneSet},
    },
    flow::window_title,
    resources::ImportedMeshes,
    ui::ToneSlider,
};
use futures::executor::block_on;

use crate::common::test_utils::{
    ALL_TONES, ChannelImporter, Harness, character, character_with_albedo, visible_tones,
};

mod common;

fn ready_harness(control_value: f64) -> Harness {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    harness
        .coordinator
        .set_control_value(control_value, &mut harness.scene);
    for key in ALL_TONES {
        harness.load(key);
    }
    assert!(harness.coordinator.is_ready());
    harness
}

#[test]
fn should_reveal_only_the_selected_tone_regardless_of_completion_order() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    harness.coordinator.set_control_value(2.0, &mut harness.scene);

    for key in ["0.3", "0.0", "0.5", "0.1", "0.4"] {
        assert!(matches!(harness.load(key), LoadEvent::Progress { .. }));
        assert!(harness.visible_tones().is_empty(), "nothing may show before all tones loaded");
    }

    let event = harness.load("0.2");

    assert_eq!(event, LoadEvent::Ready { active: ToneKey::from("0.2") });
    assert_eq!(harness.visible_tones(), vec!["0.2"]);
}

#[test]
fn should_switch_visibility_when_the_slider_moves_after_ready() {
    let mut harness = ready_harness(2.0);

    let active = harness.coordinator.set_control_value(5.0, &mut harness.scene);

    assert_eq!(active, ToneKey::from("0.5"));
    assert_eq!(harness.visible_tones(), vec!["0.5"]);
    let hidden_before = harness.coordinator.registry().get(&ToneKey::from("0.2")).unwrap();
    assert!(hidden_before.iter().all(|&id| !harness.scene.is_visible(id)));
}

#[test]
fn should_map_slider_bounds_to_the_first_and_last_tone() {
    let mut harness = ready_harness(0.0);
    assert_eq!(harness.visible_tones(), vec!["0.0"]);

    harness.coordinator.set_control_value(5.0, &mut harness.scene);
    assert_eq!(harness.visible_tones(), vec!["0.5"]);
}

#[test]
fn should_never_reveal_anything_while_a_load_is_outstanding() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    for key in ["0.0", "0.1", "0.2", "0.3", "0.4"] {
        harness.load(key);
    }

    assert_eq!(
        harness.coordinator.state(),
        &LoadState::Loading {
            loaded: 5,
            expected: 6
        }
    );
    assert!(harness.visible_tones().is_empty());
    assert_eq!(harness.scene.visible_meshes().count(), 0);

    harness.coordinator.set_control_value(3.0, &mut harness.scene);
    assert!(harness.visible_tones().is_empty(), "slider input must not reveal early");
}

#[test]
fn should_apply_the_latest_slider_value_at_reveal() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    for key in ["0.0", "0.1", "0.2"] {
        harness.load(key);
    }
    harness.coordinator.set_control_value(4.0, &mut harness.scene);
    for key in ["0.3", "0.4", "0.5"] {
        harness.load(key);
    }

    assert_eq!(harness.visible_tones(), vec!["0.4"]);
}

#[test]
fn should_show_exactly_one_tone_after_every_permutation_of_completions() {
    let orders: [[&str; 6]; 4] = [
        ["0.0", "0.1", "0.2", "0.3", "0.4", "0.5"],
        ["0.5", "0.4", "0.3", "0.2", "0.1", "0.0"],
        ["0.2", "0.5", "0.0", "0.4", "0.1", "0.3"],
        ["0.1", "0.3", "0.5", "0.0", "0.2", "0.4"],
    ];
    for order in orders {
        let mut harness = Harness::new(ViewerConfig::tone_variants());
        harness.coordinator.set_control_value(1.0, &mut harness.scene);
        let ready_events = order
            .iter()
            .map(|key| harness.load(key))
            .filter(|event| matches!(event, LoadEvent::Ready { .. }))
            .count();

        assert_eq!(ready_events, 1, "order {:?}", order);
        assert_eq!(harness.visible_tones(), vec!["0.1"], "order {:?}", order);
    }
}

#[test]
fn should_keep_visibility_stable_when_applied_twice() {
    let mut harness = ready_harness(3.0);
    let first: Vec<bool> = harness.scene.meshes().map(|(_, mesh)| mesh.visible).collect();

    harness.coordinator.apply_visibility(3.0, &mut harness.scene);
    let second: Vec<bool> = harness.scene.meshes().map(|(_, mesh)| mesh.visible).collect();

    assert_eq!(first, second);
}

#[test]
fn should_hide_everything_for_out_of_range_values() {
    let mut harness = ready_harness(2.0);

    let active = harness.coordinator.set_control_value(9.0, &mut harness.scene);

    assert_eq!(active, ToneKey::from("0.9"));
    assert!(harness.visible_tones().is_empty());
}

#[test]
fn should_offset_and_shadow_every_loaded_mesh() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    harness.load("0.0");

    let ids = harness
        .coordinator
        .registry()
        .get(&ToneKey::from("0.0"))
        .unwrap()
        .to_vec();
    assert_eq!(ids.len(), 3, "root container and both character meshes");
    assert_eq!(harness.scene.shadow_generator.casters(), ids.as_slice());
    for id in ids {
        let mesh = harness.scene.mesh(id).unwrap();
        assert!((mesh.transform.position.y - 0.06).abs() < 1e-6);
        assert!(mesh.receive_shadows);
        assert!(!mesh.visible);
    }
}

#[test]
fn should_reject_unknown_and_repeated_loads() {
    let config = ViewerConfig::tone_variants();
    let importer = ChannelImporter::new();
    let mut coordinator = ToneCoordinator::from_config(&config);
    let asset = AssetRef::model("pey_tone_0.0.gltf");

    assert!(
        coordinator
            .begin_load(&ToneKey::from("0.7"), &asset, &importer)
            .is_err()
    );
    assert_eq!(coordinator.state(), &LoadState::Idle);

    let _pending = coordinator
        .begin_load(&ToneKey::from("0.0"), &asset, &importer)
        .unwrap();
    assert_eq!(
        coordinator.state(),
        &LoadState::Loading {
            loaded: 0,
            expected: 6
        }
    );
    assert!(
        coordinator
            .begin_load(&ToneKey::from("0.0"), &asset, &importer)
            .is_err()
    );
    assert_eq!(importer.imports(), vec!["pey_tone_0.0.gltf"]);
}

#[test]
fn should_ignore_completions_that_were_never_requested() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    let stray = LoadCompletion {
        key: ToneKey::from("0.9"),
        result: Ok(character("0.9")),
    };

    let event = harness.coordinator.complete_load(stray, &mut harness.scene);

    assert_eq!(event, LoadEvent::Ignored { key: ToneKey::from("0.9") });
    assert!(harness.scene.is_empty());
    assert_eq!(harness.coordinator.progress(), (0, 6));
}

#[test]
fn should_ignore_a_second_completion_of_the_same_tone() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    harness.load("0.0");
    let meshes_after_first = harness.scene.len();

    let duplicate = LoadCompletion {
        key: ToneKey::from("0.0"),
        result: Ok(character("0.0")),
    };
    let event = harness.coordinator.complete_load(duplicate, &mut harness.scene);

    assert!(matches!(event, LoadEvent::Ignored { .. }));
    assert_eq!(harness.scene.len(), meshes_after_first);
    assert_eq!(harness.coordinator.progress(), (1, 6));
}

#[test]
fn should_stall_when_a_load_fails_by_default() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    for key in ["0.0", "0.1", "0.2", "0.3", "0.4"] {
        harness.load(key);
    }

    let event = harness.finish("0.5", Err(anyhow::anyhow!("404 Not Found")));

    assert_eq!(event, LoadEvent::Failed { key: ToneKey::from("0.5") });
    assert!(!harness.coordinator.is_ready());
    assert!(harness.visible_tones().is_empty());
}

#[test]
fn should_reveal_remaining_tones_when_failures_complete_empty() {
    let mut config = ViewerConfig::tone_variants();
    config.failure_policy = LoadFailurePolicy::CompleteEmpty;
    let mut harness = Harness::new(config);
    harness.coordinator.set_control_value(2.0, &mut harness.scene);

    harness.finish("0.2", Err(anyhow::anyhow!("corrupt file")));
    for key in ["0.0", "0.1", "0.3", "0.4"] {
        harness.load(key);
    }
    let event = harness.load("0.5");

    assert_eq!(event, LoadEvent::Ready { active: ToneKey::from("0.2") });
    assert_eq!(harness.coordinator.registry().get(&ToneKey::from("0.2")), Some(&[][..]));
    assert!(harness.visible_tones().is_empty());

    harness.coordinator.set_control_value(4.0, &mut harness.scene);
    assert_eq!(harness.visible_tones(), vec!["0.4"]);
}

#[test]
fn should_rebind_the_albedo_of_the_character_mesh() {
    let config = ViewerConfig::single_character("pey.glb", Some("pey_skin.png"));
    let mut harness = Harness::new(config);

    let event = harness.finish("0.0", Ok(character_with_albedo("0.0", "pey_skin.png")));

    assert_eq!(event, LoadEvent::Ready { active: ToneKey::from("0.0") });
    let body = harness.scene.find_by_name("body_0.0").unwrap();
    let albedo = harness
        .scene
        .mesh(body)
        .and_then(|mesh| mesh.material.as_ref())
        .and_then(|material| material.albedo())
        .unwrap();
    assert_eq!(albedo.source, "pey_skin.png");
    assert_eq!((albedo.u_scale, albedo.v_scale), (-1.0, -1.0));
}

#[test]
fn should_leave_materials_without_an_albedo_slot_untouched() {
    let mut config = ViewerConfig::single_character("pey.glb", Some("pey_skin.png"));
    // eyes carry a flat material without a texture slot
    config.albedo_target = 2;
    let mut harness = Harness::new(config);

    harness.finish("0.0", Ok(character_with_albedo("0.0", "pey_skin.png")));

    let eyes = harness.scene.find_by_name("eyes_0.0").unwrap();
    let material = harness.scene.mesh(eyes).and_then(|mesh| mesh.material.as_ref()).unwrap();
    assert!(material.albedo().is_none());
    let body = harness.scene.find_by_name("body_0.0").unwrap();
    let body_albedo = harness
        .scene
        .mesh(body)
        .and_then(|mesh| mesh.material.as_ref())
        .and_then(|material| material.albedo())
        .unwrap();
    assert_eq!(body_albedo.source, "baked_skin.png");
}

#[test]
fn should_skip_the_albedo_when_the_target_mesh_is_missing() {
    let mut config = ViewerConfig::single_character("pey.glb", Some("pey_skin.png"));
    config.albedo_target = 10;
    let mut harness = Harness::new(config);

    let event = harness.finish("0.0", Ok(character_with_albedo("0.0", "pey_skin.png")));

    assert!(matches!(event, LoadEvent::Ready { .. }));
    assert_eq!(harness.visible_tones(), vec!["0.0"]);
}

#[test]
fn should_drive_all_loads_to_ready() {
    let config = ViewerConfig::tone_variants();
    let importer = ChannelImporter::new();
    let mut coordinator = ToneCoordinator::from_config(&config);
    let mut scene = SceneGraph::new();
    coordinator.set_control_value(3.0, &mut scene);
    let pending = config
        .tones
        .iter()
        .map(|tone| coordinator.begin_load(&tone.key, &tone.asset, &importer).unwrap())
        .collect();

    let state = block_on(async {
        let (state, ()) = futures::join!(coordinator.run_to_ready(pending, &mut scene), async {
            for tone in config.tones.iter().rev() {
                importer.resolve(&tone.asset.model, Ok(character(tone.key.as_str())));
            }
        });
        state
    });

    assert_eq!(state, LoadState::Ready);
    assert_eq!(visible_tones(&coordinator, &scene), vec!["0.3"]);
}

#[test]
fn should_finish_running_without_ready_when_a_load_is_abandoned() {
    let config = ViewerConfig::tone_variants();
    let importer = ChannelImporter::new();
    let mut coordinator = ToneCoordinator::from_config(&config);
    let mut scene = SceneGraph::new();
    let pending = config
        .tones
        .iter()
        .map(|tone| coordinator.begin_load(&tone.key, &tone.asset, &importer).unwrap())
        .collect();

    let state = block_on(async {
        let (state, ()) = futures::join!(coordinator.run_to_ready(pending, &mut scene), async {
            for tone in &config.tones {
                if tone.key.as_str() == "0.4" {
                    importer.abandon(&tone.asset.model);
                } else {
                    importer.resolve(&tone.asset.model, Ok(character(tone.key.as_str())));
                }
            }
        });
        state
    });

    assert_eq!(
        state,
        LoadState::Loading {
            loaded: 5,
            expected: 6
        }
    );
    assert!(visible_tones(&coordinator, &scene).is_empty());
}

#[test]
fn should_coordinate_a_custom_tone_set() {
    let tones = ["0.0", "0.2", "0.4"]
        .into_iter()
        .map(|key| ToneAsset {
            key: ToneKey::from(key),
            asset: AssetRef::model(format!("variant_{}.glb", key)),
        })
        .collect();
    let slider = SliderConfig {
        min: 0,
        max: 4,
        initial: 4,
        scale: 0.1,
    };
    let mut harness = Harness::new(ViewerConfig::with_tones(tones, slider));

    for key in ["0.4", "0.0", "0.2"] {
        harness.load(key);
    }
    assert_eq!(harness.visible_tones(), vec!["0.4"]);

    harness.coordinator.set_control_value(1.0, &mut harness.scene);
    assert!(harness.visible_tones().is_empty(), "0.1 has no variant");
}

#[test]
fn should_become_ready_immediately_for_an_empty_import() {
    let mut coordinator = ToneCoordinator::new(
        ToneSet::new([ToneKey::from("0.0")]),
        CoordinatorSettings::default(),
    );
    let importer = ChannelImporter::new();
    let mut scene = SceneGraph::new();
    let pending = coordinator
        .begin_load(&ToneKey::from("0.0"), &AssetRef::model("empty.glb"), &importer)
        .unwrap();
    importer.resolve("empty.glb", Ok(ImportedMeshes::default()));

    let completion = block_on(pending);
    let event = coordinator.complete_load(completion, &mut scene);

    assert_eq!(event, LoadEvent::Ready { active: ToneKey::from("0.0") });
    assert!(scene.is_empty());
}

#[test]
fn should_show_the_selected_tone_and_the_progress_while_loading() {
    let mut harness = Harness::new(ViewerConfig::tone_variants());
    let mut slider = ToneSlider::new(&SliderConfig::default());
    slider.set(2);

    assert_eq!(
        window_title("flow-tones", &slider, &harness.coordinator),
        "flow-tones | Tone 0.2 | loading 0/6"
    );

    for key in ["0.0", "0.4", "0.5"] {
        harness.load(key);
    }
    assert_eq!(
        window_title("flow-tones", &slider, &harness.coordinator),
        "flow-tones | Tone 0.2 | loading 3/6"
    );

    for key in ["0.1", "0.2", "0.3"] {
        harness.load(key);
    }
    assert_eq!(
        window_title("flow-tones", &slider, &harness.coordinator),
        "flow-tones | Tone 0.2"
    );
}

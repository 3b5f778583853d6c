use flow_tones::data_structures::{
    mesh::MeshData,
    registry::ToneRegistry,
    scene_graph::{Scene, SceneGraph},
    tone::{DEFAULT_TONE_SCALE, ToneKey, ToneSet},
};

#[test]
fn should_quantize_slider_bounds_without_drift() {
    assert_eq!(ToneKey::quantize(0.0, DEFAULT_TONE_SCALE).as_str(), "0.0");
    assert_eq!(ToneKey::quantize(5.0, DEFAULT_TONE_SCALE).as_str(), "0.5");
    // 3 * 0.1 is not exactly 0.3 in binary floating point
    assert_eq!(ToneKey::quantize(3.0, DEFAULT_TONE_SCALE).as_str(), "0.3");
}

#[test]
fn should_round_to_one_decimal() {
    assert_eq!(ToneKey::quantize(2.4, DEFAULT_TONE_SCALE).as_str(), "0.2");
    assert_eq!(ToneKey::quantize(2.6, DEFAULT_TONE_SCALE).as_str(), "0.3");
    assert_eq!(ToneKey::quantize(1.0, 1.0).as_str(), "1.0");
}

#[test]
fn should_not_validate_the_range() {
    assert_eq!(ToneKey::quantize(12.0, DEFAULT_TONE_SCALE).as_str(), "1.2");
    assert_eq!(ToneKey::quantize(-1.0, DEFAULT_TONE_SCALE).as_str(), "-0.1");
    assert_eq!(ToneKey::quantize(-0.2, DEFAULT_TONE_SCALE).as_str(), "0.0");
}

#[test]
fn should_build_the_default_tone_set_from_the_slider_range() {
    let tones = ToneSet::default();

    let keys: Vec<&str> = tones.iter().map(ToneKey::as_str).collect();
    assert_eq!(keys, vec!["0.0", "0.1", "0.2", "0.3", "0.4", "0.5"]);
    assert_eq!(tones.position(&ToneKey::from("0.3")), Some(3));
    assert!(!tones.contains(&ToneKey::from("0.6")));
}

#[test]
fn should_drop_duplicate_tones() {
    let tones: ToneSet = ["0.0", "0.1", "0.0"].into_iter().map(ToneKey::from).collect();

    assert_eq!(tones.len(), 2);
}

#[test]
fn should_populate_each_registry_entry_once() {
    let tones = ToneSet::from_control_range(0, 2, DEFAULT_TONE_SCALE);
    let mut registry = ToneRegistry::new(&tones);
    let mut scene = SceneGraph::new();
    let id = scene.add_mesh(MeshData::container("__root__"));

    assert!(registry.contains(&ToneKey::from("0.1")));
    assert!(!registry.is_populated(&ToneKey::from("0.1")));
    assert_eq!(registry.get(&ToneKey::from("0.1")), None);

    registry.insert(ToneKey::from("0.1"), vec![id]).unwrap();
    assert!(registry.is_populated(&ToneKey::from("0.1")));
    assert_eq!(registry.get(&ToneKey::from("0.1")), Some(&[id][..]));
    assert_eq!(registry.populated(), 1);

    assert!(registry.insert(ToneKey::from("0.1"), vec![]).is_err());
    assert!(registry.insert(ToneKey::from("0.7"), vec![]).is_err());
    assert_eq!(registry.get(&ToneKey::from("0.1")), Some(&[id][..]));
}

#[test]
fn should_iterate_loaded_tones_in_registration_order() {
    let tones = ToneSet::default();
    let mut registry = ToneRegistry::new(&tones);
    for key in ["0.4", "0.1", "0.3"] {
        registry.insert(ToneKey::from(key), Vec::new()).unwrap();
    }

    let loaded: Vec<&str> = registry.iter().map(|(key, _)| key.as_str()).collect();

    assert_eq!(loaded, vec!["0.1", "0.3", "0.4"]);
    assert_eq!(registry.len(), 6);
}

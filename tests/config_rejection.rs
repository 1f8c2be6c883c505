mod common;

use std::fs;

use fractal_terrain::{load_settings, ConfigError, Fractal, HeightFieldConfig, InvalidConfig};

#[test]
fn zero_variance_is_refused_everywhere() {
    let mut f = Fractal::new();
    let before = *f.config();
    let bad = HeightFieldConfig { normal_variance: 0.0, ..before };

    assert_eq!(bad.validate(), Err(InvalidConfig::NormalVariance(0.0)));
    assert!(!f.set_config(bad));
    assert_eq!(*f.config(), before);

    let mut map = common::map();
    let active = *map.fractal_config();
    assert!(!map.set_fractal_config(bad));
    assert_eq!(*map.fractal_config(), active);
}

#[test]
fn settings_file_rejects_bad_fractal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("terrain.toml");
    fs::write(&path, "[fractal]\ntwo_point_linear_min = 0.75\n").expect("write settings");

    let err = load_settings(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Rejected(InvalidConfig::TwoPointLinearMin(_))));
}

#[test]
fn settings_file_rejects_unknown_fractal_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("terrain.toml");
    fs::write(&path, "[fractal]\nroughness = 3\n").expect("write settings");

    assert!(matches!(load_settings(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn new_config_applies_to_later_tiles() {
    let mut map = common::map();
    let flat = HeightFieldConfig {
        distribution: fractal_terrain::world::DistributionKind::Uniform,
        uniform_min: 0.5,
        uniform_max: 0.5000001,
        clamping: fractal_terrain::world::ClampingMode::RoundToRange,
        clamping_min: 0.0,
        clamping_max: 1.0,
        ..*map.fractal_config()
    };
    assert!(map.set_fractal_config(flat));
    let t = common::generate(&mut map, fractal_terrain::TileKey::new(0, 0));
    for &v in t.heights() {
        assert!((v - 0.5).abs() < 1e-3, "{v}");
    }
}

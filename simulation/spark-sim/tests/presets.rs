//! Integration tests for preset loading and the built-in fountain

#![cfg(feature = "presets")]

use std::fs;

use pretty_assertions::assert_eq;
use spark_sim::{EmitterRegistry, PresetDocument, SimError};
use tempfile::TempDir;
use test_case::test_case;

fn write_fountain(dir: &TempDir, file_name: &str) -> std::path::PathBuf {
    let fountain = PresetDocument::fountain();
    let text = if file_name.to_ascii_lowercase().ends_with(".json") {
        fountain.to_json().unwrap()
    } else {
        fountain.to_yaml().unwrap()
    };

    let path = dir.path().join(file_name);
    fs::write(&path, text).unwrap();
    path
}

#[test_case("fountain.yaml")]
#[test_case("fountain.yml")]
#[test_case("fountain.json")]
#[test_case("FOUNTAIN.JSON")]
fn test_load_by_extension(file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fountain(&dir, file_name);

    let doc = PresetDocument::from_path(&path).unwrap();
    assert_eq!(doc, PresetDocument::fountain());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = PresetDocument::from_path(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(SimError::Io(_))));
}

#[test]
fn test_malformed_documents() {
    assert!(matches!(
        PresetDocument::from_yaml_str("emitters: 12"),
        Err(SimError::Yaml(_))
    ));
    assert!(matches!(
        PresetDocument::from_json_str("{\"emitters\": [{\"name\": 3}]}"),
        Err(SimError::Json(_))
    ));
}

#[test]
fn test_fountain_sparks_follow_deaths() {
    let mut registry = EmitterRegistry::new();
    let created = PresetDocument::fountain()
        .instantiate(&mut registry)
        .unwrap();
    let (fountain, sparks) = (created[0].1, created[1].1);

    for _ in 0..180 {
        registry.tick(1.0 / 60.0);
    }

    let fountain = registry.resolve(fountain).unwrap();
    let sparks = registry.resolve(sparks).unwrap();

    let deaths = fountain.emitted_total() - fountain.particle_count() as u64;
    assert!(deaths > 0);
    // One spark burst of one particle per fountain death
    assert_eq!(sparks.emitted_total(), deaths);
    assert!(sparks.particle_count() > 0);
}

#[test]
fn test_seed_makes_runs_repeatable() {
    let run = |seed| {
        let mut registry = EmitterRegistry::new();
        let created = PresetDocument::fountain()
            .with_seed(seed)
            .instantiate(&mut registry)
            .unwrap();
        for _ in 0..30 {
            registry.tick(1.0 / 60.0);
        }
        registry
            .resolve(created[0].1)
            .unwrap()
            .particles()
            .map(|p| p.position)
            .collect::<Vec<_>>()
    };

    assert_eq!(run(11), run(11));
    assert_ne!(run(11), run(12));
}

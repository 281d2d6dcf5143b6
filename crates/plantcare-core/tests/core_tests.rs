use std::fs;
use std::path::Path;
use tempfile::TempDir;

use figment::providers::{Format, Toml};
use figment::Figment;
use plantcare_core::config::{expand_path, Config, EmbedBackend, StoreBackend};
use plantcare_core::dataset::DatasetSource;
use plantcare_core::Error;

#[test]
fn dataset_from_single_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("garden.json");
    fs::write(&path, r#"[{"species": "Aloe vera", "text": "Water sparingly."}]"#).unwrap();

    let records = DatasetSource::Path(path).read().expect("read");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].species, "Aloe vera");
    assert!(records[0].source.is_none());
}

#[test]
fn dataset_directory_is_walked_in_path_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.json"), r#"[{"species": "Ficus lyrata", "text": "Bright light."}]"#).unwrap();
    fs::write(dir.join("a.json"), r#"[{"species": "Aloe vera", "text": "Dry soil."}]"#).unwrap();
    fs::write(dir.join("nested/c.json"), r#"[{"species": "Crassula ovata", "text": "Gritty mix."}]"#).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let records = DatasetSource::Path(dir.to_path_buf()).read().expect("read dir");
    let species: Vec<_> = records.iter().map(|r| r.species.as_str()).collect();
    assert_eq!(species, vec!["Aloe vera", "Ficus lyrata", "Crassula ovata"]);
}

#[test]
fn empty_or_unreadable_dataset_is_load_error() {
    let tmp = TempDir::new().unwrap();
    let empty = tmp.path().join("empty.json");
    fs::write(&empty, "[]").unwrap();
    assert!(matches!(DatasetSource::Path(empty).read(), Err(Error::Load(_))));

    let missing = tmp.path().join("missing.json");
    assert!(matches!(DatasetSource::Path(missing).read(), Err(Error::Load(_))));

    let garbage = tmp.path().join("garbage.json");
    fs::write(&garbage, "{not json").unwrap();
    assert!(matches!(DatasetSource::Path(garbage).read(), Err(Error::Load(_))));
}

#[test]
fn record_without_text_is_load_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.json");
    fs::write(&path, r#"[{"species": "Aloe vera", "text": "ok"}, {"species": "Ficus lyrata"}]"#).unwrap();
    let err = DatasetSource::Path(path).read().unwrap_err();
    assert!(err.to_string().contains("Ficus lyrata"), "error names the record: {err}");
}

#[test]
fn settings_defaults_and_overrides() {
    let defaults = Config::from_figment(Figment::new()).settings().expect("defaults");
    assert!(defaults.rag.enabled);
    assert_eq!(defaults.rag.similar_limit, 1);
    assert_eq!(defaults.rag.question_limit, 3);
    assert_eq!(defaults.store.backend, StoreBackend::Memory);
    assert_eq!(defaults.model.api_key_env, "GEMINI_API_KEY");

    let toml = r#"
        [rag]
        enabled = false
        [store]
        backend = "lancedb"
        table = "plants"
    "#;
    let config = Config::from_figment(Figment::from(Toml::string(toml)));
    let settings = config.settings().expect("settings");
    assert!(!settings.rag.enabled);
    assert_eq!(settings.rag.question_limit, 3, "unset keys keep defaults");
    assert_eq!(settings.store.backend, StoreBackend::Lancedb);
    assert_eq!(settings.store.table, "plants");
    assert_eq!(settings.embed.backend, EmbedBackend::Hashing);
}

#[test]
fn invalid_settings_are_config_errors() {
    let config = Config::from_figment(Figment::from(Toml::string("[model]\ntimeout_secs = 0")));
    assert!(matches!(config.settings(), Err(Error::Config(_))));
}

#[test]
fn embed_backend_and_paths_come_from_config() {
    let toml = r#"
        [embed]
        backend = "bge-m3"
        model_dir = "/opt/models/bge-m3"
        [data]
        dataset_path = "/srv/plantcare/kb.json"
    "#;
    let settings = Config::from_figment(Figment::from(Toml::string(toml))).settings().expect("settings");
    assert_eq!(settings.embed.backend, EmbedBackend::BgeM3);
    assert_eq!(settings.embed.model_dir(), Path::new("/opt/models/bge-m3"));
    assert_eq!(settings.data.dataset_path().as_deref(), Some(Path::new("/srv/plantcare/kb.json")));

    let bad = Config::from_figment(Figment::from(Toml::string("[embed]\nbackend = \"word2vec\"")));
    assert!(matches!(bad.settings(), Err(Error::Config(_))));
}

#[test]
fn paths_expand_home_and_plain_paths_pass_through() {
    assert_eq!(expand_path("relative/kb.json"), Path::new("relative/kb.json"));
    if let Ok(home) = std::env::var("HOME") {
        assert_eq!(expand_path("~/kb.json"), Path::new(&home).join("kb.json"));
    }
}

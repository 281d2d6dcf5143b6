//! Curated seed dataset: species-keyed care-text records.
//!
//! A dataset is a JSON array of `{species, text, source?, section?}`. It can
//! come from the copy bundled into the binary, a single `.json` file, or a
//! directory walked recursively for `.json` files (sorted by path).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const BUNDLED: &str = include_str!("../data/plant_care.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRecord {
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Bundled,
    Path(PathBuf),
}

impl DatasetSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(DatasetSource::Bundled, DatasetSource::Path)
    }

    /// Label recorded as the `source` of records that do not carry one.
    pub fn label(&self) -> String {
        match self {
            DatasetSource::Bundled => "curated".to_string(),
            DatasetSource::Path(p) => p.file_stem().map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().to_string()),
        }
    }

    /// Read and check every record. Empty datasets and records missing
    /// species or text are `Load` errors.
    pub fn read(&self) -> Result<Vec<SeedRecord>> {
        let records = match self {
            DatasetSource::Bundled => parse_records(BUNDLED, "bundled dataset")?,
            DatasetSource::Path(p) if p.is_dir() => read_dir(p)?,
            DatasetSource::Path(p) => read_file(p)?,
        };
        if records.is_empty() { return Err(Error::Load(format!("dataset {} has no records", self.describe()))); }
        for (i, r) in records.iter().enumerate() {
            if r.species.trim().is_empty() { return Err(Error::Load(format!("record {} in {} has no species", i, self.describe()))); }
            if r.text.trim().is_empty() { return Err(Error::Load(format!("record {} ('{}') in {} has no text", i, r.species.trim(), self.describe()))); }
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        match self {
            DatasetSource::Bundled => "bundled dataset".to_string(),
            DatasetSource::Path(p) => p.display().to_string(),
        }
    }
}

fn parse_records(raw: &str, origin: &str) -> Result<Vec<SeedRecord>> {
    serde_json::from_str(raw).map_err(|e| Error::Load(format!("{} is not a valid dataset: {}", origin, e)))
}

fn read_file(path: &Path) -> Result<Vec<SeedRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::Load(format!("cannot read {}: {}", path.display(), e)))?;
    parse_records(&raw, &path.display().to_string())
}

fn read_dir(root: &Path) -> Result<Vec<SeedRecord>> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    let mut records = Vec::new();
    for f in &files { records.extend(read_file(f)?); }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_dataset_is_well_formed() {
        let records = DatasetSource::Bundled.read().expect("bundled");
        assert!(records.len() >= 10);
        assert!(records.iter().any(|r| r.species == "Monstera deliciosa"));
        assert!(records.iter().any(|r| r.species == "Aloe vera"));
    }

    #[test]
    fn label_uses_file_stem() {
        assert_eq!(DatasetSource::Bundled.label(), "curated");
        assert_eq!(DatasetSource::Path(PathBuf::from("/x/houseplants.json")).label(), "houseplants");
    }
}

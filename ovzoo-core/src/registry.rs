//! Registry: the catalog of model manifests under a zoo directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ZooError;
use crate::manifest::Manifest;

/// File name every model manifest uses.
pub const MANIFEST_FILE: &str = "model.yml";

/// One discovered model: its name is the directory holding `model.yml`.
#[derive(Debug, Clone)]
pub struct ModelRecord {
    pub name: String,
    /// Directory containing the manifest; this is the `$config_dir` the
    /// manifest's templated arguments refer to.
    pub config_dir: PathBuf,
    pub manifest: Manifest,
}

/// All models found under a zoo directory.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelRecord>,
}

impl ModelRegistry {
    /// Walk `models_dir` and load every `model.yml` found. A malformed
    /// manifest fails the scan; the manifests are the tool's source of
    /// truth and a broken one must not be silently dropped.
    pub fn scan(models_dir: &Path) -> Result<Self, ZooError> {
        let mut models = Vec::new();
        for entry in WalkDir::new(models_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
                continue;
            }
            let config_dir = entry
                .path()
                .parent()
                .ok_or_else(|| ZooError::manifest("manifest has no parent directory"))?
                .to_path_buf();
            let name = config_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ZooError::manifest("model directory has no name"))?;
            let manifest = Manifest::load(entry.path())?;
            models.push(ModelRecord {
                name,
                config_dir,
                manifest,
            });
        }
        models.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(count = models.len(), dir = %models_dir.display(), "Scanned model manifests");
        Ok(Self { models })
    }

    pub fn list(&self) -> &[ModelRecord] {
        &self.models
    }

    pub fn find(&self, name: &str) -> Option<&ModelRecord> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Like [`find`](Self::find), but a miss is an error naming the model.
    pub fn get(&self, name: &str) -> Result<&ModelRecord, ZooError> {
        self.find(name)
            .ok_or_else(|| ZooError::not_found(format!("model '{name}'")))
    }

    pub fn search(&self, query: &str) -> Vec<&ModelRecord> {
        let q = query.to_lowercase();
        self.models
            .iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&q)
                    || m.manifest.description.to_lowercase().contains(&q)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
description: Minimal test model
task_type: semantic_segmentation
files:
  - name: weights.pth
    size: 16
    checksum: 0f8e1a9c4b5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d
    source: https://example.com/weights.pth
framework: pytorch
license: https://example.com/LICENSE
"#;

    fn write_model(root: &Path, name: &str) {
        let dir = root.join("public").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), MINIMAL).unwrap();
    }

    #[test]
    fn test_scan_finds_nested_manifests() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "pspnet-pytorch");
        write_model(dir.path(), "other-model");

        let registry = ModelRegistry::scan(dir.path()).unwrap();
        let names: Vec<&str> = registry.list().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["other-model", "pspnet-pytorch"]);
    }

    #[test]
    fn test_find_returns_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "pspnet-pytorch");

        let registry = ModelRegistry::scan(dir.path()).unwrap();
        let record = registry.find("pspnet-pytorch").unwrap();
        assert_eq!(record.config_dir, dir.path().join("public/pspnet-pytorch"));
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn test_get_miss_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "pspnet-pytorch");

        let registry = ModelRegistry::scan(dir.path()).unwrap();
        assert!(registry.get("pspnet-pytorch").is_ok());
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, ZooError::NotFound(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_search_matches_description() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), "pspnet-pytorch");

        let registry = ModelRegistry::scan(dir.path()).unwrap();
        assert_eq!(registry.search("minimal").len(), 1);
        assert!(registry.search("detector").is_empty());
    }

    #[test]
    fn test_broken_manifest_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("public/broken");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(MANIFEST_FILE), "files: []\n").unwrap();

        assert!(ModelRegistry::scan(dir.path()).is_err());
    }
}

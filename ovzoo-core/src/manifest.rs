//! Model manifest: the declarative `model.yml` record driving the pipeline.
//!
//! A manifest lists the files to download (with sizes and checksums), the
//! postprocessing steps to run against the unpacked tree, and the templated
//! argument lists for the ONNX exporter and the model optimizer.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::ZooError;

/// Length of a hex-encoded SHA-384 digest.
pub const CHECKSUM_HEX_LEN: usize = 96;

/// Framework the model weights come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    Pytorch,
    Tf,
    Tf2,
    Onnx,
    Caffe,
    Mxnet,
    #[serde(untagged)]
    Other(String),
}

impl Framework {
    pub fn as_str(&self) -> &str {
        match self {
            Framework::Pytorch => "pytorch",
            Framework::Tf => "tf",
            Framework::Tf2 => "tf2",
            Framework::Onnx => "onnx",
            Framework::Caffe => "caffe",
            Framework::Mxnet => "mxnet",
            Framework::Other(s) => s,
        }
    }
}

/// Task the model solves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SemanticSegmentation,
    InstanceSegmentation,
    Classification,
    Detection,
    HumanPoseEstimation,
    #[serde(untagged)]
    Other(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::SemanticSegmentation => "semantic_segmentation",
            TaskType::InstanceSegmentation => "instance_segmentation",
            TaskType::Classification => "classification",
            TaskType::Detection => "detection",
            TaskType::HumanPoseEstimation => "human_pose_estimation",
            TaskType::Other(s) => s,
        }
    }
}

/// One downloadable file: where to fetch it, how big it is, and the digest
/// its bytes must hash to. `name` is the placement path relative to the
/// model's download directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: PathBuf,
    pub size: u64,
    pub checksum: String,
    pub source: String,
    /// Upstream location the mirrored `source` was copied from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_source: Option<String>,
}

/// Archive format for an `unpack_archive` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Gztar,
    Tar,
}

/// A postprocessing step. Steps apply sequentially and later steps may
/// target files produced by earlier unpacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum PostprocessingStep {
    UnpackArchive {
        format: ArchiveFormat,
        file: PathBuf,
    },
    RegexReplace {
        file: PathBuf,
        pattern: String,
        replacement: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
    },
}

/// Declared input tensor of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub layout: String,
}

/// A parsed `model.yml` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub description: String,
    pub task_type: TaskType,
    pub files: Vec<FileEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocessing: Vec<PostprocessingStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversion_to_onnx_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_optimizer_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_info: Vec<InputInfo>,
    pub framework: Framework,
    pub license: String,
}

impl Manifest {
    /// Load and validate a manifest from a `model.yml` path.
    pub fn load(path: &Path) -> Result<Self, ZooError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ZooError::manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate a manifest from YAML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ZooError> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Structural validation: placement paths must stay inside the model
    /// directory, checksums must be well-formed, and unpack steps must
    /// reference listed files.
    pub fn validate(&self) -> Result<(), ZooError> {
        if self.files.is_empty() {
            return Err(ZooError::manifest("manifest lists no files"));
        }
        for entry in &self.files {
            validate_relative_path(&entry.name)?;
            if entry.size == 0 {
                return Err(ZooError::manifest(format!(
                    "file '{}' declares zero size",
                    entry.name.display()
                )));
            }
            validate_checksum(&entry.name, &entry.checksum)?;
            url::Url::parse(&entry.source).map_err(|e| {
                ZooError::manifest(format!(
                    "file '{}' has an invalid source URL: {}",
                    entry.name.display(),
                    e
                ))
            })?;
        }
        for step in &self.postprocessing {
            match step {
                PostprocessingStep::UnpackArchive { file, .. } => {
                    validate_relative_path(file)?;
                    if !self.files.iter().any(|f| &f.name == file) {
                        return Err(ZooError::manifest(format!(
                            "unpack_archive references '{}' which is not a listed file",
                            file.display()
                        )));
                    }
                }
                PostprocessingStep::RegexReplace { file, pattern, .. } => {
                    validate_relative_path(file)?;
                    if pattern.is_empty() {
                        return Err(ZooError::manifest(format!(
                            "regex_replace on '{}' has an empty pattern",
                            file.display()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The weight files themselves, i.e. everything that is not an archive
    /// consumed by an `unpack_archive` step.
    pub fn weight_files(&self) -> Vec<&FileEntry> {
        let archives: Vec<&PathBuf> = self
            .postprocessing
            .iter()
            .filter_map(|s| match s {
                PostprocessingStep::UnpackArchive { file, .. } => Some(file),
                _ => None,
            })
            .collect();
        self.files
            .iter()
            .filter(|f| !archives.contains(&&f.name))
            .collect()
    }
}

fn validate_relative_path(path: &Path) -> Result<(), ZooError> {
    if path.is_absolute() {
        return Err(ZooError::manifest(format!(
            "'{}' must be relative to the model directory",
            path.display()
        )));
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(ZooError::manifest(format!(
                "'{}' escapes the model directory",
                path.display()
            )));
        }
    }
    Ok(())
}

fn validate_checksum(name: &Path, checksum: &str) -> Result<(), ZooError> {
    if checksum.len() != CHECKSUM_HEX_LEN
        || !checksum.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ZooError::manifest(format!(
            "file '{}' has a malformed checksum (want {} hex chars)",
            name.display(),
            CHECKSUM_HEX_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
description: Test segmentation model
task_type: semantic_segmentation
files:
  - name: weights.pth
    size: 1024
    checksum: 0f8e1a9c4b5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d
    source: https://example.com/weights.pth
  - name: models/pkg.tar.gz
    size: 2048
    checksum: 1f8e1a9c4b5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d
    source: https://example.com/pkg.tar.gz
postprocessing:
  - $type: unpack_archive
    format: gztar
    file: models/pkg.tar.gz
  - $type: regex_replace
    file: models/pkg/__init__.py
    pattern: 'from (?!.core)'
    replacement: '# from '
input_info:
  - name: input.1
    shape: [1, 3, 512, 512]
    layout: NCHW
framework: pytorch
license: https://example.com/LICENSE
"#;

    #[test]
    fn test_parse_sample() {
        let m = Manifest::from_str(SAMPLE).unwrap();
        assert_eq!(m.task_type, TaskType::SemanticSegmentation);
        assert_eq!(m.framework, Framework::Pytorch);
        assert_eq!(m.files.len(), 2);
        assert_eq!(m.postprocessing.len(), 2);
        assert_eq!(m.input_info[0].name, "input.1");
        assert_eq!(m.input_info[0].shape, vec![1, 3, 512, 512]);
        assert_eq!(m.input_info[0].layout, "NCHW");
    }

    #[test]
    fn test_weight_files_excludes_archives() {
        let m = Manifest::from_str(SAMPLE).unwrap();
        let weights = m.weight_files();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].name, PathBuf::from("weights.pth"));
    }

    #[test]
    fn test_tagged_step_variants() {
        let m = Manifest::from_str(SAMPLE).unwrap();
        assert!(matches!(
            m.postprocessing[0],
            PostprocessingStep::UnpackArchive {
                format: ArchiveFormat::Gztar,
                ..
            }
        ));
        assert!(matches!(
            m.postprocessing[1],
            PostprocessingStep::RegexReplace { .. }
        ));
    }

    #[test]
    fn test_rejects_malformed_checksum() {
        let bad = SAMPLE.replace(
            "0f8e1a9c4b5d6e7f8a9b0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d",
            "deadbeef",
        );
        assert!(matches!(
            Manifest::from_str(&bad),
            Err(ZooError::Manifest(_))
        ));
    }

    #[test]
    fn test_rejects_escaping_path() {
        let bad = SAMPLE.replace("name: weights.pth", "name: ../weights.pth");
        assert!(matches!(
            Manifest::from_str(&bad),
            Err(ZooError::Manifest(_))
        ));
    }

    #[test]
    fn test_rejects_unlisted_archive() {
        let bad = SAMPLE.replace("file: models/pkg.tar.gz", "file: models/other.tar.gz");
        assert!(matches!(
            Manifest::from_str(&bad),
            Err(ZooError::Manifest(_))
        ));
    }

    #[test]
    fn test_unknown_framework_falls_back() {
        let other = SAMPLE.replace("framework: pytorch", "framework: paddle");
        let m = Manifest::from_str(&other).unwrap();
        assert_eq!(m.framework, Framework::Other("paddle".to_string()));
    }
}

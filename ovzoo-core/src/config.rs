//! Configuration for the zoo tool.
//!
//! Uses `figment` for layered configuration: defaults -> user config file
//! -> workspace `ovzoo.toml` -> `OVZOO_`-prefixed environment variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ZooError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZooConfig {
    /// Directory scanned for `model.yml` manifests.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    /// Where downloaded files land, one subdirectory per model.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Where converted models land, one subdirectory per model.
    #[serde(default = "default_conversion_dir")]
    pub conversion_dir: PathBuf,
    /// Python interpreter used for the ONNX export stage.
    #[serde(default = "default_python")]
    pub python: PathBuf,
    /// Model optimizer executable.
    #[serde(default = "default_model_optimizer")]
    pub model_optimizer: PathBuf,
    /// Export script the conversion arguments are passed to.
    #[serde(default = "default_export_script")]
    pub export_script: PathBuf,
    /// Per-request download timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

impl Default for ZooConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            download_dir: default_download_dir(),
            conversion_dir: default_conversion_dir(),
            python: default_python(),
            model_optimizer: default_model_optimizer(),
            export_script: default_export_script(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_conversion_dir() -> PathBuf {
    PathBuf::from("converted")
}

fn default_python() -> PathBuf {
    PathBuf::from("python3")
}

fn default_model_optimizer() -> PathBuf {
    PathBuf::from("mo")
}

fn default_export_script() -> PathBuf {
    PathBuf::from("tools/pytorch_to_onnx.py")
}

fn default_download_timeout() -> u64 {
    600
}

/// Name of the workspace-local config file.
pub const CONFIG_FILE: &str = "ovzoo.toml";

/// Load configuration with the standard layering.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<ZooConfig>,
) -> Result<ZooConfig, ZooError> {
    let mut figment = Figment::from(Serialized::defaults(ZooConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "ovzoo", "ovzoo") {
        let user_config = dirs.config_dir().join(CONFIG_FILE);
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("OVZOO_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment
        .extract()
        .map_err(|e| ZooError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ZooConfig::default();
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.python, PathBuf::from("python3"));
        assert_eq!(config.download_timeout_secs, 600);
    }

    #[test]
    fn test_workspace_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "download_dir = \"/data/zoo\"\nmodel_optimizer = \"/opt/intel/mo\"\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/data/zoo"));
        assert_eq!(config.model_optimizer, PathBuf::from("/opt/intel/mo"));
        // untouched keys keep their defaults
        assert_eq!(config.conversion_dir, PathBuf::from("converted"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ZooConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: ZooConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.export_script, config.export_script);
    }
}

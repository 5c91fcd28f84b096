//! # ovzoo-core — manifest-driven model zoo pipeline
//!
//! A model zoo describes each pretrained model with a declarative
//! `model.yml` manifest: the files to download (with sizes and SHA-384
//! checksums), archive-unpack and regex-patch postprocessing steps, and
//! templated argument lists for the external ONNX exporter and model
//! optimizer. This crate implements the pipeline those manifests drive:
//!
//! 1. Download every listed file and verify it against its checksum.
//! 2. Unpack archives and apply source patches, in manifest order.
//! 3. Substitute `$config_dir` / `$dl_dir` / `$conv_dir` into the
//!    conversion arguments and invoke the exporter.
//! 4. Invoke the model optimizer to produce the deployable model.

pub mod checksum;
pub mod config;
pub mod convert;
pub mod download;
pub mod error;
pub mod manifest;
pub mod postprocess;
pub mod registry;
pub mod template;

pub use config::{load_config, ZooConfig};
pub use convert::{CommandLine, Converter};
pub use download::Downloader;
pub use error::ZooError;
pub use manifest::{FileEntry, InputInfo, Manifest, PostprocessingStep};
pub use registry::{ModelRecord, ModelRegistry};
pub use template::TemplateVars;

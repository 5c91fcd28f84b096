//! Tests against the shipped pspnet-pytorch manifest.

use std::path::{Path, PathBuf};

use ovzoo_core::manifest::{ArchiveFormat, Framework, Manifest, PostprocessingStep, TaskType};
use ovzoo_core::template::{has_unresolved, TemplateVars};
use ovzoo_core::{Converter, ModelRegistry};

fn models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../models")
}

fn pspnet() -> Manifest {
    Manifest::load(&models_dir().join("public/pspnet-pytorch/model.yml")).unwrap()
}

#[test]
fn manifest_declares_expected_input() {
    let manifest = pspnet();
    assert_eq!(manifest.task_type, TaskType::SemanticSegmentation);
    assert_eq!(manifest.framework, Framework::Pytorch);
    assert_eq!(manifest.input_info.len(), 1);
    let input = &manifest.input_info[0];
    assert_eq!(input.name, "input.1");
    assert_eq!(input.shape, vec![1, 3, 512, 512]);
    assert_eq!(input.layout, "NCHW");
}

#[test]
fn manifest_files_are_well_formed() {
    let manifest = pspnet();
    assert_eq!(manifest.files.len(), 4);
    for file in &manifest.files {
        assert_eq!(file.checksum.len(), 96);
        assert!(file.source.starts_with("https://"));
    }
    // the checkpoint is the only non-archive file
    let weights = manifest.weight_files();
    assert_eq!(weights.len(), 1);
    assert!(weights[0]
        .name
        .to_string_lossy()
        .ends_with("ed5dfbd9.pth"));
}

#[test]
fn postprocessing_unpacks_before_patching() {
    let manifest = pspnet();
    let first_patch = manifest
        .postprocessing
        .iter()
        .position(|s| matches!(s, PostprocessingStep::RegexReplace { .. }))
        .unwrap();
    let last_unpack = manifest
        .postprocessing
        .iter()
        .rposition(|s| matches!(s, PostprocessingStep::UnpackArchive { .. }))
        .unwrap();
    assert!(last_unpack < first_patch);

    // the wheels are zips, the sdist is a gzipped tar
    let formats: Vec<ArchiveFormat> = manifest
        .postprocessing
        .iter()
        .filter_map(|s| match s {
            PostprocessingStep::UnpackArchive { format, .. } => Some(*format),
            _ => None,
        })
        .collect();
    assert_eq!(
        formats,
        vec![ArchiveFormat::Zip, ArchiveFormat::Zip, ArchiveFormat::Gztar]
    );
}

#[test]
fn patch_patterns_compile_with_lookahead() {
    let manifest = pspnet();
    for step in &manifest.postprocessing {
        if let PostprocessingStep::RegexReplace { pattern, .. } = step {
            fancy_regex::Regex::new(pattern).unwrap();
        }
    }
}

#[test]
fn conversion_args_resolve_completely() {
    let manifest = pspnet();
    let vars = TemplateVars::new(Path::new("/cfg"), Path::new("/tmp/d"), Path::new("/tmp/c"));
    let converter = Converter::new(
        PathBuf::from("python3"),
        PathBuf::from("mo"),
        PathBuf::from("tools/pytorch_to_onnx.py"),
    );

    let onnx = converter.onnx_command(&manifest, &vars).unwrap().unwrap();
    assert!(onnx
        .args
        .contains(&"--output-file=/tmp/c/pspnet_r50-d8.onnx".to_string()));
    assert!(onnx.args.iter().all(|a| !has_unresolved(a)));

    let mo = converter
        .optimizer_command(&manifest, &vars)
        .unwrap()
        .unwrap();
    assert!(mo
        .args
        .contains(&"--input_model=/tmp/c/pspnet_r50-d8.onnx".to_string()));
    assert!(mo.args.iter().all(|a| !has_unresolved(a)));
}

#[test]
fn registry_finds_shipped_model() {
    let registry = ModelRegistry::scan(&models_dir()).unwrap();
    let record = registry.find("pspnet-pytorch").unwrap();
    assert!(record.config_dir.ends_with("public/pspnet-pytorch"));
    assert_eq!(record.manifest.files.len(), 4);
}

//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ovzoo_core::config::CONFIG_FILE;
use ovzoo_core::postprocess;
use ovzoo_core::{Converter, Downloader, ModelRecord, ModelRegistry, TemplateVars, ZooConfig};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    models_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    match command {
        Commands::List { filter } => handle_list(workspace, models_dir, filter),
        Commands::Info { name } => handle_info(workspace, models_dir, &name),
        Commands::Download { name } => handle_download(workspace, models_dir, &name).await,
        Commands::Convert { name, dry_run } => {
            handle_convert(workspace, models_dir, &name, dry_run).await
        }
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn load_config(workspace: &Path, models_dir: Option<PathBuf>) -> anyhow::Result<ZooConfig> {
    let mut config = ovzoo_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if let Some(dir) = models_dir {
        config.models_dir = dir;
    }
    // relative directories resolve against the workspace
    for dir in [
        &mut config.models_dir,
        &mut config.download_dir,
        &mut config.conversion_dir,
    ] {
        if dir.is_relative() {
            *dir = workspace.join(dir.as_path());
        }
    }
    Ok(config)
}

fn scan_registry(config: &ZooConfig) -> anyhow::Result<ModelRegistry> {
    ModelRegistry::scan(&config.models_dir)
        .map_err(|e| anyhow::anyhow!("Failed to scan {}: {}", config.models_dir.display(), e))
}

fn find_model<'a>(registry: &'a ModelRegistry, name: &str) -> anyhow::Result<&'a ModelRecord> {
    registry
        .get(name)
        .context("Run 'ovzoo list' to see available models")
}

fn handle_list(
    workspace: &Path,
    models_dir: Option<PathBuf>,
    filter: Option<String>,
) -> anyhow::Result<()> {
    let config = load_config(workspace, models_dir)?;
    let registry = scan_registry(&config)?;
    let records: Vec<&ModelRecord> = match &filter {
        Some(q) => registry.search(q),
        None => registry.list().iter().collect(),
    };
    if records.is_empty() {
        println!("No models found under {}.", config.models_dir.display());
        return Ok(());
    }
    println!("Available models ({}):", records.len());
    for record in records {
        println!(
            "  {:<28} {:<24} [{}]",
            record.name,
            record.manifest.task_type.as_str(),
            record.manifest.framework.as_str()
        );
    }
    Ok(())
}

fn handle_info(
    workspace: &Path,
    models_dir: Option<PathBuf>,
    name: &str,
) -> anyhow::Result<()> {
    let config = load_config(workspace, models_dir)?;
    let registry = scan_registry(&config)?;
    let record = find_model(&registry, name)?;
    let manifest = &record.manifest;

    println!("{}", record.name);
    println!("  framework: {}", manifest.framework.as_str());
    println!("  license:   {}", manifest.license);
    println!();
    println!("{}", manifest.description.trim());
    println!();
    println!("Files ({}):", manifest.files.len());
    for file in &manifest.files {
        println!("  {:<56} {:>12} bytes", file.name.display(), file.size);
    }
    if !manifest.input_info.is_empty() {
        println!();
        println!("Inputs:");
        for input in &manifest.input_info {
            println!(
                "  {} shape={:?} layout={}",
                input.name, input.shape, input.layout
            );
        }
    }
    if !manifest.postprocessing.is_empty() {
        println!();
        println!("Postprocessing steps: {}", manifest.postprocessing.len());
    }
    if !manifest.conversion_to_onnx_args.is_empty() {
        println!("Conversion stages: onnx export, model optimizer");
    }
    Ok(())
}

async fn handle_download(
    workspace: &Path,
    models_dir: Option<PathBuf>,
    name: &str,
) -> anyhow::Result<()> {
    let config = load_config(workspace, models_dir)?;
    let registry = scan_registry(&config)?;
    let record = find_model(&registry, name)?;

    tracing::info!(model = %record.name, files = record.manifest.files.len(), "Starting download");
    let downloader = Downloader::new(
        config.download_dir.clone(),
        Duration::from_secs(config.download_timeout_secs),
    )?;
    let model_dir = downloader.fetch_all(&record.manifest, &record.name).await?;
    postprocess::apply_all(&record.manifest.postprocessing, &model_dir)?;

    println!("Downloaded '{}' to {}.", record.name, model_dir.display());
    Ok(())
}

async fn handle_convert(
    workspace: &Path,
    models_dir: Option<PathBuf>,
    name: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let config = load_config(workspace, models_dir)?;
    let registry = scan_registry(&config)?;
    let record = find_model(&registry, name)?;
    let manifest = &record.manifest;

    if manifest.conversion_to_onnx_args.is_empty() && manifest.model_optimizer_args.is_empty() {
        println!("Model '{}' declares no conversion stages.", record.name);
        return Ok(());
    }

    let downloader = Downloader::new(
        config.download_dir.clone(),
        Duration::from_secs(config.download_timeout_secs),
    )?;
    let dl_dir = downloader.model_dir(&record.name);
    if !dry_run {
        // fetch_all is a no-op for files already present and verified
        downloader.fetch_all(manifest, &record.name).await?;
        postprocess::apply_all(&manifest.postprocessing, &dl_dir)?;
    }

    let conv_dir = config.conversion_dir.join(&record.name);
    if !dry_run {
        std::fs::create_dir_all(&conv_dir)?;
    }

    let export_script = if config.export_script.is_relative() {
        workspace.join(&config.export_script)
    } else {
        config.export_script.clone()
    };
    let vars = TemplateVars::new(&record.config_dir, &dl_dir, &conv_dir);
    let converter = Converter::new(config.python.clone(), config.model_optimizer.clone(), export_script);
    converter.convert(manifest, &vars, dry_run).await?;

    if !dry_run {
        println!("Converted '{}' into {}.", record.name, conv_dir.display());
    }
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join(CONFIG_FILE);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let default_config = ZooConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!("Created default configuration at: {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = ovzoo_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_dirs_resolve_against_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(config.models_dir.starts_with(dir.path()));
        assert!(config.download_dir.starts_with(dir.path()));
    }

    #[test]
    fn test_models_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), Some(PathBuf::from("/zoo/models"))).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/zoo/models"));
    }
}

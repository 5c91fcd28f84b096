//! Conversion: build and invoke the external ONNX exporter and the model
//! optimizer with the manifest's templated argument lists.

use std::path::PathBuf;
use std::process::Stdio;

use crate::error::ZooError;
use crate::manifest::Manifest;
use crate::template::TemplateVars;

/// A fully resolved external command, ready to run or to print (dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Drives the two conversion stages an exported model goes through:
/// framework weights to ONNX, then ONNX to the deployable IR.
pub struct Converter {
    python: PathBuf,
    model_optimizer: PathBuf,
    export_script: PathBuf,
}

impl Converter {
    pub fn new(python: PathBuf, model_optimizer: PathBuf, export_script: PathBuf) -> Self {
        Self {
            python,
            model_optimizer,
            export_script,
        }
    }

    /// Command exporting the framework weights to ONNX. `None` when the
    /// manifest declares no conversion stage.
    pub fn onnx_command(
        &self,
        manifest: &Manifest,
        vars: &TemplateVars,
    ) -> Result<Option<CommandLine>, ZooError> {
        if manifest.conversion_to_onnx_args.is_empty() {
            return Ok(None);
        }
        let mut args = vec![self.export_script.to_string_lossy().into_owned()];
        args.extend(vars.substitute_args(&manifest.conversion_to_onnx_args)?);
        Ok(Some(CommandLine {
            program: self.python.to_string_lossy().into_owned(),
            args,
        }))
    }

    /// Command running the model optimizer over the intermediate ONNX
    /// model. The output directory is wired in by the tool, not the
    /// manifest, per the zoo's working-directory conventions.
    pub fn optimizer_command(
        &self,
        manifest: &Manifest,
        vars: &TemplateVars,
    ) -> Result<Option<CommandLine>, ZooError> {
        if manifest.model_optimizer_args.is_empty() {
            return Ok(None);
        }
        let mut args = vars.substitute_args(&manifest.model_optimizer_args)?;
        if let Some(conv_dir) = vars.get("conv_dir") {
            args.push(format!("--output_dir={conv_dir}"));
        }
        Ok(Some(CommandLine {
            program: self.model_optimizer.to_string_lossy().into_owned(),
            args,
        }))
    }

    /// Run both stages in order. With `dry_run` the resolved command lines
    /// are logged and printed but nothing executes.
    pub async fn convert(
        &self,
        manifest: &Manifest,
        vars: &TemplateVars,
        dry_run: bool,
    ) -> Result<(), ZooError> {
        let stages = [
            self.onnx_command(manifest, vars)?,
            self.optimizer_command(manifest, vars)?,
        ];
        for cmd in stages.into_iter().flatten() {
            if dry_run {
                println!("{cmd}");
                continue;
            }
            tracing::info!(command = %cmd, "Running conversion stage");
            run_command(&cmd).await?;
        }
        Ok(())
    }
}

async fn run_command(cmd: &CommandLine) -> Result<(), ZooError> {
    let output = tokio::process::Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ZooError::conversion(format!("failed to spawn '{}': {e}", cmd.program)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ZooError::conversion(format!(
            "'{}' exited with {}: {}",
            cmd.program,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

//! Variable substitution for templated argument lists.
//!
//! Manifests template their converter arguments with `$config_dir`,
//! `$dl_dir`, and `$conv_dir`; the tool resolves them against its working
//! directories before invoking anything.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::ZooError;

static VAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Resolved values for the manifest's template variables.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    vars: HashMap<String, String>,
}

impl TemplateVars {
    /// The standard variable set: the model's config directory (where
    /// `model.yml` lives), its download directory, and its conversion
    /// output directory.
    pub fn new(config_dir: &Path, dl_dir: &Path, conv_dir: &Path) -> Self {
        let mut vars = HashMap::new();
        vars.insert("config_dir".to_string(), path_str(config_dir));
        vars.insert("dl_dir".to_string(), path_str(dl_dir));
        vars.insert("conv_dir".to_string(), path_str(conv_dir));
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitute every `$var` occurrence in one argument. Any token naming
    /// an unknown variable is an error: a command line with unresolved
    /// `$var` text must never reach the converter.
    pub fn substitute(&self, arg: &str) -> Result<String, ZooError> {
        let mut unresolved: Option<String> = None;
        let result = VAR_TOKEN.replace_all(arg, |caps: &Captures| {
            let name = &caps[1];
            match self.vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    if unresolved.is_none() {
                        unresolved = Some(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        if let Some(var) = unresolved {
            return Err(ZooError::UnresolvedVariable {
                arg: arg.to_string(),
                var,
            });
        }
        Ok(result.into_owned())
    }

    /// Substitute an entire argument list, preserving order.
    pub fn substitute_args(&self, args: &[String]) -> Result<Vec<String>, ZooError> {
        args.iter().map(|a| self.substitute(a)).collect()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// True if the argument still carries a `$var` token.
pub fn has_unresolved(arg: &str) -> bool {
    VAR_TOKEN.is_match(arg)
}

//! Postprocessing: archive unpacking and regex patching of the downloaded
//! model tree.
//!
//! Steps run strictly in manifest order; a patch may target a file that an
//! earlier unpack produced. Patterns use lookaround assertions, so they go
//! through fancy-regex rather than the regex crate.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tar::Archive;
use zip::read::ZipArchive;

use crate::error::ZooError;
use crate::manifest::{ArchiveFormat, PostprocessingStep};

/// Apply every postprocessing step against the model's download directory.
pub fn apply_all(steps: &[PostprocessingStep], model_dir: &Path) -> Result<(), ZooError> {
    for step in steps {
        apply_step(step, model_dir)?;
    }
    Ok(())
}

/// Apply a single step.
pub fn apply_step(step: &PostprocessingStep, model_dir: &Path) -> Result<(), ZooError> {
    match step {
        PostprocessingStep::UnpackArchive { format, file } => {
            let archive_path = model_dir.join(file);
            tracing::info!(archive = %archive_path.display(), ?format, "Unpacking archive");
            unpack_archive(*format, &archive_path)
        }
        PostprocessingStep::RegexReplace {
            file,
            pattern,
            replacement,
            count,
        } => {
            let target = model_dir.join(file);
            tracing::info!(file = %target.display(), pattern = %pattern, "Applying patch");
            regex_replace(&target, pattern, replacement, *count)
        }
    }
}

/// Unpack an archive next to itself: entries land in the archive's parent
/// directory, which is where later patch steps expect them.
fn unpack_archive(format: ArchiveFormat, archive_path: &Path) -> Result<(), ZooError> {
    if !archive_path.exists() {
        return Err(ZooError::postprocess(format!(
            "archive not found: {}",
            archive_path.display()
        )));
    }
    let dest = archive_path
        .parent()
        .ok_or_else(|| ZooError::postprocess("archive has no parent directory"))?;
    let file = File::open(archive_path)?;
    match format {
        ArchiveFormat::Zip => unpack_zip(file, dest),
        ArchiveFormat::Gztar => unpack_tar(GzDecoder::new(file), dest),
        ArchiveFormat::Tar => unpack_tar(file, dest),
    }
}

fn unpack_zip(file: File, dest: &Path) -> Result<(), ZooError> {
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        // enclosed_name rejects absolute paths and parent-dir traversal
        let Some(relative) = entry.enclosed_name() else {
            return Err(ZooError::postprocess(format!(
                "zip entry '{}' escapes the destination",
                entry.name()
            )));
        };
        let out_path = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        let mut out = File::create(&out_path)?;
        out.write_all(&buf)?;
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<(), ZooError> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        // unpack_in refuses entries that would land outside dest
        if !entry.unpack_in(dest)? {
            return Err(ZooError::postprocess(format!(
                "tar entry '{}' escapes the destination",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Apply one find/replace patch. The pattern must match at least once:
/// a non-matching pattern means the patch went stale against a newer
/// upstream release, and silently skipping it would break the conversion
/// later in a far less obvious way.
fn regex_replace(
    target: &Path,
    pattern: &str,
    replacement: &str,
    count: Option<usize>,
) -> Result<(), ZooError> {
    if !target.exists() {
        return Err(ZooError::postprocess(format!(
            "patch target not found: {}",
            target.display()
        )));
    }
    let content = std::fs::read_to_string(target)?;
    let re = fancy_regex::Regex::new(pattern)?;
    if !re.is_match(&content)? {
        return Err(ZooError::PatternNotFound {
            file: target.display().to_string(),
            pattern: pattern.to_string(),
        });
    }
    let patched = match count {
        Some(n) if n > 0 => re.replacen(&content, n, replacement),
        _ => re.replace_all(&content, replacement),
    };
    std::fs::write(target, patched.as_bytes())?;
    Ok(())
}

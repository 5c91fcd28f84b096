//! Downloader: fetch manifest files, verify size and checksum, place them
//! under the model's download directory.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::checksum;
use crate::error::ZooError;
use crate::manifest::{FileEntry, Manifest};

/// Downloads the files a manifest lists.
///
/// Every file streams to a staging path first and is only renamed into
/// place once both the byte length and the SHA-384 digest check out. A
/// mismatch aborts the whole pipeline; nothing downstream may run against
/// unverified bytes.
pub struct Downloader {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl Downloader {
    pub fn new(download_dir: PathBuf, timeout: Duration) -> Result<Self, ZooError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ovzoo/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            download_dir,
        })
    }

    /// Directory a model's files land in.
    pub fn model_dir(&self, model_name: &str) -> PathBuf {
        self.download_dir.join(model_name)
    }

    /// Fetch and verify every file in the manifest. Returns the model's
    /// download directory. Files already present with a matching checksum
    /// are not fetched again.
    pub async fn fetch_all(
        &self,
        manifest: &Manifest,
        model_name: &str,
    ) -> Result<PathBuf, ZooError> {
        let model_dir = self.model_dir(model_name);
        for entry in &manifest.files {
            self.fetch_one(entry, &model_dir).await?;
        }
        Ok(model_dir)
    }

    async fn fetch_one(&self, entry: &FileEntry, model_dir: &Path) -> Result<(), ZooError> {
        let target = model_dir.join(&entry.name);
        if target.exists()
            && verify_entry_blocking(target.clone(), entry.clone())
                .await
                .is_ok()
        {
            tracing::info!(file = %entry.name.display(), "Already downloaded, checksum matches");
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = staging_path(&target);
        tracing::info!(
            file = %entry.name.display(),
            source = %entry.source,
            size = entry.size,
            "Downloading"
        );
        let downloaded = self.download_to(&entry.source, &staging).await?;
        if downloaded != entry.size {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(ZooError::SizeMismatch {
                file: entry.name.display().to_string(),
                expected: entry.size,
                actual: downloaded,
            });
        }
        let staged = staging.clone();
        let expected = entry.checksum.clone();
        let verified =
            tokio::task::spawn_blocking(move || checksum::verify_file(&staged, &expected))
                .await
                .map_err(|e| ZooError::download(format!("verification task failed: {e}")))?;
        if let Err(e) = verified {
            let _ = tokio::fs::remove_file(&staging).await;
            // rewrap so the error names the manifest entry, not the staging path
            return match e {
                ZooError::ChecksumMismatch {
                    expected, actual, ..
                } => Err(ZooError::ChecksumMismatch {
                    file: entry.name.display().to_string(),
                    expected,
                    actual,
                }),
                other => Err(other),
            };
        }
        tokio::fs::rename(&staging, &target).await?;
        tracing::info!(file = %entry.name.display(), "Verified");
        Ok(())
    }

    async fn download_to(&self, source: &str, staging: &Path) -> Result<u64, ZooError> {
        let mut response = self
            .client
            .get(source)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ZooError::download(format!("{source}: {e}")))?;

        let mut file = tokio::fs::File::create(staging).await?;
        let mut downloaded = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(downloaded)
    }
}

/// Check a file on disk against a manifest entry: byte length first, then
/// the digest.
pub fn verify_entry(path: &Path, entry: &FileEntry) -> Result<(), ZooError> {
    let actual = std::fs::metadata(path)?.len();
    if actual != entry.size {
        return Err(ZooError::SizeMismatch {
            file: entry.name.display().to_string(),
            expected: entry.size,
            actual,
        });
    }
    checksum::verify_file(path, &entry.checksum)
}

/// [`verify_entry`] on a blocking task. Hashing a checkpoint reads
/// hundreds of megabytes and must not stall the async runtime.
async fn verify_entry_blocking(path: PathBuf, entry: FileEntry) -> Result<(), ZooError> {
    tokio::task::spawn_blocking(move || verify_entry(&path, &entry))
        .await
        .map_err(|e| ZooError::download(format!("verification task failed: {e}")))?
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

//! Plan output
//!
//! The plan is written to a temporary file next to its destination and then
//! renamed over it, so a reader never sees a half-written plan.

use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use super::BundleConfig;
use crate::generation::{GenerateError, GenerateResult};

/// Serialize the plan as pretty JSON and atomically replace `path`
pub async fn write_plan(plan: &[BundleConfig], path: &Path) -> GenerateResult<PathBuf> {
    let json = serde_json::to_vec_pretty(plan)?;
    let target = path.to_path_buf();

    let written = tokio::task::spawn_blocking(move || -> GenerateResult<PathBuf> {
        use std::io::Write;

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(&json)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|e| GenerateError::Io(e.error))?;
        Ok(target)
    })
    .await
    .map_err(|e| GenerateError::Io(std::io::Error::other(e)))??;

    info!("Generated bundling plan written to {}", written.display());
    Ok(written)
}

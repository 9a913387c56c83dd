use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use framescribe_core::VideoDescription;
use tokio::fs;

/// `<stem>_description.json` inside `output_dir`.
pub fn description_path(output_dir: &Path, video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    output_dir.join(format!("{stem}_description.json"))
}

/// Save a description as pretty JSON, creating the output directory if needed.
pub async fn save_description(
    description: &VideoDescription,
    output_dir: &Path,
    video: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("cannot create {}", output_dir.display()))?;

    let path = description_path(output_dir, video);
    let pretty_json = serde_json::to_string_pretty(description)?;
    fs::write(&path, &pretty_json)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

use std::{path::Path, time::SystemTime};

use chrono::{DateTime, Utc};

use crate::{
    error::{FramescribeError, Result},
    types::FileMetadata,
};

/// `createdAt` wire format.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub fn format_created_at(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(CREATED_AT_FORMAT)
        .to_string()
}

impl FileMetadata {
    /// Read name, absolute path, size and creation time of a video file.
    ///
    /// Filesystems without a birth time fall back to the modification time.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let probe_failed = |reason: String| FramescribeError::Probe {
            path: path.to_path_buf(),
            reason,
        };

        let stat = tokio::fs::metadata(path)
            .await
            .map_err(|e| probe_failed(format!("cannot stat file: {e}")))?;
        if !stat.is_file() {
            return Err(probe_failed("not a regular file".to_string()));
        }

        let created = stat
            .created()
            .or_else(|_| stat.modified())
            .map_err(|e| probe_failed(format!("no file timestamps available: {e}")))?;
        let absolute = std::path::absolute(path)
            .map_err(|e| probe_failed(format!("cannot resolve absolute path: {e}")))?;

        Ok(Self {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: absolute.to_string_lossy().into_owned(),
            file_size: stat.len(),
            created_at: format_created_at(created),
        })
    }
}

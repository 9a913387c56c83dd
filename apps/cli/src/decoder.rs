use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use framescribe_core::{DecodeError, Frame, FrameDecoder};
use tokio::process::Command;

/// Grabs one JPEG frame per call by piping `ffmpeg` output.
pub struct FfmpegDecoder;

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn decode(&self, path: &Path, timestamp: f64) -> Result<Frame, DecodeError> {
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-ss"])
            .arg(format!("{timestamp:.3}"))
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DecodeError::new(format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(DecodeError::new(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(DecodeError::new("ffmpeg produced no frame"));
        }

        Ok(Frame::new(timestamp, output.stdout))
    }
}

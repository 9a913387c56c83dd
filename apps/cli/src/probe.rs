//! FFprobe-backed [`VideoProber`].

use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use framescribe_core::{ProbeError, Resolution, TechnicalProbe, VideoProber};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

pub struct FfprobeProber;

#[async_trait]
impl VideoProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<TechnicalProbe, ProbeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProbeError::new(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ProbeError::new(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe = parse_probe(path, &output.stdout)?;
        debug!(path = %path.display(), duration = probe.duration, "probed video");
        Ok(probe)
    }
}

fn parse_probe(path: &Path, stdout: &[u8]) -> Result<TechnicalProbe, ProbeError> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ProbeError::new(format!("unreadable ffprobe output: {e}")))?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| ProbeError::new("no video stream found"))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ProbeError::new("container reports no usable duration"))?;

    let (Some(width), Some(height)) = (video_stream.width, video_stream.height) else {
        return Err(ProbeError::new("video stream has no dimensions"));
    };

    // avg_frame_rate is "0/0" for some containers
    let frame_rate = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| ProbeError::new("video stream has no frame rate"))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let video_format = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .or_else(|| {
            probe
                .format
                .format_name
                .as_deref()
                .and_then(|names| names.split(',').next())
                .map(str::to_string)
        })
        .unwrap_or_default();

    Ok(TechnicalProbe {
        duration,
        resolution: Resolution { width, height },
        frame_rate,
        has_audio,
        video_format,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFPROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "12.480000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    #[test]
    fn parses_ffprobe_output() {
        let probe = parse_probe(Path::new("/videos/Clip.MP4"), FFPROBE_JSON.as_bytes()).unwrap();
        assert_eq!(probe.duration, 12.48);
        assert_eq!(
            probe.resolution,
            Resolution {
                width: 1920,
                height: 1080
            }
        );
        assert!((probe.frame_rate - 29.97).abs() < 0.01);
        assert!(probe.has_audio);
        assert_eq!(probe.video_format, "mp4");
    }

    #[test]
    fn falls_back_to_container_name_and_real_frame_rate() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 360,
                         "r_frame_rate": "25/1", "avg_frame_rate": "0/0"}],
            "format": {"duration": "3.0", "format_name": "matroska,webm"}
        }"#;
        let probe = parse_probe(Path::new("/videos/clip"), json.as_bytes()).unwrap();
        assert_eq!(probe.frame_rate, 25.0);
        assert!(!probe.has_audio);
        assert_eq!(probe.video_format, "matroska");
    }

    #[test]
    fn rejects_audio_only_and_durationless_files() {
        let audio_only = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "5.0"}}"#;
        let err = parse_probe(Path::new("a.m4a"), audio_only.as_bytes()).unwrap_err();
        assert_eq!(err.reason, "no video stream found");

        let no_duration = r#"{
            "streams": [{"codec_type": "video", "width": 2, "height": 2, "r_frame_rate": "1/1"}],
            "format": {}
        }"#;
        assert!(parse_probe(Path::new("a.mp4"), no_duration.as_bytes()).is_err());
    }
}

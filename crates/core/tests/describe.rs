use std::{io::Cursor, path::Path, sync::Arc};

use async_trait::async_trait;
use framescribe_core::{
    AnalyzerConfig, AudioTranscriber, Caption, CaptionOracle, Collaborators, DecodeError, Frame,
    FrameDecoder, OracleError, Pipeline, ProbeError, Resolution, SamplingStrategy, TechnicalProbe,
    TranscriptionError, VideoProber,
};

struct StaticProber;

#[async_trait]
impl VideoProber for StaticProber {
    async fn probe(&self, _path: &Path) -> Result<TechnicalProbe, ProbeError> {
        Ok(TechnicalProbe {
            duration: 100.0,
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            frame_rate: 29.97,
            has_audio: true,
            video_format: "mp4".to_string(),
        })
    }
}

/// Mid-grey PNG frames.
struct GreyDecoder;

#[async_trait]
impl FrameDecoder for GreyDecoder {
    async fn decode(&self, _path: &Path, timestamp: f64) -> Result<Frame, DecodeError> {
        let image = image::RgbImage::from_pixel(16, 16, image::Rgb([128, 128, 128]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageOutputFormat::Png)
            .map_err(|e| DecodeError::new(e.to_string()))?;
        Ok(Frame::new(timestamp, bytes.into_inner()))
    }
}

struct FixedOracle {
    text: &'static str,
    confidence: f64,
}

#[async_trait]
impl CaptionOracle for FixedOracle {
    async fn caption(&self, _frame: &Frame) -> Result<Caption, OracleError> {
        Ok(Caption {
            text: self.text.to_string(),
            confidence: self.confidence,
        })
    }
}

fn pipeline(oracle: FixedOracle, config: &AnalyzerConfig) -> Pipeline {
    Pipeline::new(
        Collaborators {
            prober: Arc::new(StaticProber),
            decoder: Arc::new(GreyDecoder),
            oracle: Arc::new(oracle),
        },
        config,
    )
}

fn video(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("dog_walk.mp4");
    std::fs::write(&path, vec![0u8; 4096]).unwrap();
    path
}

#[tokio::test]
async fn describes_a_video_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = video(&dir);
    let config = AnalyzerConfig {
        sampling: SamplingStrategy::FrameCount(2),
        ..Default::default()
    };
    let oracle = FixedOracle {
        text: "a dog running",
        confidence: 0.9,
    };

    let description = pipeline(oracle, &config).describe(&path).await.unwrap();

    let json = serde_json::to_value(&description).unwrap();
    assert_eq!(json["type"], "video");
    assert_eq!(json["metadata"]["fileName"], "dog_walk.mp4");
    assert_eq!(json["metadata"]["fileSize"], 4096);
    assert_eq!(json["metadata"]["description"], "a dog running");
    assert_eq!(json["duration"], 100.0);
    assert_eq!(json["resolution"]["width"], 1280);
    assert_eq!(json["frameRate"], 29.97);
    assert_eq!(json["hasAudio"], true);
    assert_eq!(json["videoFormat"], "mp4");

    let analysis = &json["contentAnalysis"];
    assert_eq!(analysis["contentOverview"], "a dog running");
    assert_eq!(analysis["actionIntroduction"], "a dog running");
    assert_eq!(analysis["detectedObjects"], serde_json::json!(["dog"]));
    assert_eq!(analysis["detectedScenes"], serde_json::json!([]));
    assert_eq!(analysis["estimatedMood"], "neutral");

    let details = analysis["timeBoundDetails"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["detailStartTime"], 0.0);
    assert_eq!(details[0]["detailEndTime"], 50.0);
    assert_eq!(details[1]["detailStartTime"], 50.0);
    assert_eq!(details[1]["detailEndTime"], 100.0);
    assert_eq!(details[1]["detailConfidence"], 0.9);
    assert!(details[0].get("technicalAnalysis").is_none());
    assert!(analysis.get("audioTranscript").is_none());
}

struct Narrator;

#[async_trait]
impl AudioTranscriber for Narrator {
    async fn transcribe(&self, _path: &Path) -> Result<String, TranscriptionError> {
        Ok("The dog chases the ball.".to_string())
    }
}

#[tokio::test]
async fn audio_transcript_is_part_of_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = video(&dir);
    let config = AnalyzerConfig {
        sampling: SamplingStrategy::FrameCount(2),
        audio_transcription: true,
        ..Default::default()
    };
    let oracle = FixedOracle {
        text: "a dog running",
        confidence: 0.9,
    };

    let description = pipeline(oracle, &config)
        .with_transcriber(Arc::new(Narrator))
        .describe(&path)
        .await
        .unwrap();

    let json = serde_json::to_value(&description).unwrap();
    assert_eq!(
        json["contentAnalysis"]["audioTranscript"],
        "The dog chases the ball."
    );
    assert_eq!(json["metadata"]["description"], "a dog running");
}

#[tokio::test]
async fn out_of_range_confidence_yields_no_description() {
    let dir = tempfile::tempdir().unwrap();
    let path = video(&dir);
    let oracle = FixedOracle {
        text: "a dog running",
        confidence: 1.5,
    };

    let err = pipeline(oracle, &AnalyzerConfig::default())
        .describe(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_observation");
}

#[tokio::test]
async fn frame_quality_is_attached_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = video(&dir);
    let config = AnalyzerConfig {
        sampling: SamplingStrategy::Periodic(25.0),
        frame_quality: true,
        ..Default::default()
    };
    let oracle = FixedOracle {
        text: "a grey wall",
        confidence: 0.5,
    };

    let description = pipeline(oracle, &config).describe(&path).await.unwrap();

    let details = &description.content_analysis.time_bound_details;
    assert_eq!(details.len(), 4);
    for detail in details {
        let quality = detail.technical_analysis.expect("quality metrics");
        assert!((quality.brightness - 128.0 / 255.0).abs() < 1e-6);
        assert!(quality.clarity.abs() < 1e-9);
    }
}

//! Seams to the outside world: probing, frame decoding, captioning and audio
//! transcription.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{DecodeError, FramescribeError, OracleError, ProbeError, Result, TranscriptionError},
    types::{Caption, Frame, SamplePoint, TechnicalProbe},
};

/// Reads container-level facts (duration, resolution, frame rate...) of a video.
#[async_trait]
pub trait VideoProber: Send + Sync {
    async fn probe(&self, path: &Path) -> std::result::Result<TechnicalProbe, ProbeError>;
}

/// Grabs a single still image at a timestamp.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, path: &Path, timestamp: f64) -> std::result::Result<Frame, DecodeError>;
}

/// Opaque image-to-text model.
#[async_trait]
pub trait CaptionOracle: Send + Sync {
    async fn caption(&self, frame: &Frame) -> std::result::Result<Caption, OracleError>;
}

/// Speech-to-text over the audio track of a video. Returns the plain transcript,
/// possibly empty when nothing was said.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    async fn transcribe(&self, path: &Path) -> std::result::Result<String, TranscriptionError>;
}

/// Uniform contract around a [`CaptionOracle`]: one call per sample, output
/// validated before it reaches aggregation.
pub struct CaptionAdapter<'a> {
    oracle: &'a dyn CaptionOracle,
}

impl<'a> CaptionAdapter<'a> {
    pub fn new(oracle: &'a dyn CaptionOracle) -> Self {
        Self { oracle }
    }

    pub async fn caption(&self, point: &SamplePoint, frame: &Frame) -> Result<Caption> {
        let unavailable = |reason: String| FramescribeError::OracleUnavailable {
            timestamp: point.timestamp,
            reason,
        };

        let caption = self
            .oracle
            .caption(frame)
            .await
            .map_err(|e| unavailable(e.reason))?;

        let text = caption.text.trim();
        if text.is_empty() {
            return Err(unavailable("oracle returned an empty caption".to_string()));
        }
        if !caption.confidence.is_finite() || !(0.0..=1.0).contains(&caption.confidence) {
            return Err(FramescribeError::InvalidObservation {
                index: point.index,
                reason: format!(
                    "oracle returned confidence {} outside [0, 1]",
                    caption.confidence
                ),
            });
        }

        debug!(
            timestamp = point.timestamp,
            confidence = caption.confidence,
            "frame captioned"
        );

        Ok(Caption {
            text: text.to_string(),
            confidence: caption.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    struct FixedOracle(std::result::Result<Caption, String>);

    #[async_trait]
    impl CaptionOracle for FixedOracle {
        async fn caption(&self, _frame: &Frame) -> std::result::Result<Caption, OracleError> {
            self.0.clone().map_err(OracleError::new)
        }
    }

    fn point() -> SamplePoint {
        SamplePoint {
            index: 0,
            timestamp: 2.5,
            segment: Segment::new(0.0, 5.0),
        }
    }

    async fn run(oracle: FixedOracle) -> Result<Caption> {
        let frame = Frame::new(2.5, vec![0xFF, 0xD8]);
        CaptionAdapter::new(&oracle).caption(&point(), &frame).await
    }

    #[tokio::test]
    async fn passes_valid_caption_through_trimmed() {
        let caption = run(FixedOracle(Ok(Caption {
            text: "  a cat on a sofa ".to_string(),
            confidence: 0.7,
        })))
        .await
        .unwrap();
        assert_eq!(caption.text, "a cat on a sofa");
        assert_eq!(caption.confidence, 0.7);
    }

    #[tokio::test]
    async fn empty_caption_means_the_oracle_failed() {
        let err = run(FixedOracle(Ok(Caption {
            text: "   ".to_string(),
            confidence: 0.5,
        })))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "oracle_unavailable");
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_an_invalid_observation() {
        for confidence in [1.5, -0.1, f64::NAN] {
            let err = run(FixedOracle(Ok(Caption {
                text: "a dog".to_string(),
                confidence,
            })))
            .await
            .unwrap_err();
            assert_eq!(err.kind(), "invalid_observation");
        }
    }

    #[tokio::test]
    async fn maps_oracle_failures() {
        let err = run(FixedOracle(Err("model not loaded".to_string())))
            .await
            .unwrap_err();
        match err {
            FramescribeError::OracleUnavailable { timestamp, reason } => {
                assert_eq!(timestamp, 2.5);
                assert_eq!(reason, "model not loaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Temporal aggregation of caption observations into a [`ContentAnalysis`].

use std::{collections::HashSet, sync::Arc};

use crate::{
    classify::{ContentClassifier, KeywordClassifier, tokenize},
    config::OverviewConfig,
    error::{FramescribeError, Result},
    types::{CaptionObservation, ContentAnalysis, TimeBoundDetail},
};

/// Slack for float comparisons between adjacent segment bounds, in seconds.
pub const BOUNDARY_EPSILON: f64 = 1e-6;

#[derive(Clone)]
pub struct Aggregator {
    overview: OverviewConfig,
    classifier: Arc<dyn ContentClassifier>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(OverviewConfig::default(), Arc::new(KeywordClassifier::default()))
    }
}

impl Aggregator {
    pub fn new(overview: OverviewConfig, classifier: Arc<dyn ContentClassifier>) -> Self {
        Self {
            overview,
            classifier,
        }
    }

    pub fn overview_config(&self) -> &OverviewConfig {
        &self.overview
    }

    /// Aggregate observations in any order. They are re-sorted by segment
    /// start, so completion order of oracle calls does not matter.
    pub fn aggregate(&self, observations: &[CaptionObservation]) -> Result<ContentAnalysis> {
        for (index, observation) in observations.iter().enumerate() {
            validate(index, observation)?;
        }

        let mut ordered: Vec<&CaptionObservation> = observations.iter().collect();
        ordered.sort_by(|a, b| a.segment.start.total_cmp(&b.segment.start));

        for (index, pair) in ordered.windows(2).enumerate() {
            if pair[0].segment.end > pair[1].segment.start + BOUNDARY_EPSILON {
                return Err(FramescribeError::InvalidObservation {
                    index: index + 1,
                    reason: format!(
                        "segment [{}, {}) overlaps the previous one ending at {}",
                        pair[1].segment.start, pair[1].segment.end, pair[0].segment.end
                    ),
                });
            }
        }

        let time_bound_details: Vec<TimeBoundDetail> = ordered
            .iter()
            .map(|obs| TimeBoundDetail {
                start: obs.segment.start,
                end: obs.segment.end,
                description: obs.text.clone(),
                confidence: obs.confidence,
                technical_analysis: obs.quality,
            })
            .collect();

        let action_introduction = time_bound_details
            .first()
            .map(|detail| detail.description.clone())
            .unwrap_or_default();

        let content_overview = self.overview(ordered.iter().map(|obs| obs.text.as_str()));

        let tokens: Vec<String> = ordered.iter().flat_map(|obs| tokenize(&obs.text)).collect();
        let classification = self.classifier.classify(&tokens);

        Ok(ContentAnalysis {
            content_overview,
            action_introduction,
            time_bound_details,
            detected_objects: classification.objects,
            detected_scenes: classification.scenes,
            estimated_mood: classification.mood,
            audio_transcript: None,
            action_words: classification.actions,
        })
    }

    fn overview<'a>(&self, captions: impl Iterator<Item = &'a str>) -> String {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = captions
            .map(str::trim)
            .filter(|caption| seen.insert(caption.to_lowercase()))
            .take(self.overview.caption_limit)
            .collect();
        distinct.join(&self.overview.separator)
    }
}

fn validate(index: usize, observation: &CaptionObservation) -> Result<()> {
    let invalid = |reason: String| Err(FramescribeError::InvalidObservation { index, reason });
    let segment = observation.segment;

    if !segment.start.is_finite() || !segment.end.is_finite() {
        return invalid(format!(
            "segment [{}, {}) is not finite",
            segment.start, segment.end
        ));
    }
    if segment.start < 0.0 {
        return invalid(format!("segment starts before 0 ({})", segment.start));
    }
    if segment.end <= segment.start {
        return invalid(format!(
            "segment [{}, {}) is empty",
            segment.start, segment.end
        ));
    }
    if !observation.confidence.is_finite() || !(0.0..=1.0).contains(&observation.confidence) {
        return invalid(format!(
            "confidence {} outside [0, 1]",
            observation.confidence
        ));
    }
    if observation.text.trim().is_empty() {
        return invalid("caption is empty".to_string());
    }
    Ok(())
}

//! Final record assembly and its consistency checks.

use crate::{
    aggregate::BOUNDARY_EPSILON,
    classify::dedup_case_insensitive,
    error::{FramescribeError, Result},
    types::{
        ContentAnalysis, DescriptionMetadata, FileMetadata, TechnicalProbe, VideoDescription,
    },
};

/// Combine an analysis with file and container facts.
///
/// Fails with [`FramescribeError::InconsistentAnalysis`] when the detail
/// segments do not tile `[0, probe.duration)` exactly with non-empty,
/// finite intervals.
pub fn assemble(
    analysis: ContentAnalysis,
    metadata: FileMetadata,
    probe: TechnicalProbe,
) -> Result<VideoDescription> {
    check_coverage(&analysis, probe.duration)?;

    let tags = dedup_case_insensitive(
        analysis
            .detected_objects
            .iter()
            .chain(&analysis.detected_scenes)
            .chain(&analysis.action_words)
            .cloned(),
    );

    Ok(VideoDescription {
        kind: VideoDescription::KIND.to_string(),
        metadata: DescriptionMetadata {
            file_name: metadata.file_name,
            file_path: metadata.file_path,
            file_size: metadata.file_size,
            created_at: metadata.created_at,
            description: analysis.content_overview.clone(),
            tags,
        },
        duration: probe.duration,
        resolution: probe.resolution,
        frame_rate: probe.frame_rate,
        has_audio: probe.has_audio,
        video_format: probe.video_format,
        content_analysis: analysis,
    })
}

fn check_coverage(analysis: &ContentAnalysis, duration: f64) -> Result<()> {
    let inconsistent = |reason: String| Err(FramescribeError::InconsistentAnalysis { reason });

    if !duration.is_finite() || duration <= 0.0 {
        return inconsistent(format!("probed duration {duration} is not positive"));
    }

    let details = &analysis.time_bound_details;
    let (Some(first), Some(last)) = (details.first(), details.last()) else {
        return Ok(());
    };

    if first.start.abs() > BOUNDARY_EPSILON {
        return inconsistent(format!("first detail starts at {} instead of 0", first.start));
    }
    if (last.end - duration).abs() > BOUNDARY_EPSILON {
        return inconsistent(format!(
            "last detail ends at {} but the video lasts {duration}",
            last.end
        ));
    }
    for detail in details {
        if !detail.start.is_finite() || !detail.end.is_finite() {
            return inconsistent(format!(
                "detail [{}, {}) has a non-finite bound",
                detail.start, detail.end
            ));
        }
        if detail.end <= detail.start + BOUNDARY_EPSILON {
            return inconsistent(format!(
                "detail [{}, {}) is empty or inverted",
                detail.start, detail.end
            ));
        }
    }
    for pair in details.windows(2) {
        if (pair[0].end - pair[1].start).abs() > BOUNDARY_EPSILON {
            return inconsistent(format!(
                "gap or overlap between {} and {}",
                pair[0].end, pair[1].start
            ));
        }
    }
    Ok(())
}

use crate::types::{TimeBoundDetail, VideoDescription};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format time-bound details as one `[start–end] caption` line each.
pub fn format_timeline(details: &[TimeBoundDetail]) -> String {
    details
        .iter()
        .map(|detail| {
            format!(
                "[{}–{}] {} ({:.0}%)",
                format_timestamp(detail.start),
                format_timestamp(detail.end),
                detail.description.trim(),
                detail.confidence * 100.0
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_description_readable(description: &VideoDescription) -> String {
    let analysis = &description.content_analysis;
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", description.metadata.file_name));
    output.push_str(&format!(
        "**Duration:** {} | **Resolution:** {}x{} | **Frame rate:** {:.2} fps | **Audio:** {}\n\n",
        format_timestamp(description.duration),
        description.resolution.width,
        description.resolution.height,
        description.frame_rate,
        if description.has_audio { "yes" } else { "no" }
    ));

    output.push_str("## Overview\n\n");
    output.push_str(&analysis.content_overview);
    output.push_str("\n\n");

    output.push_str(&format!("**Mood:** {}\n\n", analysis.estimated_mood));

    if !analysis.detected_objects.is_empty() {
        output.push_str(&format!(
            "**Objects:** {}\n",
            analysis.detected_objects.join(", ")
        ));
    }
    if !analysis.detected_scenes.is_empty() {
        output.push_str(&format!(
            "**Scenes:** {}\n",
            analysis.detected_scenes.join(", ")
        ));
    }
    if !description.metadata.tags.is_empty() {
        output.push_str(&format!("**Tags:** {}\n", description.metadata.tags.join(", ")));
    }
    output.push('\n');

    output.push_str("## Timeline\n\n");
    output.push_str(&format_timeline(&analysis.time_bound_details));
    output.push('\n');

    if let Some(transcript) = &analysis.audio_transcript {
        output.push_str("\n## Audio transcript\n\n");
        output.push_str(transcript);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentAnalysis, DescriptionMetadata, Resolution};

    fn detail(start: f64, end: f64, text: &str, confidence: f64) -> TimeBoundDetail {
        TimeBoundDetail {
            start,
            end,
            description: text.to_string(),
            confidence,
            technical_analysis: None,
        }
    }

    #[test]
    fn timestamps_are_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.9), "01:15");
        assert_eq!(format_timestamp(3600.0), "60:00");
    }

    #[test]
    fn timeline_lists_each_detail() {
        let timeline = format_timeline(&[
            detail(0.0, 50.0, " a dog running ", 0.9),
            detail(50.0, 100.0, "a dog resting", 0.75),
        ]);
        assert_eq!(
            timeline,
            "[00:00–00:50] a dog running (90%)\n[00:50–01:40] a dog resting (75%)"
        );
    }

    #[test]
    fn readable_summary_skips_empty_lists() {
        let description = VideoDescription {
            kind: VideoDescription::KIND.to_string(),
            metadata: DescriptionMetadata {
                file_name: "walk.mp4".to_string(),
                file_path: "/videos/walk.mp4".to_string(),
                file_size: 1024,
                created_at: "2024-01-01 00:00:00 UTC".to_string(),
                description: "a dog running".to_string(),
                tags: vec!["dog".to_string()],
            },
            duration: 100.0,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            frame_rate: 30.0,
            has_audio: true,
            video_format: "mp4".to_string(),
            content_analysis: ContentAnalysis {
                content_overview: "a dog running".to_string(),
                action_introduction: "a dog running".to_string(),
                time_bound_details: vec![detail(0.0, 100.0, "a dog running", 0.9)],
                detected_objects: vec!["dog".to_string()],
                estimated_mood: "neutral".to_string(),
                ..Default::default()
            },
        };

        let text = format_description_readable(&description);
        assert!(text.starts_with("# walk.mp4\n\n"));
        assert!(text.contains("**Resolution:** 1920x1080"));
        assert!(text.contains("**Audio:** yes"));
        assert!(text.contains("**Objects:** dog\n"));
        assert!(!text.contains("**Scenes:**"));
        assert!(text.contains("[00:00–01:40] a dog running (90%)"));
        assert!(!text.contains("## Audio transcript"));
    }

    #[test]
    fn readable_summary_ends_with_transcript() {
        let description = VideoDescription {
            kind: VideoDescription::KIND.to_string(),
            metadata: DescriptionMetadata {
                file_name: "talk.mp4".to_string(),
                file_path: "/videos/talk.mp4".to_string(),
                file_size: 2048,
                created_at: "2024-01-01 00:00:00 UTC".to_string(),
                description: "a man at a podium".to_string(),
                tags: Vec::new(),
            },
            duration: 10.0,
            resolution: Resolution {
                width: 640,
                height: 360,
            },
            frame_rate: 25.0,
            has_audio: true,
            video_format: "mp4".to_string(),
            content_analysis: ContentAnalysis {
                time_bound_details: vec![detail(0.0, 10.0, "a man at a podium", 0.8)],
                audio_transcript: Some("Welcome everyone.".to_string()),
                ..Default::default()
            },
        };

        let text = format_description_readable(&description);
        assert!(text.ends_with("## Audio transcript\n\nWelcome everyone.\n"));
    }
}

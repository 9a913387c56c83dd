//! Frame sampling plans.
//!
//! Every plan splits `[0, duration)` into contiguous segments with exactly one
//! sample timestamp inside each of them.

use serde::{Deserialize, Serialize};

use crate::{
    error::{FramescribeError, Result},
    types::{SamplePoint, Segment},
};

/// Upper bound on the samples of a single plan. Every sample costs a decode
/// and an oracle call, so larger plans are treated as a configuration mistake.
pub const MAX_SAMPLES: usize = 10_000;

/// How sample timestamps are chosen for a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// A fixed number of equal-width segments, sampled at their midpoints.
    FrameCount(usize),
    /// One sample every `period` seconds, starting at 0.
    Periodic(f64),
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        SamplingStrategy::FrameCount(5)
    }
}

impl SamplingStrategy {
    pub fn plan(&self, duration: f64) -> Result<Vec<SamplePoint>> {
        match *self {
            SamplingStrategy::FrameCount(count) => plan(duration, count),
            SamplingStrategy::Periodic(period) => plan_periodic(duration, period),
        }
    }
}

fn too_many_samples(requested: impl std::fmt::Display) -> FramescribeError {
    FramescribeError::InvalidParameter {
        reason: format!("plan would need {requested} samples, at most {MAX_SAMPLES} are allowed"),
    }
}

fn check_duration(duration: f64) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(FramescribeError::InvalidParameter {
            reason: format!("duration must be a positive number of seconds, got {duration}"),
        });
    }
    Ok(())
}

/// Split `[0, duration)` into `frame_count` equal segments and sample each
/// one at its midpoint.
pub fn plan(duration: f64, frame_count: usize) -> Result<Vec<SamplePoint>> {
    check_duration(duration)?;
    if frame_count == 0 {
        return Err(FramescribeError::InvalidParameter {
            reason: "frame count must be at least 1".to_string(),
        });
    }
    if frame_count > MAX_SAMPLES {
        return Err(too_many_samples(frame_count));
    }

    let width = duration / frame_count as f64;
    let mut points = Vec::with_capacity(frame_count);
    let mut start = 0.0;

    for index in 0..frame_count {
        let end = if index + 1 == frame_count {
            duration
        } else {
            (index + 1) as f64 * width
        };
        let segment = Segment::new(start, end);
        points.push(SamplePoint {
            index,
            timestamp: clamp_into(segment, start + (end - start) / 2.0),
            segment,
        });
        start = end;
    }

    Ok(points)
}

/// Sample every `period` seconds; segment boundaries sit halfway between
/// neighbouring samples.
pub fn plan_periodic(duration: f64, period: f64) -> Result<Vec<SamplePoint>> {
    check_duration(duration)?;
    if !period.is_finite() || period <= 0.0 {
        return Err(FramescribeError::InvalidParameter {
            reason: format!("sampling period must be a positive number of seconds, got {period}"),
        });
    }
    let needed = (duration / period).ceil();
    if needed > MAX_SAMPLES as f64 {
        return Err(too_many_samples(needed));
    }

    let mut timestamps = Vec::new();
    let mut step = 0usize;
    loop {
        let t = step as f64 * period;
        if t >= duration {
            break;
        }
        timestamps.push(t);
        step += 1;
    }

    let last = timestamps.len() - 1;
    let points = timestamps
        .iter()
        .enumerate()
        .map(|(index, &timestamp)| {
            let start = if index == 0 {
                0.0
            } else {
                (timestamps[index - 1] + timestamp) / 2.0
            };
            let end = if index == last {
                duration
            } else {
                (timestamp + timestamps[index + 1]) / 2.0
            };
            let segment = Segment::new(start, end);
            SamplePoint {
                index,
                timestamp: clamp_into(segment, timestamp),
                segment,
            }
        })
        .collect();

    Ok(points)
}

fn clamp_into(segment: Segment, timestamp: f64) -> f64 {
    if segment.contains(timestamp) {
        timestamp
    } else {
        segment.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exhaustive(points: &[SamplePoint], duration: f64) {
        assert_eq!(points.first().map(|p| p.segment.start), Some(0.0));
        assert_eq!(points.last().map(|p| p.segment.end), Some(duration));
        for pair in points.windows(2) {
            assert_eq!(pair[0].segment.end, pair[1].segment.start);
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        for point in points {
            assert!(point.segment.start < point.segment.end);
            assert!(point.segment.contains(point.timestamp));
        }
    }

    #[test]
    fn two_frames_split_in_half() {
        let points = plan(100.0, 2).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].segment, Segment::new(0.0, 50.0));
        assert_eq!(points[1].segment, Segment::new(50.0, 100.0));
        assert_eq!(points[0].timestamp, 25.0);
        assert_eq!(points[1].timestamp, 75.0);
    }

    #[test]
    fn single_frame_spans_whole_video() {
        let points = plan(12.5, 1).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].segment, Segment::new(0.0, 12.5));
        assert_eq!(points[0].timestamp, 6.25);
    }

    #[test]
    fn coverage_holds_for_awkward_inputs() {
        for (duration, count) in [(0.1, 7), (3.0, 3), (59.94, 11), (7200.0, 1000), (1e-6, 4)] {
            let points = plan(duration, count).unwrap();
            assert_eq!(points.len(), count);
            assert_exhaustive(&points, duration);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(
            plan(0.0, 3),
            Err(FramescribeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            plan(-4.0, 3),
            Err(FramescribeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            plan(f64::NAN, 3),
            Err(FramescribeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            plan(10.0, 0),
            Err(FramescribeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn periodic_boundaries_are_midpoints() {
        let points = plan_periodic(3.5, 1.0).unwrap();
        let timestamps: Vec<f64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(points[0].segment, Segment::new(0.0, 0.5));
        assert_eq!(points[1].segment, Segment::new(0.5, 1.5));
        assert_eq!(points[3].segment, Segment::new(2.5, 3.5));
        assert_exhaustive(&points, 3.5);
    }

    #[test]
    fn periodic_longer_than_video_yields_one_sample() {
        let points = plan_periodic(2.0, 10.0).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].segment, Segment::new(0.0, 2.0));
        assert_eq!(points[0].timestamp, 0.0);
    }

    #[test]
    fn periodic_rejects_non_positive_period() {
        assert!(plan_periodic(10.0, 0.0).is_err());
        assert!(plan_periodic(10.0, f64::INFINITY).is_err());
    }

    #[test]
    fn caps_the_number_of_samples() {
        assert_eq!(plan(1.0, MAX_SAMPLES).unwrap().len(), MAX_SAMPLES);
        let err = plan(1.0, MAX_SAMPLES + 1).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");

        assert_eq!(plan_periodic(5000.0, 0.5).unwrap().len(), MAX_SAMPLES);
        let err = plan_periodic(7200.0, 1e-9).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
        assert!(plan_periodic(1e300, 1e-300).is_err());
        assert!(plan_periodic(f64::MAX, f64::MIN_POSITIVE).is_err());
    }

    #[test]
    fn strategy_dispatches() {
        assert_eq!(SamplingStrategy::FrameCount(4).plan(8.0).unwrap().len(), 4);
        assert_eq!(SamplingStrategy::Periodic(2.0).plan(8.0).unwrap().len(), 4);
    }
}

//! Per-video pipeline: probe, plan, decode and caption every sample (and
//! transcribe the audio track alongside), aggregate, assemble.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, broadcast, broadcast::error::RecvError},
    task::JoinSet,
};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::{
    aggregate::Aggregator,
    assemble::assemble,
    classify::{ContentClassifier, KeywordClassifier},
    config::AnalyzerConfig,
    error::{FramescribeError, Result},
    oracle::{AudioTranscriber, CaptionAdapter, CaptionOracle, FrameDecoder, VideoProber},
    planner::SamplingStrategy,
    quality::FrameQuality,
    types::{CaptionObservation, FileMetadata, SamplePoint, VideoDescription},
};

/// The external collaborators a pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    pub prober: Arc<dyn VideoProber>,
    pub decoder: Arc<dyn FrameDecoder>,
    pub oracle: Arc<dyn CaptionOracle>,
}

/// Admission control for the captioning oracle, shared by every video that
/// talks to the same model.
#[derive(Clone)]
pub struct OracleGate {
    semaphore: Arc<Semaphore>,
}

impl OracleGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FramescribeError::Cancelled)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[derive(Clone)]
pub struct Pipeline {
    collaborators: Collaborators,
    aggregator: Aggregator,
    gate: OracleGate,
    sampling: SamplingStrategy,
    frame_concurrency: usize,
    frame_quality: bool,
    audio_transcription: bool,
    transcriber: Option<Arc<dyn AudioTranscriber>>,
}

/// Everything one caption task needs, shared between the tasks of one video.
struct FrameJob {
    path: PathBuf,
    decoder: Arc<dyn FrameDecoder>,
    oracle: Arc<dyn CaptionOracle>,
    gate: OracleGate,
    slots: Semaphore,
    frame_quality: bool,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, config: &AnalyzerConfig) -> Self {
        Self {
            collaborators,
            aggregator: Aggregator::new(
                config.overview.clone(),
                Arc::new(KeywordClassifier::default()),
            ),
            gate: OracleGate::new(config.oracle_concurrency.max(1)),
            sampling: config.sampling,
            frame_concurrency: config.frame_concurrency.max(1),
            frame_quality: config.frame_quality,
            audio_transcription: config.audio_transcription,
            transcriber: None,
        }
    }

    /// Swap the object/scene/mood policy.
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        let overview = self.aggregator.overview_config().clone();
        self.aggregator = Aggregator::new(overview, classifier);
        self
    }

    /// Share an oracle gate with other pipelines.
    pub fn with_gate(mut self, gate: OracleGate) -> Self {
        self.gate = gate;
        self
    }

    /// Attach the speech-to-text backend used when audio transcription is on.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn AudioTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn gate(&self) -> &OracleGate {
        &self.gate
    }

    /// Describe one video. Any stage failure aborts the whole video.
    pub async fn describe(&self, path: &Path) -> Result<VideoDescription> {
        let span = info_span!("video", path = %path.display(), run_id = %Uuid::new_v4());
        self.run(path).instrument(span).await
    }

    /// Like [`Pipeline::describe`], but gives up with
    /// [`FramescribeError::Cancelled`] once `shutdown` fires. In-flight oracle
    /// calls of this video are abandoned.
    pub async fn describe_until_cancelled(
        &self,
        path: &Path,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<VideoDescription> {
        tokio::select! {
            _ = cancelled(&mut shutdown) => {
                info!(path = %path.display(), "analysis cancelled");
                Err(FramescribeError::Cancelled)
            }
            result = self.describe(path) => result,
        }
    }

    async fn run(&self, path: &Path) -> Result<VideoDescription> {
        let started = Instant::now();

        let metadata = FileMetadata::from_path(path).await?;
        let probe = self
            .collaborators
            .prober
            .probe(path)
            .await
            .map_err(|e| FramescribeError::Probe {
                path: path.to_path_buf(),
                reason: e.reason,
            })?;
        debug!(
            duration = probe.duration,
            width = probe.resolution.width,
            height = probe.resolution.height,
            "video probed"
        );

        let plan = self.sampling.plan(probe.duration)?;
        debug!(samples = plan.len(), "sampling plan ready");

        let (observations, audio_transcript) = tokio::try_join!(
            self.caption_all(path, plan),
            self.transcribe(path, probe.has_audio)
        )?;
        let frames = observations.len();
        let mut analysis = self.aggregator.aggregate(&observations)?;
        analysis.audio_transcript = audio_transcript;
        let description = assemble(analysis, metadata, probe)?;

        info!(
            frames,
            mood = %description.content_analysis.estimated_mood,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "video described"
        );
        Ok(description)
    }

    /// Transcript of the audio track, `None` when transcription is off, the
    /// video is silent, or nothing was said.
    async fn transcribe(&self, path: &Path, has_audio: bool) -> Result<Option<String>> {
        if !self.audio_transcription || !has_audio {
            return Ok(None);
        }
        let Some(transcriber) = &self.transcriber else {
            return Err(FramescribeError::InvalidParameter {
                reason: "audio transcription is enabled but no transcriber is attached".to_string(),
            });
        };

        let started = Instant::now();
        let transcript = transcriber
            .transcribe(path)
            .await
            .map_err(|e| FramescribeError::Transcription { reason: e.reason })?;
        let transcript = transcript.trim();
        debug!(
            chars = transcript.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "audio transcribed"
        );
        Ok((!transcript.is_empty()).then(|| transcript.to_string()))
    }

    async fn caption_all(
        &self,
        path: &Path,
        plan: Vec<SamplePoint>,
    ) -> Result<Vec<CaptionObservation>> {
        let job = Arc::new(FrameJob {
            path: path.to_path_buf(),
            decoder: Arc::clone(&self.collaborators.decoder),
            oracle: Arc::clone(&self.collaborators.oracle),
            gate: self.gate.clone(),
            slots: Semaphore::new(self.frame_concurrency),
            frame_quality: self.frame_quality,
        });

        let mut tasks = JoinSet::new();
        for point in plan {
            tasks.spawn(caption_point(Arc::clone(&job), point).in_current_span());
        }

        // dropping `tasks` on an early return aborts the remaining calls
        let mut indexed = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, observation) = joined.map_err(|e| FramescribeError::Internal {
                reason: format!("caption task did not finish: {e}"),
            })??;
            indexed.push((index, observation));
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, observation)| observation).collect())
    }
}

async fn caption_point(job: Arc<FrameJob>, point: SamplePoint) -> Result<(usize, CaptionObservation)> {
    let _slot = job
        .slots
        .acquire()
        .await
        .map_err(|_| FramescribeError::Cancelled)?;

    let decode_failed = |reason: String| FramescribeError::Decode {
        timestamp: point.timestamp,
        reason,
    };

    let frame = job
        .decoder
        .decode(&job.path, point.timestamp)
        .await
        .map_err(|e| decode_failed(e.reason))?;

    let quality = if job.frame_quality {
        let frame = frame.clone();
        let quality = tokio::task::spawn_blocking(move || FrameQuality::analyze(&frame))
            .await
            .map_err(|e| decode_failed(format!("quality analysis did not finish: {e}")))?
            .map_err(|e| decode_failed(e.reason))?;
        Some(quality)
    } else {
        None
    };

    let caption = {
        let _permit = job.gate.acquire().await?;
        CaptionAdapter::new(job.oracle.as_ref())
            .caption(&point, &frame)
            .await?
    };

    let mut observation = CaptionObservation::new(point.segment, caption.text, caption.confidence);
    observation.quality = quality;
    Ok((point.index, observation))
}

/// Resolves once a shutdown is broadcast. A dropped sender never cancels.
async fn cancelled(shutdown: &mut broadcast::Receiver<()>) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => std::future::pending::<()>().await,
    }
}

//! Many videos through one pipeline, a bounded number at a time.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{
    sync::{Semaphore, broadcast},
    task::JoinSet,
};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::{AnalyzerConfig, FailurePolicy},
    error::{FramescribeError, Result},
    pipeline::Pipeline,
    types::VideoDescription,
};

pub struct VideoOutcome {
    pub path: PathBuf,
    pub result: Result<VideoDescription>,
}

/// Outcomes in the order the videos were submitted.
pub struct BatchReport {
    pub outcomes: Vec<VideoOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&Path, &VideoDescription)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(description) => Some((outcome.path.as_path(), description)),
            Err(_) => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &FramescribeError)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(error) => Some((outcome.path.as_path(), error)),
        })
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }
}

pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    video_concurrency: usize,
    policy: FailurePolicy,
}

impl BatchRunner {
    pub fn new(pipeline: Pipeline, config: &AnalyzerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            video_concurrency: config.video_concurrency.max(1),
            policy: config.failure_policy,
        }
    }

    pub async fn run(&self, paths: Vec<PathBuf>, shutdown: broadcast::Receiver<()>) -> BatchReport {
        self.run_with(paths, shutdown, |_| {}).await
    }

    /// Run the batch, calling `on_outcome` as soon as each video settles.
    ///
    /// A message on `shutdown` cancels in-flight and queued videos; their
    /// outcomes are reported as [`FramescribeError::Cancelled`].
    pub async fn run_with<F>(
        &self,
        paths: Vec<PathBuf>,
        mut shutdown: broadcast::Receiver<()>,
        mut on_outcome: F,
    ) -> BatchReport
    where
        F: FnMut(&VideoOutcome),
    {
        let span = info_span!("batch", batch_id = %Uuid::new_v4(), videos = paths.len());
        async move {
            let admission = Arc::new(Semaphore::new(self.video_concurrency));
            let mut tasks = JoinSet::new();
            let mut task_index = HashMap::new();

            for (index, path) in paths.iter().cloned().enumerate() {
                let pipeline = Arc::clone(&self.pipeline);
                let admission = Arc::clone(&admission);
                let handle = tasks.spawn(
                    async move {
                        let result = match admission.acquire_owned().await {
                            Ok(_permit) => pipeline.describe(&path).await,
                            Err(_) => Err(FramescribeError::Cancelled),
                        };
                        (index, VideoOutcome { path, result })
                    }
                    .in_current_span(),
                );
                task_index.insert(handle.id(), index);
            }

            let mut outcomes: Vec<Option<VideoOutcome>> = paths.iter().map(|_| None).collect();
            let mut listening = true;
            let mut stopping = false;

            loop {
                let joined = tokio::select! {
                    biased;
                    signal = shutdown.recv(), if listening => {
                        match signal {
                            Err(broadcast::error::RecvError::Closed) => listening = false,
                            _ => {
                                info!("shutdown requested, cancelling remaining videos");
                                listening = false;
                                stopping = true;
                                admission.close();
                                tasks.abort_all();
                            }
                        }
                        continue;
                    }
                    joined = tasks.join_next_with_id() => joined,
                };
                let Some(joined) = joined else { break };

                let (index, outcome) = match joined {
                    Ok((_, settled)) => settled,
                    Err(error) => {
                        let index = task_index[&error.id()];
                        let result = if error.is_cancelled() {
                            Err(FramescribeError::Cancelled)
                        } else {
                            Err(FramescribeError::Internal {
                                reason: format!("video task panicked: {error}"),
                            })
                        };
                        let path = paths[index].clone();
                        (index, VideoOutcome { path, result })
                    }
                };

                if let Err(error) = &outcome.result {
                    warn!(
                        path = %outcome.path.display(),
                        kind = error.kind(),
                        error = %error,
                        "video failed"
                    );
                    let fatal = !matches!(error, FramescribeError::Cancelled);
                    if fatal && self.policy == FailurePolicy::Abort && !stopping {
                        stopping = true;
                        admission.close();
                        tasks.abort_all();
                    }
                }

                on_outcome(&outcome);
                outcomes[index] = Some(outcome);
            }

            let outcomes: Vec<VideoOutcome> = outcomes
                .into_iter()
                .zip(paths)
                .map(|(outcome, path)| {
                    outcome.unwrap_or(VideoOutcome {
                        path,
                        result: Err(FramescribeError::Cancelled),
                    })
                })
                .collect();

            let report = BatchReport { outcomes };
            info!(
                succeeded = report.succeeded().count(),
                failed = report.failed().count(),
                "batch finished"
            );
            report
        }
        .instrument(span)
        .await
    }
}

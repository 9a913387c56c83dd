//! Local speech-to-text: ffmpeg extracts a 16 kHz mono track, whisper.cpp
//! transcribes it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use framescribe_core::{AudioTranscriber, TranscriptionError};
use tokio::{fs, process::Command, sync::Semaphore};
use tracing::debug;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

pub const MODEL_NAME: &str = "ggml-base.bin";

/// Sample rate whisper models are trained on.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

pub fn model_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("framescribe")
        .join("models")
}

/// Download the default whisper model into `model_dir` unless it is already there.
pub async fn ensure_model(model_dir: &Path) -> anyhow::Result<PathBuf> {
    let download_url = format!(
        "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
        MODEL_NAME
    );

    if !model_dir.exists() {
        fs::create_dir_all(model_dir).await?;
    }

    let model_path = model_dir.join(MODEL_NAME);
    if !model_path.exists() {
        let output = Command::new("curl")
            .arg("-fL")
            .arg(&download_url)
            .arg("-o")
            .arg(&model_path)
            .output()
            .await?;

        if !output.status.success() {
            // curl may leave a partial file behind
            let _ = fs::remove_file(&model_path).await;
            anyhow::bail!(
                "failed to download {download_url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
    }

    Ok(model_path)
}

pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
    // one whisper run at a time, it already uses every core
    runs: Semaphore,
}

impl WhisperTranscriber {
    pub fn new(model_path: &Path) -> anyhow::Result<Self> {
        let model_path_str = model_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("model path {} is not UTF-8", model_path.display()))?;
        let ctx_params = WhisperContextParameters {
            use_gpu: true,
            flash_attn: true,
            ..Default::default()
        };
        let ctx = WhisperContext::new_with_params(model_path_str, ctx_params).map_err(|e| {
            anyhow::anyhow!("failed to load whisper model {}: {e}", model_path.display())
        })?;

        Ok(Self {
            ctx: Arc::new(ctx),
            runs: Semaphore::new(1),
        })
    }
}

#[async_trait]
impl AudioTranscriber for WhisperTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String, TranscriptionError> {
        let wav = tempfile::Builder::new()
            .prefix("framescribe-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| TranscriptionError::new(format!("cannot create temp file: {e}")))?;
        extract_audio(path, wav.path()).await?;

        let _run = self
            .runs
            .acquire()
            .await
            .map_err(|_| TranscriptionError::new("transcriber is shut down"))?;
        let ctx = Arc::clone(&self.ctx);
        let wav_path = wav.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let samples = read_samples(&wav_path)?;
            debug!(
                seconds = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64,
                "audio extracted"
            );
            run_whisper(&ctx, &samples)
        })
        .await
        .map_err(|e| TranscriptionError::new(format!("whisper task did not finish: {e}")))?
    }
}

async fn extract_audio(video_path: &Path, audio_path: &Path) -> Result<(), TranscriptionError> {
    let output = Command::new("ffmpeg")
        .arg("-v")
        .arg("error")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-ar")
        .arg(WHISPER_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg("1")
        .arg("-c:a")
        .arg("pcm_s16le")
        .arg(audio_path)
        .output()
        .await
        .map_err(|e| TranscriptionError::new(format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(TranscriptionError::new(format!(
            "failed to extract audio from video file: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// 16-bit PCM samples scaled into `[-1, 1]`.
fn read_samples(audio_path: &Path) -> Result<Vec<f32>, TranscriptionError> {
    let mut reader = hound::WavReader::open(audio_path)
        .map_err(|e| TranscriptionError::new(format!("unreadable audio track: {e}")))?;
    reader
        .samples::<i16>()
        .map(|s| {
            s.map(|s| s as f32 / i16::MAX as f32)
                .map_err(|e| TranscriptionError::new(format!("corrupt audio sample: {e}")))
        })
        .collect()
}

fn run_whisper(ctx: &WhisperContext, samples: &[f32]) -> Result<String, TranscriptionError> {
    let failed = |e: whisper_rs::WhisperError| TranscriptionError::new(format!("whisper failed: {e}"));

    let mut params = FullParams::new(whisper_rs::SamplingStrategy::Greedy { best_of: 5 });
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx.create_state().map_err(failed)?;
    state.full(params, samples).map_err(failed)?;

    let mut text = String::new();
    for segment in state.as_iter() {
        let Ok(seg_text) = segment.to_str() else {
            continue;
        };
        text.push_str(seg_text);
    }
    Ok(text.trim().to_string())
}

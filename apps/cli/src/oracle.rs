//! Vision model captioning over OpenAI-compatible chat completions.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use framescribe_core::{Caption, CaptionOracle, Frame, OracleError};
use serde::Deserialize;
use tracing::debug;

use crate::provider::Provider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = r#"You caption single video frames.

Describe what is visible in ONE short sentence: the main subjects, what they are doing, and the setting.
Do not speculate about anything outside the frame.

OUTPUT: Return ONLY valid JSON:
{"caption": "<one sentence>", "confidence": <number between 0 and 1>}"#;

#[derive(Debug, Deserialize)]
struct CaptionPayload {
    caption: String,
    confidence: f64,
}

pub struct HttpCaptionOracle {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
}

impl HttpCaptionOracle {
    pub fn new(provider: Provider, model: Option<String>, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            model: model.unwrap_or_else(|| provider.config().model.to_string()),
            provider,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CaptionOracle for HttpCaptionOracle {
    async fn caption(&self, frame: &Frame) -> Result<Caption, OracleError> {
        let config = self.provider.config();
        let data_url = format!(
            "data:{};base64,{}",
            frame.mime_type(),
            STANDARD.encode(&frame.data)
        );

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": SYSTEM_PROMPT,
                    },
                    {
                        "role": "user",
                        "content": [
                            {"type": "text", "text": "Caption this frame."},
                            {"type": "image_url", "image_url": {"url": data_url}},
                        ],
                    },
                ],
                "temperature": 0.2,
            }))
            .send()
            .await
            .map_err(|e| OracleError::new(format!("{} request failed: {e}", self.provider.name())))?;

        let status = response.status();
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| OracleError::new(format!("unreadable {} response: {e}", self.provider.name())))?;
        if !status.is_success() {
            return Err(OracleError::new(format!(
                "{} returned {status}: {}",
                self.provider.name(),
                body["error"]["message"].as_str().unwrap_or("no error message")
            )));
        }

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| OracleError::new(format!("Invalid API response structure: {body}")))?;
        debug!(timestamp = frame.timestamp, "oracle answered");

        parse_caption(content)
    }
}

/// Parse the model's JSON answer, tolerating a markdown code fence around it.
fn parse_caption(content: &str) -> Result<Caption, OracleError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let payload: CaptionPayload = serde_json::from_str(json)
        .map_err(|e| OracleError::new(format!("caption is not the expected JSON ({e}): {trimmed}")))?;

    Ok(Caption {
        text: payload.caption,
        confidence: payload.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let caption = parse_caption(r#"{"caption": "a dog running", "confidence": 0.9}"#).unwrap();
        assert_eq!(caption.text, "a dog running");
        assert_eq!(caption.confidence, 0.9);
    }

    #[test]
    fn strips_code_fences() {
        let content = "```json\n{\"caption\": \"a red car on a road\", \"confidence\": 0.75}\n```";
        let caption = parse_caption(content).unwrap();
        assert_eq!(caption.text, "a red car on a road");
        assert_eq!(caption.confidence, 0.75);
    }

    #[test]
    fn rejects_free_text() {
        let err = parse_caption("A dog running in a park.").unwrap_err();
        assert!(err.reason.starts_with("caption is not the expected JSON"));
    }

    #[test]
    fn out_of_range_confidence_is_left_to_the_adapter() {
        let caption = parse_caption(r#"{"caption": "a dog", "confidence": 1.5}"#).unwrap();
        assert_eq!(caption.confidence, 1.5);
    }

    #[test]
    fn explicit_model_overrides_default() {
        let oracle =
            HttpCaptionOracle::new(Provider::Openai, Some("gpt-4o".to_string()), "k".to_string())
                .unwrap();
        assert_eq!(oracle.model(), "gpt-4o");

        let oracle = HttpCaptionOracle::new(Provider::Gemini, None, "k".to_string()).unwrap();
        assert_eq!(oracle.model(), Provider::Gemini.config().model);
    }
}

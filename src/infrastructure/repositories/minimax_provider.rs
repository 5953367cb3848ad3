use super::speech_provider::{ProviderError, SpeechProvider};
use crate::domain::speech::{minimax_voice_for, LanguageTag};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const MINIMAX_API_URL: &str = "https://api.minimax.chat/v1/t2a_v2";

/// Minimax aborts are cut off at 15 seconds
const MINIMAX_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimax implementation of the speech provider. The language subset it
/// supports is enforced upstream by the synthesis service.
pub struct MinimaxProvider {
    api_key: String,
    group_id: String,
    http_client: reqwest::Client,
}

impl MinimaxProvider {
    pub fn new(api_key: String, group_id: String) -> Self {
        Self {
            api_key,
            group_id,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechProvider for MinimaxProvider {
    async fn synthesize(
        &self,
        text: &str,
        language: LanguageTag,
        female: bool,
        speed: f32,
    ) -> Result<Vec<u8>, ProviderError> {
        let voice_id = minimax_voice_for(language, female);

        let request_body = json!({
            "model": "speech-01-turbo",
            "text": text,
            "timber_weights": [
                {
                    "voice_id": voice_id,
                    "weight": 100
                }
            ],
            "voice_setting": {
                "voice_id": "",
                "speed": speed,
                "pitch": 0,
                "vol": 1,
                "latex_read": false
            },
            "audio_setting": {
                "sample_rate": 32000,
                "bitrate": 128000,
                "format": "mp3"
            },
            "language_boost": "auto"
        });

        let url = format!("{}?GroupId={}", MINIMAX_API_URL, self.group_id);

        tracing::debug!(
            language = %language,
            voice_id = voice_id,
            text_length = text.len(),
            "Calling Minimax t2a_v2"
        );

        let start_time = std::time::Instant::now();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .timeout(MINIMAX_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Unavailable(format!("Minimax request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "Minimax returned HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::InvalidResponse(format!("Failed to read Minimax response: {}", e))
            }
        })?;

        let audio = parse_minimax_response(&body)?;

        tracing::info!(
            provider = "minimax",
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            audio_size_bytes = audio.len(),
            "TTS synthesis completed"
        );

        Ok(audio)
    }
}

#[derive(Debug, Deserialize)]
struct MinimaxResponse {
    base_resp: Option<BaseResp>,
    data: Option<MinimaxData>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    status_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MinimaxData {
    audio: Option<String>,
}

/// The audio payload arrives hex-encoded inside a JSON envelope.
fn parse_minimax_response(body: &str) -> Result<Vec<u8>, ProviderError> {
    let response: MinimaxResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("Invalid JSON: {}", e)))?;

    let status_ok = response
        .base_resp
        .as_ref()
        .map(|r| r.status_code == 0)
        .unwrap_or(false);

    if !status_ok {
        let msg = response
            .base_resp
            .and_then(|r| r.status_msg)
            .unwrap_or_else(|| "speech generation failed".to_string());
        return Err(ProviderError::InvalidResponse(msg));
    }

    let audio_hex = response
        .data
        .and_then(|d| d.audio)
        .ok_or_else(|| ProviderError::InvalidResponse("missing audio data".to_string()))?;

    hex::decode(audio_hex)
        .map_err(|e| ProviderError::InvalidResponse(format!("invalid audio encoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_hex_audio_payload() {
        let body = serde_json::json!({
            "base_resp": { "status_code": 0, "status_msg": "success" },
            "data": { "audio": hex::encode([0xffu8, 0xf3, 0x40, 0x00]) }
        })
        .to_string();

        let audio = parse_minimax_response(&body).unwrap();
        assert_eq!(audio, vec![0xff, 0xf3, 0x40, 0x00]);
    }

    #[test]
    fn rejects_vendor_error_status() {
        let body = serde_json::json!({
            "base_resp": { "status_code": 1004, "status_msg": "insufficient balance" },
            "data": null
        })
        .to_string();

        let err = parse_minimax_response(&body).unwrap_err();
        match err {
            ProviderError::InvalidResponse(msg) => assert_eq!(msg, "insufficient balance"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_audio() {
        let body = serde_json::json!({
            "base_resp": { "status_code": 0 },
            "data": {}
        })
        .to_string();

        assert!(matches!(
            parse_minimax_response(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn rejects_non_hex_audio() {
        let body = serde_json::json!({
            "base_resp": { "status_code": 0 },
            "data": { "audio": "not hex!" }
        })
        .to_string();

        assert!(matches!(
            parse_minimax_response(&body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(matches!(
            parse_minimax_response("<html>gateway error</html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}

use super::speech_provider::{ProviderError, SpeechProvider};
use crate::domain::speech::{polly_voice_for, LanguageTag};
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, LanguageCode, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;
use std::time::Duration;

/// AWS Polly has a limit of 3000 characters per request
const MAX_BATCH_SIZE: usize = 3000;

/// Per-batch call timeout
const POLLY_TIMEOUT: Duration = Duration::from_secs(10);

/// AWS Polly implementation of the speech provider
pub struct PollyProvider {
    polly_client: Arc<PollyClient>,
}

impl PollyProvider {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    /// Split text into batches that respect sentence boundaries.
    /// Each batch is at most MAX_BATCH_SIZE characters.
    fn split_into_batches(text: &str) -> Vec<String> {
        if text.len() <= MAX_BATCH_SIZE {
            return vec![text.to_string()];
        }

        let mut batches = Vec::new();
        let mut current_batch = String::new();

        // Split on sentence-ending punctuation
        let sentence_pattern = regex::Regex::new(r"([.!?]+\s+)").unwrap();
        let mut last_end = 0;

        for mat in sentence_pattern.find_iter(text) {
            let sentence = &text[last_end..mat.end()];

            // If adding this sentence would exceed the limit, save current batch
            if !current_batch.is_empty() && current_batch.len() + sentence.len() > MAX_BATCH_SIZE {
                batches.push(current_batch.trim().to_string());
                current_batch = String::new();
            }

            current_batch.push_str(sentence);
            last_end = mat.end();
        }

        // Handle remaining text after last sentence boundary
        if last_end < text.len() {
            let remaining = &text[last_end..];

            if !current_batch.is_empty() && current_batch.len() + remaining.len() > MAX_BATCH_SIZE {
                batches.push(current_batch.trim().to_string());
                current_batch = String::new();
            }

            // If remaining text itself is too large, split it by characters
            if remaining.len() > MAX_BATCH_SIZE {
                let chars: Vec<char> = remaining.chars().collect();
                for chunk in chars.chunks(MAX_BATCH_SIZE) {
                    batches.push(chunk.iter().collect());
                }
            } else {
                current_batch.push_str(remaining);
            }
        }

        // Add any remaining batch
        if !current_batch.is_empty() {
            batches.push(current_batch.trim().to_string());
        }

        batches
    }

    /// Call AWS Polly to synthesize a single text batch
    async fn call_polly(
        &self,
        text: &str,
        language: LanguageTag,
        female: bool,
    ) -> Result<Vec<u8>, ProviderError> {
        let voice_name = polly_voice_for(language, female);
        let voice_id = VoiceId::from(voice_name);

        tracing::debug!(
            language = %language,
            voice = voice_name,
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let request = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .language_code(LanguageCode::from(language.polly_code()))
            .output_format(OutputFormat::Mp3)
            .sample_rate("24000")
            .engine(Engine::Standard)
            .send();

        let result = tokio::time::timeout(POLLY_TIMEOUT, request)
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    language = %language,
                    voice = voice_name,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                ProviderError::Unavailable(format!("AWS Polly error: {}", e))
            })?;

        // Collect the audio stream
        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            ProviderError::InvalidResponse(format!("Failed to read audio stream: {}", e))
        })?;

        Ok(audio_stream.into_bytes().to_vec())
    }

    /// Synthesize multiple text batches and merge the audio results in order
    async fn synthesize_batches(
        &self,
        batches: &[String],
        language: LanguageTag,
        female: bool,
    ) -> Result<Vec<u8>, ProviderError> {
        let mut merged_audio = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(
                batch_index = index,
                batch_size = batch.len(),
                "Synthesizing batch"
            );

            let audio_data = self.call_polly(batch, language, female).await?;
            merged_audio.extend(audio_data);
        }

        Ok(merged_audio)
    }
}

#[async_trait]
impl SpeechProvider for PollyProvider {
    async fn synthesize(
        &self,
        text: &str,
        language: LanguageTag,
        female: bool,
        _speed: f32,
    ) -> Result<Vec<u8>, ProviderError> {
        let start_time = std::time::Instant::now();

        // Split text into batches based on Polly's limitations
        let batches = Self::split_into_batches(text);

        let audio_data = self.synthesize_batches(&batches, language, female).await?;

        let duration = start_time.elapsed();
        tracing::info!(
            provider = "polly",
            latency_ms = duration.as_millis(),
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = audio_data.len(),
            "TTS synthesis completed"
        );

        Ok(audio_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_small_text_is_single_batch() {
        let text = "This is a short text.";
        let batches = PollyProvider::split_into_batches(text);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], text);
    }

    #[test]
    fn split_respects_max_size() {
        let sentence = "This is a sentence. ";
        let text = sentence.repeat(200); // Will be > 3000 chars
        let batches = PollyProvider::split_into_batches(&text);

        assert!(
            batches.len() > 1,
            "Text should be split into multiple batches"
        );

        for batch in &batches {
            assert!(
                batch.len() <= MAX_BATCH_SIZE,
                "Batch size {} exceeds MAX_BATCH_SIZE {}",
                batch.len(),
                MAX_BATCH_SIZE
            );
        }
    }

    #[test]
    fn split_without_punctuation_falls_back_to_characters() {
        let text = "a".repeat(MAX_BATCH_SIZE + 500);
        let batches = PollyProvider::split_into_batches(&text);

        assert!(
            batches.len() >= 2,
            "Should split text without punctuation, got {} batches",
            batches.len()
        );
        for (i, batch) in batches.iter().enumerate() {
            assert!(
                batch.len() <= MAX_BATCH_SIZE,
                "Batch {} has length {}",
                i,
                batch.len()
            );
        }
    }

    #[test]
    fn split_preserves_content() {
        let sentence = "This is sentence number X. ";
        let text = sentence.repeat(200);
        let batches = PollyProvider::split_into_batches(&text);

        let reconstructed = batches.join(" ");
        let original_words: Vec<&str> = text.split_whitespace().collect();
        let reconstructed_words: Vec<&str> = reconstructed.split_whitespace().collect();

        assert_eq!(original_words.len(), reconstructed_words.len());
    }

    #[test]
    fn split_edge_case_exactly_max_size() {
        let text = "a".repeat(MAX_BATCH_SIZE);
        let batches = PollyProvider::split_into_batches(&text);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), MAX_BATCH_SIZE);
    }

    #[test]
    fn split_edge_case_one_over_max_size() {
        let text = "a".repeat(MAX_BATCH_SIZE + 1);
        let batches = PollyProvider::split_into_batches(&text);
        assert!(batches.len() >= 2);
    }
}

use crate::config::Config;
use anyhow::{Context, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use std::path::Path;

/// Remote speech-to-text over an OpenAI-compatible transcription endpoint.
///
/// This is the half of speech recognition that is delegated wholesale: we
/// hand over a finished WAV file and get back the text of the utterance.
pub struct SpeechToText {
    client: Client<OpenAIConfig>,
    model: String,
    prompt: String,
    language: String,
}

impl SpeechToText {
    pub fn from_config(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(config.stt_url.clone())
            .with_api_key(config.stt_api_key.clone());

        Self {
            client: Client::with_config(openai_config),
            model: config.stt_model.clone(),
            prompt: config.whisper_prompt.clone().unwrap_or_default(),
            language: config.language.clone().unwrap_or_default(),
        }
    }

    /// Transcribe one recorded utterance.
    ///
    /// Returns the trimmed transcription text. Silence comes back as an
    /// empty string, not an error; the recognizer turns that into the
    /// no-speech error code.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        tracing::debug!("Transcribing utterance: {:?}", audio_path);

        let request = CreateTranscriptionRequestArgs::default()
            .file(audio_path.to_str().context("Invalid path")?)
            .model(&self.model)
            .prompt(&self.prompt)
            .language(&self.language)
            .response_format(AudioResponseFormat::Json)
            .build()
            .context("Failed to build transcription request")?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .context("Transcription API call failed")?;

        tracing::debug!("Transcription complete: {} chars", response.text.len());
        Ok(response.text.trim().to_string())
    }
}

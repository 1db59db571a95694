pub mod capture;
pub mod format;
pub mod stt;

pub use format::AudioFormat;
pub use stt::SpeechToText;

use crate::messages::{CaptureEvent, RecognizerCommand};
use anyhow::{Context, Result};
use capture::UtteranceCapture;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

/// One capture session in progress: the live microphone capture, the WAV
/// file its samples are encoded into, and the session's chunk channel.
struct ActiveSession {
    capture: UtteranceCapture,
    writer: WavWriter<BufWriter<File>>,
    temp_file: NamedTempFile,
    chunk_rx: mpsc::Receiver<Vec<f32>>,
}

/// The speech recognizer service: the capture session of the conversation.
///
/// Driven by Start/Stop commands and reporting back through tagged
/// `CaptureEvent`s: `Started` once the microphone is live, then exactly one
/// `Utterance` or `Error` per session after Stop. An utterance is produced
/// by recording to a temp WAV file and transcribing it remotely once the
/// session ends, so a session never yields more than one result.
///
/// Note: this service holds `cpal::Stream`, which is not `Send`, so it must
/// be spawned on a LocalSet via `tokio::task::spawn_local`.
pub struct Recognizer {
    audio_format: AudioFormat,
    cmd_rx: mpsc::Receiver<RecognizerCommand>,
    event_tx: mpsc::Sender<CaptureEvent>,
    stt: SpeechToText,
    session: Option<ActiveSession>,
}

impl Recognizer {
    /// Spawn the recognizer service and return a handle to drive it.
    pub fn spawn(stt: SpeechToText, event_tx: mpsc::Sender<CaptureEvent>) -> RecognizerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(10);

        let recognizer = Self {
            audio_format: AudioFormat::default(),
            cmd_rx,
            event_tx,
            stt,
            session: None,
        };

        tokio::task::spawn_local(recognizer.run());
        RecognizerHandle { tx: cmd_tx }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(RecognizerCommand::Start) => self.start_session().await,
                        Some(RecognizerCommand::Stop) => self.finish_session().await,
                        None => break,
                    }
                }

                Some(chunk) = next_chunk(&mut self.session) => {
                    if let Some(session) = self.session.as_mut() {
                        write_samples(&mut session.writer, &chunk);
                    }
                }
            }
        }
    }

    async fn start_session(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Start while a capture session is already active, ignoring");
            return;
        }

        match self.open_session() {
            Ok(session) => {
                self.session = Some(session);
                self.emit(CaptureEvent::Started).await;
            }
            Err(e) => {
                tracing::error!("Failed to start capture session: {:#}", e);
                self.emit(CaptureEvent::Error(format!("{e:#}"))).await;
            }
        }
    }

    fn open_session(&self) -> Result<ActiveSession> {
        let temp_file = tempfile::Builder::new()
            .prefix("voxchat-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temp file")?;

        let spec = WavSpec {
            channels: self.audio_format.channels,
            sample_rate: self.audio_format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(temp_file.path(), spec)
            .map_err(|e| anyhow::anyhow!("Failed to create WAV writer: {}", e))?;

        let (chunk_tx, chunk_rx) = mpsc::channel(100);
        let capture = UtteranceCapture::begin(self.audio_format, chunk_tx)?;

        Ok(ActiveSession {
            capture,
            writer,
            temp_file,
            chunk_rx,
        })
    }

    async fn finish_session(&mut self) {
        let Some(session) = self.session.take() else {
            tracing::debug!("Stop with no active capture session, ignoring");
            return;
        };

        let ActiveSession {
            capture,
            mut writer,
            temp_file,
            mut chunk_rx,
        } = session;

        // Tear the stream down and let the bridge flush the ring tail. The
        // channel closes once the bridge has sent everything and exited, so
        // draining to None cannot miss the end of the utterance.
        let bridge = capture.stop();
        while let Some(chunk) = chunk_rx.recv().await {
            write_samples(&mut writer, &chunk);
        }
        if let Err(e) = bridge.await {
            tracing::warn!("Capture bridge task failed: {}", e);
        }

        if let Err(e) = writer.finalize() {
            tracing::error!("Failed to finalize WAV: {}", e);
            self.emit(CaptureEvent::Error(format!("Failed to finalize WAV: {e}")))
                .await;
            return;
        }

        tracing::info!("Capture session ended, transcribing");

        match self.stt.transcribe(temp_file.path()).await {
            Ok(text) => {
                if text.is_empty() {
                    // The remote recognizer heard nothing usable.
                    self.emit(CaptureEvent::Error("no-speech".to_string())).await;
                } else {
                    self.emit(CaptureEvent::Utterance(text)).await;
                }
            }
            Err(e) => {
                tracing::error!("Transcription failed: {:#}", e);
                self.emit(CaptureEvent::Error(format!("{e:#}"))).await;
            }
        }
    }

    async fn emit(&self, event: CaptureEvent) {
        if self.event_tx.send(event).await.is_err() {
            tracing::warn!("Capture event dropped: controller is gone");
        }
    }
}

/// Wait for the active session's next sample chunk; pends forever when no
/// session is live so the select loop only wakes for commands.
async fn next_chunk(session: &mut Option<ActiveSession>) -> Option<Vec<f32>> {
    match session {
        Some(session) => session.chunk_rx.recv().await,
        None => std::future::pending().await,
    }
}

fn write_samples(writer: &mut WavWriter<BufWriter<File>>, samples: &[f32]) {
    for sample in samples {
        // Convert f32 (-1.0 to 1.0) to i16
        let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        if let Err(e) = writer.write_sample(amplitude) {
            tracing::error!("Failed to write sample: {}", e);
            break;
        }
    }
}

/// Handle for driving the recognizer service
#[derive(Clone)]
pub struct RecognizerHandle {
    tx: mpsc::Sender<RecognizerCommand>,
}

impl RecognizerHandle {
    /// Begin a capture session.
    pub async fn start(&self) -> Result<()> {
        self.tx
            .send(RecognizerCommand::Start)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send start command: {}", e))
    }

    /// End the capture session; the result arrives as a capture event.
    pub async fn stop(&self) -> Result<()> {
        self.tx
            .send(RecognizerCommand::Stop)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send stop command: {}", e))
    }
}

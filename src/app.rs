use crate::chat::{ChatService, HttpChatClient};
use crate::config::Config;
use crate::messages::{CaptureEvent, ChatOutcome, SessionState};
use crate::recognizer::{Recognizer, RecognizerHandle, SpeechToText};
use crate::shortcuts;
use crate::transcript::{self, Speaker, Transcript};

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The conversation session controller
///
/// Owns all mutable session state: the state machine, the transcript, and
/// the bookkeeping for in-flight chat requests. It consumes tagged capture
/// events and settled chat outcomes; it never touches the network or the
/// microphone itself.
pub struct Controller<C: ChatService> {
    state: SessionState,
    transcript: Transcript,
    chat: Arc<C>,
    outcome_tx: mpsc::Sender<ChatOutcome>,
    next_generation: u64,
    in_flight: usize,
}

impl<C: ChatService> Controller<C> {
    pub fn new(chat: Arc<C>, outcome_tx: mpsc::Sender<ChatOutcome>) -> Self {
        Self {
            state: SessionState::Idle,
            transcript: Transcript::new(),
            chat,
            outcome_tx,
            next_generation: 0,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!("Session state: {:?} -> {:?}", self.state, next);
            self.state = next;
            transcript::show_status(&self.state);
        }
    }

    /// End capture, user initiated. The recognizer has been told to stop;
    /// the utterance or error event that follows decides what happens next.
    pub fn capture_stopping(&mut self) {
        self.set_state(SessionState::Processing);
    }

    pub fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Started => {
                tracing::info!("Capture session started");
                self.set_state(SessionState::Recording);
            }
            CaptureEvent::Utterance(text) => {
                self.transcript.push(Speaker::User, text.clone());
                self.submit(text);
            }
            CaptureEvent::Error(code) => {
                self.transcript
                    .push(Speaker::Error, format!("Recognition error: {}", code));
                let next = if self.in_flight > 0 {
                    SessionState::Processing
                } else {
                    SessionState::Idle
                };
                self.set_state(next);
            }
        }
    }

    /// Forward one utterance to the chat service.
    ///
    /// The request runs in its own task and its settled result comes back
    /// to the event loop as a `ChatOutcome` tagged with this generation, so
    /// overlapping requests stay distinguishable.
    fn submit(&mut self, message: String) {
        if message.is_empty() {
            tracing::debug!("Empty utterance, nothing to submit");
            if self.in_flight == 0 {
                self.set_state(SessionState::Idle);
            }
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight += 1;

        self.set_state(SessionState::Processing);
        self.transcript.show_pending();

        tracing::info!("Submitting utterance (request #{})", generation);

        let chat = Arc::clone(&self.chat);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = chat.send(&message).await.map_err(|e| format!("{e:#}"));
            if outcome_tx
                .send(ChatOutcome { generation, result })
                .await
                .is_err()
            {
                tracing::warn!("Chat outcome dropped: controller is gone");
            }
        });
    }

    pub fn handle_chat_outcome(&mut self, outcome: ChatOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome.result {
            Ok(reply) => self.transcript.push(Speaker::Assistant, reply),
            Err(message) => self.transcript.push(Speaker::Error, message),
        }

        tracing::debug!(
            "Request #{} settled, {} still in flight",
            outcome.generation,
            self.in_flight
        );

        // A late outcome from a superseded request renders its entry above,
        // but it must not yank a newer capture session out of Recording.
        if self.in_flight == 0 && self.state == SessionState::Processing {
            self.set_state(SessionState::Idle);
        }
    }
}

/// Event-loop wiring around the controller: the global shortcut, the
/// recognizer service, and the chat outcome channel.
pub struct App {
    config: Config,
    controller: Controller<HttpChatClient>,
    recognizer: Option<RecognizerHandle>,
    event_tx: mpsc::Sender<CaptureEvent>,
    event_rx: mpsc::Receiver<CaptureEvent>,
    outcome_rx: mpsc::Receiver<ChatOutcome>,
    shortcut_rx: mpsc::Receiver<()>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let (event_tx, event_rx) = mpsc::channel(10);
        let (outcome_tx, outcome_rx) = mpsc::channel(10);

        let chat = Arc::new(HttpChatClient::new(&config.chat_url));
        let controller = Controller::new(chat, outcome_tx);

        let (shortcut_tx, shortcut_rx) = mpsc::channel(10);
        tokio::spawn(async move {
            if let Err(e) = shortcuts::monitor_shortcut(shortcut_tx).await {
                tracing::error!("Shortcut monitoring failed: {:#}", e);
            }
        });

        transcript::show_status(&SessionState::Idle);

        Self {
            config,
            controller,
            recognizer: None,
            event_tx,
            event_rx,
            outcome_rx,
            shortcut_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                Some(_) = self.shortcut_rx.recv() => {
                    if let Err(e) = self.handle_toggle().await {
                        tracing::error!("Error handling toggle: {:#}", e);
                    }
                }

                Some(event) = self.event_rx.recv() => {
                    self.controller.handle_capture_event(event);
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    self.controller.handle_chat_outcome(outcome);
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_toggle(&mut self) -> Result<()> {
        let state = self.controller.state().clone();
        tracing::debug!("Toggle: current state = {:?}", state);

        match state {
            SessionState::Recording => {
                if let Some(recognizer) = &self.recognizer {
                    recognizer.stop().await?;
                }
                self.controller.capture_stopping();
            }
            _ => {
                // Beginning capture while a previous reply is still in
                // flight is allowed; the old request keeps running and its
                // result still renders when it settles.
                let recognizer = self.ensure_recognizer();
                recognizer.start().await?;
            }
        }

        Ok(())
    }

    /// The recognizer is created on first use and reused for the rest of
    /// the process lifetime.
    fn ensure_recognizer(&mut self) -> RecognizerHandle {
        if let Some(handle) = &self.recognizer {
            return handle.clone();
        }

        tracing::debug!("Creating speech recognizer");

        let stt = SpeechToText::from_config(&self.config);
        let handle = Recognizer::spawn(stt, self.event_tx.clone());
        self.recognizer = Some(handle.clone());
        handle
    }
}

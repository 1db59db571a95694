/// Commands for the speech recognizer service
pub enum RecognizerCommand {
    Start,
    Stop,
}

/// Conversation session state
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Idle,
    Recording,
    Processing,
}

/// Events emitted by a capture session
///
/// A session emits `Started` once capture is live, then exactly one of
/// `Utterance` or `Error` after it is stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureEvent {
    Started,
    Utterance(String),
    Error(String),
}

/// The settled result of one chat round trip, tagged with the request
/// generation that issued it so late arrivals can be told apart from the
/// current session's work.
#[derive(Debug)]
pub struct ChatOutcome {
    pub generation: u64,
    pub result: Result<String, String>,
}

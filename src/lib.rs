pub mod app;
pub mod chat;
pub mod config;
pub mod messages;
pub mod recognizer;
pub mod shortcuts;
pub mod transcript;

pub use app::{App, Controller};
pub use chat::{ChatService, HttpChatClient};
pub use config::Config;
pub use messages::{CaptureEvent, ChatOutcome, SessionState};
pub use transcript::{Entry, Speaker, Transcript};

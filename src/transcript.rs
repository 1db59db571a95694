use crate::messages::SessionState;

/// Who a transcript entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    Error,
}

/// One line of the conversation log
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub speaker: Speaker,
    pub text: String,
}

/// The visible conversation log
///
/// Entries are append-only and ordered by arrival. Each entry is rendered to
/// the terminal as it is pushed.
#[derive(Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        let entry = Entry {
            speaker,
            text: text.into(),
        };
        render(&entry);
        self.entries.push(entry);
    }

    /// Print a transient waiting marker while a reply is pending.
    ///
    /// The marker is not recorded as an entry; it only gives the user
    /// something to look at between their utterance and the reply.
    pub fn show_pending(&self) {
        println!("          ...");
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

fn render(entry: &Entry) {
    match entry.speaker {
        Speaker::User => println!("you       > {}", entry.text),
        Speaker::Assistant => println!("assistant > {}", entry.text),
        Speaker::Error => println!("error     > {}", entry.text),
    }
}

/// Status line text for each session state
pub fn status_label(state: &SessionState) -> &'static str {
    match state {
        SessionState::Idle => "Ready",
        SessionState::Recording => "Listening...",
        SessionState::Processing => "Processing...",
    }
}

/// Print the status line.
pub fn show_status(state: &SessionState) {
    println!("[{}]", status_label(state));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.push(Speaker::User, "hello");
        transcript.push(Speaker::Assistant, "hi");
        transcript.push(Speaker::Error, "oops");

        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[0].text, "hello");
        assert_eq!(entries[1].speaker, Speaker::Assistant);
        assert_eq!(entries[2].speaker, Speaker::Error);
    }

    #[test]
    fn status_labels_match_states() {
        assert_eq!(status_label(&SessionState::Idle), "Ready");
        assert_eq!(status_label(&SessionState::Recording), "Listening...");
        assert_eq!(status_label(&SessionState::Processing), "Processing...");
    }
}

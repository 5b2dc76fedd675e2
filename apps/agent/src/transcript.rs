use serde::{Deserialize, Serialize};

use crate::channel::ChannelMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
    Assistant,
}

/// One finalized utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Append-only log of finalized utterances, in the order the channel emitted
/// them. Interim fragments never enter the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the message if it is a finalized transcript with a speaker and
    /// text. Returns the appended entry.
    pub fn record(&mut self, message: &ChannelMessage) -> Option<&TranscriptEntry> {
        if !message.is_final_transcript() {
            return None;
        }
        let (Some(role), Some(content)) = (message.role, message.transcript.as_ref()) else {
            return None;
        };
        self.entries.push(TranscriptEntry {
            role,
            content: content.clone(),
        });
        self.entries.last()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Drives the "last message" display.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

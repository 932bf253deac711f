//! crates/pdf_chat_core/src/transcript.rs
//!
//! The visible conversation held by a chat client and the per-turn buffer
//! that grows a single assistant message as streamed text arrives.

use std::fmt;
use uuid::Uuid;

use crate::domain::Message;

const GREETING_WITH_DOCUMENT: &str = "I've loaded your PDF document. I'm ready to answer any questions you have about it. What would you like to know?";
const GREETING_WITHOUT_DOCUMENT: &str = "Upload a PDF to start analyzing it with AI.";

/// Render key for a transcript entry. Never sent to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub id: EntryId,
    pub message: Message,
}

/// Ordered, append-only list of entries (oldest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh transcript opened by the assistant's greeting.
    pub fn with_greeting(has_document: bool) -> Self {
        let greeting = if has_document {
            GREETING_WITH_DOCUMENT
        } else {
            GREETING_WITHOUT_DOCUMENT
        };
        let mut transcript = Self::new();
        transcript.entries.push(ChatEntry {
            id: EntryId::from("welcome"),
            message: Message::assistant(greeting),
        });
        transcript
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn get(&self, id: &EntryId) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Appends a message under a newly generated id.
    pub fn push(&mut self, message: Message) -> EntryId {
        let id = EntryId::generate();
        self.entries.push(ChatEntry {
            id: id.clone(),
            message,
        });
        id
    }

    /// Replaces the entry with `id` in place, or appends it if absent.
    pub fn upsert(&mut self, id: &EntryId, message: Message) {
        match self.entries.iter_mut().find(|e| &e.id == id) {
            Some(entry) => entry.message = message,
            None => self.entries.push(ChatEntry {
                id: id.clone(),
                message,
            }),
        }
    }

    /// The `{role, content}` pairs sent to the relay.
    pub fn to_wire(&self) -> Vec<Message> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }
}

/// Running buffer for one streamed assistant reply.
#[derive(Debug)]
pub struct StreamAccumulator {
    id: EntryId,
    buffer: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self {
            id: EntryId::generate(),
            buffer: String::new(),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Appends `chunk`, re-renders the turn's assistant entry and returns the
    /// reply so far.
    pub fn apply(&mut self, chunk: &str, transcript: &mut Transcript) -> &str {
        self.buffer.push_str(chunk);
        transcript.upsert(&self.id, Message::assistant(self.buffer.clone()));
        &self.buffer
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

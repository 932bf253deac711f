//! crates/chat_client/src/printer.rs
//!
//! A transcript observer for line-oriented output: writes each assistant
//! reply incrementally, emitting only the text added since the last change.

use pdf_chat_core::domain::Role;
use pdf_chat_core::transcript::{EntryId, Transcript};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::warn;

use crate::client::TranscriptObserver;

struct PrinterState<W> {
    out: W,
    printed: Option<(EntryId, usize)>,
}

pub struct DeltaPrinter<W> {
    state: Mutex<PrinterState<W>>,
}

impl<W: Write + Send> DeltaPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(PrinterState { out, printed: None }),
        }
    }

    /// Hands back the writer, e.g. to inspect what was printed.
    pub fn into_inner(self) -> Option<W> {
        self.state.into_inner().ok().map(|state| state.out)
    }
}

impl<W> PrinterState<W>
where
    W: Write,
{
    fn print_delta(&mut self, transcript: &Transcript) -> io::Result<()> {
        let Some(entry) = transcript.last() else {
            return Ok(());
        };
        if entry.message.role != Role::Assistant {
            return Ok(());
        }

        let already = match self.printed.as_ref() {
            Some((id, len)) if id == &entry.id => *len,
            Some(_) => {
                writeln!(self.out)?;
                0
            }
            None => 0,
        };
        let content = &entry.message.content;
        self.printed = Some((entry.id.clone(), content.len()));
        self.out.write_all(content[already..].as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> TranscriptObserver for DeltaPrinter<W> {
    fn transcript_changed(&self, transcript: &Transcript) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if let Err(e) = state.print_delta(transcript) {
            warn!("Failed to write reply to the terminal: {}", e);
        }
    }
}

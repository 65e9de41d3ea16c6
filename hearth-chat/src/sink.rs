//! Where replies go once a turn completes.

use std::io::{self, Write};

use hearth_llm::StructuredReply;

/// Receives each completed reply.
///
/// The text sink only prints the utterance; other sinks (a speech engine, an
/// avatar driver) may also use the emotion and actions.
pub trait ReplySink {
    /// Deliver one reply.
    ///
    /// # Errors
    ///
    /// Any I/O failure of the underlying output.
    fn deliver(&mut self, speaker: &str, reply: &StructuredReply) -> io::Result<()>;
}

/// Writes `<speaker>: <utterance>` lines.
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    /// Sink over `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextSink<io::Stdout> {
    /// Sink over standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ReplySink for TextSink<W> {
    fn deliver(&mut self, speaker: &str, reply: &StructuredReply) -> io::Result<()> {
        writeln!(self.out, "{speaker}: {}", reply.utterance)?;
        self.out.flush()
    }
}

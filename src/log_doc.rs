//! The in-memory log document.
//!
//! Tracing output is teed into a pipe-fed document so the user can open
//! the pager's own log like any other input. The sink never blocks the
//! subscriber: when the pipe is full the line is dropped.

use tracing_subscriber::fmt::MakeWriter;

use crate::config::Config;
use crate::document::{Document, DocumentType};
use crate::search::{pipe, PipeWriter};

/// A `tracing` writer feeding the log document.
#[derive(Clone)]
pub struct LogSink {
    writer: PipeWriter,
}

impl std::io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Best effort: losing a log line beats stalling the subscriber.
        self.writer.try_write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Create the log document and the sink that feeds it.
pub fn log_document(config: &Config) -> (Document, LogSink) {
    let (reader, writer) = pipe();
    let mut doc = Document::from_read(Box::new(reader), "(Log)", config, None);
    doc.doc_type = DocumentType::Log;
    (doc, LogSink { writer })
}

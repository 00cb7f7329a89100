//! Console sink: musical events to stdout, diagnostics to stderr.
//!
//! Each event is one line of space-separated atoms, the same shape a patch
//! would see on the message outlet, so the output can be piped elsewhere.

use jam_core::{format_atoms, Diagnostic, EventSink, MusicalEvent, NoteFormat};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

type Writer = Mutex<Box<dyn Write + Send>>;

pub struct ConsoleSink {
    format: NoteFormat,
    out: Writer,
    err: Writer,
}

impl ConsoleSink {
    pub fn new(format: NoteFormat, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    pub fn stdio(format: NoteFormat) -> Self {
        Self::new(format, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    fn write_line(writer: &Writer, line: &str) {
        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            log::debug!("Dropping output line: {}", e);
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: MusicalEvent) {
        Self::write_line(&self.out, &format_atoms(&event.to_atoms(self.format)));
    }

    fn diagnostic(&self, diagnostic: Diagnostic) {
        Self::write_line(&self.err, &format!("info: {}", format_atoms(&diagnostic.to_atoms())));
    }
}

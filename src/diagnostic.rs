use std::io::{self, Write};

/// Write-only debug port at 0xCD00-0xCD01. Every byte is printed as two lower
/// case hex digits and a newline, flushed immediately. Both addresses alias
/// the same sink.
pub struct DiagnosticSink {
    out: Box<dyn Write>,
}

impl DiagnosticSink {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn write(&mut self, value: u8) {
        tracing::debug!(target: "ultim809::diagnostic", "{:02x}", value);

        let result = writeln!(self.out, "{:02x}", value).and_then(|_| self.out.flush());
        if let Err(err) = result {
            tracing::warn!("[DIAG] Unable to write diagnostic byte: {}", err);
        }
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::stdout()
    }
}

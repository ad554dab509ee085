//! Report line output
//!
//! One line per bridge event. Frames, decoded reports and successful forwards
//! go to the report stream; failures go to the error stream. Every line is
//! flushed so the output can be followed live.

use can_bridge_core::BridgeEvent;
use std::io::{self, Write};

pub struct ReportWriter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> ReportWriter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn write_event(&mut self, event: &BridgeEvent) -> io::Result<()> {
        let stream: &mut dyn Write = match event {
            BridgeEvent::ForwardFailed { .. } | BridgeEvent::ReceiveFailed { .. } => &mut self.err,
            _ => &mut self.out,
        };
        writeln!(stream, "{}", event)?;
        stream.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

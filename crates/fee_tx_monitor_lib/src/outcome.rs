use std::io::Write;

use crate::err_from;
use crate::error::MonitorError;
use crate::model::Outcome;

/// Writes the run verdict as one JSON line. Consumed by [`OutcomeReporter::report`],
/// so a reporter can emit at most once.
pub struct OutcomeReporter<W: Write> {
    writer: W,
}

impl OutcomeReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> OutcomeReporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn report(mut self, outcome: &Outcome) -> Result<W, MonitorError> {
        let line = serde_json::to_string(outcome).map_err(err_from!())?;
        writeln!(self.writer, "{}", line).map_err(err_from!())?;
        self.writer.flush().map_err(err_from!())?;
        Ok(self.writer)
    }
}

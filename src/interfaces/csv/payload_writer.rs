use crate::domain::payload::CheckoutPayload;
use crate::error::Result;
use std::io::Write;

/// Writes checkout payloads as CSV, one row per order, header first.
pub struct PayloadWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PayloadWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payloads(
        &mut self,
        payloads: impl IntoIterator<Item = CheckoutPayload>,
    ) -> Result<()> {
        for payload in payloads {
            self.writer.serialize(payload)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

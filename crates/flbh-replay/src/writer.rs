//! Container writer.
//!
//! [`ContainerWriter`] streams a container to any `Write` sink. The header
//! is written immediately on construction; records follow as opaque bytes.

use std::io::{self, Write};

use crate::codec::{write_i32_be, write_varint};
use crate::types::{ContainerHeader, ReplayEvent};

/// Writes a container to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can write straight into an archive entry.
///
/// # Examples
///
/// ```
/// use flbh_replay::{extract_events, ActionRegistry, ContainerHeader, ContainerWriter};
///
/// let header = ContainerHeader {
///     registry: ActionRegistry::new(vec!["tick".into()]),
///     snapshot: vec![],
/// };
///
/// let mut buf = Vec::new();
/// let mut writer = ContainerWriter::new(&mut buf, &header).unwrap();
/// writer.write_record(0, &20i64.to_be_bytes()).unwrap();
/// writer.write_record(0, &[1, 2]).unwrap();
/// assert_eq!(writer.records_written(), 2);
/// drop(writer);
///
/// let ext = extract_events(&buf, "overworld").unwrap();
/// assert_eq!(ext.events.len(), 2);
/// assert_eq!(ext.events[0].game_time, 20);
/// assert_eq!(ext.events[1].game_time, 0);
/// ```
pub struct ContainerWriter<W: Write> {
    writer: W,
    records_written: u64,
    bytes_written: u64,
}

impl<W: Write> ContainerWriter<W> {
    /// Create a new container writer, immediately writing the header.
    pub fn new(mut writer: W, header: &ContainerHeader) -> io::Result<Self> {
        header.encode_into(&mut writer)?;
        Ok(Self {
            writer,
            records_written: 0,
            bytes_written: 0,
        })
    }

    /// Encode and append a fresh record.
    ///
    /// Empty payloads are refused since readers treat them as corruption.
    pub fn write_record(&mut self, action_id: u32, payload: &[u8]) -> io::Result<()> {
        let length = i32::try_from(payload.len())
            .ok()
            .filter(|&len| len > 0)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("payload length {} not in 1..=i32::MAX", payload.len()),
                )
            })?;
        let mut buf = Vec::with_capacity(payload.len() + 9);
        write_varint(&mut buf, action_id)?;
        write_i32_be(&mut buf, length)?;
        buf.extend_from_slice(payload);
        self.write_raw_record(&buf)
    }

    /// Append an already-encoded record verbatim.
    pub fn write_raw_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.records_written += 1;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Append each event's original record bytes, in iteration order.
    pub fn write_events<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a ReplayEvent>,
    ) -> io::Result<()> {
        for event in events {
            self.write_raw_record(&event.raw)?;
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Record bytes written so far (header excluded).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::extract_events;
    use crate::types::{ActionRegistry, Container};

    fn header() -> ContainerHeader {
        ContainerHeader {
            registry: ActionRegistry::new(vec!["a".into(), "b".into()]),
            snapshot: vec![5; 16],
        }
    }

    #[test]
    fn raw_records_are_relocated_verbatim() {
        let mut source = Vec::new();
        {
            let mut w = ContainerWriter::new(&mut source, &header()).unwrap();
            w.write_record(1, &7i64.to_be_bytes()).unwrap();
            w.write_record(300, &[1, 2, 3]).unwrap();
        }
        let ext = extract_events(&source, "s").unwrap();

        let mut copy = Vec::new();
        let mut w = ContainerWriter::new(&mut copy, &ext.header).unwrap();
        w.write_events(&ext.events).unwrap();
        assert_eq!(w.records_written(), 2);
        let expected_stream = Container::decode(&source).unwrap().events;
        assert_eq!(w.bytes_written(), expected_stream.len() as u64);
        drop(w);

        assert_eq!(copy, source);
    }

    #[test]
    fn empty_payload_refused() {
        let mut buf = Vec::new();
        let mut w = ContainerWriter::new(&mut buf, &header()).unwrap();
        let err = w.write_record(0, &[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(w.records_written(), 0);
    }

    #[test]
    fn into_inner_returns_sink() {
        let w = ContainerWriter::new(Vec::new(), &ContainerHeader::default()).unwrap();
        let buf = w.into_inner();
        assert_eq!(Container::decode(&buf).unwrap(), Container::default());
    }
}

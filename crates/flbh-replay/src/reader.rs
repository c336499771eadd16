//! Event stream reading.
//!
//! [`RecordIter`] walks the record stream of a container buffer one record
//! at a time without copying. [`extract_events`] builds on it to produce
//! owned, time-tagged [`ReplayEvent`]s for merging.

use std::fmt;

use crate::codec::SliceReader;
use crate::error::FormatError;
use crate::types::{ContainerHeader, RawRecord, ReplayEvent, TimeRange};

/// Lazy iterator over the event records of a buffer.
///
/// Yields `Err` at most once: after the first malformed record the iterator
/// is fused, since record boundaries past that point cannot be trusted.
pub struct RecordIter<'a> {
    reader: SliceReader<'a>,
    records_read: u64,
    done: bool,
}

impl<'a> RecordIter<'a> {
    /// Iterate the records of `data` starting at byte offset `start`.
    pub fn new(data: &'a [u8], start: usize) -> Self {
        Self {
            reader: SliceReader::at(data, start),
            records_read: 0,
            done: false,
        }
    }

    /// Number of records yielded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Byte offset of the next unread record.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    fn read_record(&mut self) -> Result<RawRecord<'a>, FormatError> {
        let start = self.reader.position();
        let action_id = self.reader.read_varint()?;
        let length = self.reader.read_i32_be("payload length")?;
        let len = match usize::try_from(length) {
            Ok(len) if len > 0 => len,
            _ => {
                return Err(FormatError::InvalidLength {
                    what: "event payload",
                    length,
                })
            }
        };
        let payload = self.reader.take(len, "event payload")?;
        let end = self.reader.position();

        Ok(RawRecord {
            action_id,
            payload,
            bytes: &self.reader.data()[start..end],
            offset: start,
        })
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<RawRecord<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.is_empty() {
            return None;
        }
        match self.read_record() {
            Ok(record) => {
                self.records_read += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Extraction stopped early at a malformed record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionWarning {
    /// Label of the source being extracted.
    pub source: String,
    /// Events collected before the stop; these are kept.
    pub events_kept: usize,
    /// Why the record could not be read.
    pub error: FormatError,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source '{}': stopped after {} events: {}",
            self.source, self.events_kept, self.error
        )
    }
}

/// Result of extracting one container.
#[derive(Clone, Debug)]
pub struct Extraction {
    /// The decoded header (registry and snapshot).
    pub header: ContainerHeader,
    /// Events in stream order.
    pub events: Vec<ReplayEvent>,
    /// Set if the stream ended in a malformed record.
    pub warning: Option<ExtractionWarning>,
}

impl Extraction {
    /// Span of this extraction's timestamped events.
    pub fn time_range(&self) -> Option<TimeRange> {
        TimeRange::of_events(&self.events)
    }
}

/// Decode a container and collect its events tagged with `source`.
///
/// Header errors (bad magic, bad varint, oversize lengths) are returned as
/// `Err`. A malformed record ends extraction early: the events before it
/// are kept and the problem is reported through [`Extraction::warning`]
/// and a `tracing` warning. Each event's `raw` bytes are the record exactly
/// as it appears in `data`.
pub fn extract_events(data: &[u8], source: &str) -> Result<Extraction, FormatError> {
    let (header, start) = ContainerHeader::decode_prefix(data)?;

    let mut events = Vec::new();
    let mut warning = None;
    for record in RecordIter::new(data, start) {
        match record {
            Ok(record) => events.push(ReplayEvent::from_record(&record, source)),
            Err(error) => {
                let w = ExtractionWarning {
                    source: source.to_owned(),
                    events_kept: events.len(),
                    error,
                };
                tracing::warn!(%w, "malformed event record, keeping partial data");
                warning = Some(w);
            }
        }
    }

    tracing::debug!(
        source,
        events = events.len(),
        actions = header.registry.len(),
        snapshot_bytes = header.snapshot.len(),
        "extracted container"
    );

    Ok(Extraction {
        header,
        events,
        warning,
    })
}

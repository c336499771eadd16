//! Codec and event extraction for the FLBH replay container.
//!
//! An FLBH container is one entry inside a replay archive. It holds the
//! catalog of action names used by the recording, an opaque snapshot of the
//! initial world state, and a stream of self-describing event records.
//!
//! # Architecture
//!
//! - [`Container`] decodes and re-encodes a whole container buffer
//! - [`RecordIter`] walks the event stream lazily, one record at a time
//! - [`extract_events`] turns a container into time-tagged [`ReplayEvent`]s,
//!   stopping (not failing) at the first malformed record
//! - [`ContainerWriter`] streams a header plus opaque record bytes to any
//!   `Write` sink
//!
//! Event payloads are never interpreted beyond their length and an optional
//! leading 8-byte game-time probe.
//!
//! # Format
//!
//! ```text
//! [MAGIC "FLBH"] [actionCount varint] { [len varint] [name UTF-8] } x actionCount
//! [snapshotLength i32 BE] [snapshot bytes]
//! { [actionId varint] [payloadLength i32 BE] [payload] } x N
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::FormatError;
pub use reader::{extract_events, Extraction, ExtractionWarning, RecordIter};
pub use types::{
    ActionRegistry, Container, ContainerHeader, RawRecord, RegistryDivergence, ReplayEvent,
    TimeRange, NO_TIMESTAMP,
};
pub use writer::ContainerWriter;

/// Magic number at the start of every container (`b"FLBH"`, big-endian).
pub const MAGIC: u32 = 0x464C_4248;

/// Magic number as it appears on disk.
pub const MAGIC_BYTES: [u8; 4] = MAGIC.to_be_bytes();

/// Whether `data` starts with the container magic.
///
/// Used to tell container entries apart from other archive resources
/// without decoding them.
pub fn has_magic(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == MAGIC_BYTES
}

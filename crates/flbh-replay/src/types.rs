//! Data types for containers, records, and extracted events.

use std::fmt;
use std::io::{self, Write};

use crate::codec::{write_i32_be, write_str, write_varint, SliceReader};
use crate::error::FormatError;
use crate::reader::RecordIter;
use crate::{MAGIC, MAGIC_BYTES};

/// Game time assigned to events whose payload is too short to carry one.
pub const NO_TIMESTAMP: i64 = 0;

/// Read the game time probe from an event payload.
///
/// The first eight bytes are read as a big-endian `i64`. Shorter payloads
/// yield [`NO_TIMESTAMP`]. No plausibility check is made on the value.
pub fn probe_game_time(payload: &[u8]) -> i64 {
    match payload.get(..8) {
        Some(head) => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(head);
            i64::from_be_bytes(buf)
        }
        None => NO_TIMESTAMP,
    }
}

// ── Action registry ─────────────────────────────────────────────

/// Ordered catalog of action names, indexed by action id.
///
/// The mapping is local to one container: id `n` names the `n`-th entry.
///
/// # Examples
///
/// ```
/// use flbh_replay::ActionRegistry;
///
/// let registry = ActionRegistry::new(vec!["flashback:next_tick".into()]);
/// assert_eq!(registry.name_of(0), Some("flashback:next_tick"));
/// assert_eq!(registry.name_of(1), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionRegistry {
    names: Vec<String>,
}

/// How an incoming registry lines up against a base registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryDivergence {
    /// Same names in the same order.
    Identical,
    /// The registries disagree starting at `first_id`.
    ///
    /// Records from the incoming container that use ids at or past this
    /// point may resolve to a different action under the base registry.
    Differs {
        /// First action id whose name differs (or exists on one side only).
        first_id: u32,
        /// Name under the base registry, if any.
        base: Option<String>,
        /// Name under the incoming registry, if any.
        incoming: Option<String>,
    },
}

impl RegistryDivergence {
    /// Whether both registries map every id to the same name.
    pub fn is_identical(&self) -> bool {
        matches!(self, Self::Identical)
    }
}

impl fmt::Display for RegistryDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identical => write!(f, "identical"),
            Self::Differs {
                first_id,
                base,
                incoming,
            } => write!(
                f,
                "action id {first_id} is {} in base but {} in incoming",
                base.as_deref().unwrap_or("<absent>"),
                incoming.as_deref().unwrap_or("<absent>")
            ),
        }
    }
}

impl ActionRegistry {
    /// Build a registry from names in id order.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Name bound to `id`, if the id is in range.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry has no actions.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate `(id, name)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i as u32, n.as_str()))
    }

    /// Compare against another container's registry.
    pub fn compare(&self, incoming: &ActionRegistry) -> RegistryDivergence {
        let longest = self.names.len().max(incoming.names.len());
        for id in 0..longest {
            let base = self.names.get(id);
            let other = incoming.names.get(id);
            if base != other {
                return RegistryDivergence::Differs {
                    first_id: id as u32,
                    base: base.cloned(),
                    incoming: other.cloned(),
                };
            }
        }
        RegistryDivergence::Identical
    }

    fn decode(r: &mut SliceReader<'_>) -> Result<Self, FormatError> {
        let count = r.read_varint()? as usize;
        // Each name needs at least its length byte; don't trust `count` for capacity.
        let mut names = Vec::with_capacity(count.min(r.remaining()));
        for index in 0..count {
            names.push(r.read_str(index)?);
        }
        Ok(Self { names })
    }

    fn encode_into(&self, w: &mut dyn Write) -> io::Result<()> {
        write_varint(w, self.names.len() as u32)?;
        for name in &self.names {
            write_str(w, name)?;
        }
        Ok(())
    }
}

// ── Container ───────────────────────────────────────────────────

/// Everything in a container that precedes the event stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Action catalog for this container.
    pub registry: ActionRegistry,
    /// Opaque initial-state snapshot.
    pub snapshot: Vec<u8>,
}

impl ContainerHeader {
    /// Decode magic, registry, and snapshot from the front of `data`.
    ///
    /// Returns the header and the byte offset where the event stream begins.
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize), FormatError> {
        let mut r = SliceReader::new(data);
        let magic = r
            .read_u32_be("magic")
            .map_err(|_| FormatError::InvalidMagic { found: None })?;
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic { found: Some(magic) });
        }

        let registry = ActionRegistry::decode(&mut r)?;
        let snapshot_len = r.read_len_i32("snapshot")?;
        let snapshot = r.take(snapshot_len, "snapshot")?.to_vec();

        Ok((Self { registry, snapshot }, r.position()))
    }

    /// Write magic, registry, and snapshot.
    pub fn encode_into(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(&MAGIC_BYTES)?;
        self.registry.encode_into(w)?;
        let snapshot_len = i32::try_from(self.snapshot.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("snapshot of {} bytes exceeds i32 length", self.snapshot.len()),
            )
        })?;
        write_i32_be(w, snapshot_len)?;
        w.write_all(&self.snapshot)
    }
}

/// A decoded container.
///
/// The event stream is kept as opaque bytes; walk it with
/// [`Container::records`]. Decoding validates the header only, so a
/// container with a damaged tail still decodes and the damage surfaces
/// during record iteration.
///
/// # Examples
///
/// ```
/// use flbh_replay::{ActionRegistry, Container, ContainerHeader};
///
/// let container = Container {
///     header: ContainerHeader {
///         registry: ActionRegistry::new(vec!["tick".into()]),
///         snapshot: vec![1, 2, 3],
///     },
///     events: vec![0x00, 0, 0, 0, 1, 0xAA],
/// };
/// let bytes = container.encode().unwrap();
/// assert_eq!(Container::decode(&bytes).unwrap(), container);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Container {
    /// Registry and snapshot.
    pub header: ContainerHeader,
    /// Concatenated raw event records.
    pub events: Vec<u8>,
}

impl Container {
    /// Decode a whole container buffer.
    pub fn decode(data: &[u8]) -> Result<Self, FormatError> {
        let (header, offset) = ContainerHeader::decode_prefix(data)?;
        Ok(Self {
            header,
            events: data[offset..].to_vec(),
        })
    }

    /// Encode to a fresh buffer.
    ///
    /// Only fails for snapshots too large for the i32 length prefix.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.header.snapshot.len() + self.events.len() + 64);
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Encode to any `Write` sink.
    pub fn encode_into(&self, w: &mut dyn Write) -> io::Result<()> {
        self.header.encode_into(w)?;
        w.write_all(&self.events)
    }

    /// Lazily walk the event stream.
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter::new(&self.events, 0)
    }
}

// ── Records and events ──────────────────────────────────────────

/// One event record borrowed from a container buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Action id, resolved through the container's registry.
    pub action_id: u32,
    /// Payload bytes (never empty).
    pub payload: &'a [u8],
    /// The whole record as encoded: id varint, length, payload.
    pub bytes: &'a [u8],
    /// Offset of the record within the buffer it was read from.
    pub offset: usize,
}

impl RawRecord<'_> {
    /// Game time probed from the payload, or [`NO_TIMESTAMP`].
    pub fn game_time(&self) -> i64 {
        probe_game_time(self.payload)
    }
}

/// A time-tagged event ready for merging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayEvent {
    /// Game time, or [`NO_TIMESTAMP`].
    pub game_time: i64,
    /// Label of the recording this event came from.
    pub source: String,
    /// The record exactly as it was encoded in the source container.
    pub raw: Vec<u8>,
}

impl ReplayEvent {
    /// Copy a borrowed record into an owned event tagged with `source`.
    pub fn from_record(record: &RawRecord<'_>, source: &str) -> Self {
        Self {
            game_time: record.game_time(),
            source: source.to_owned(),
            raw: record.bytes.to_vec(),
        }
    }

    /// Whether the event carries a usable timestamp.
    pub fn has_timestamp(&self) -> bool {
        self.game_time != NO_TIMESTAMP
    }
}

/// Inclusive game-time span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeRange {
    /// Earliest game time.
    pub min: i64,
    /// Latest game time.
    pub max: i64,
}

impl TimeRange {
    /// Span covering a single instant.
    pub fn at(t: i64) -> Self {
        Self { min: t, max: t }
    }

    /// Widen to include `t`.
    pub fn include(&mut self, t: i64) {
        self.min = self.min.min(t);
        self.max = self.max.max(t);
    }

    /// Whether `t` lies within the span.
    pub fn contains(&self, t: i64) -> bool {
        self.min <= t && t <= self.max
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Span of the timestamped events in `events`, if any.
    pub fn of_events<'a>(events: impl IntoIterator<Item = &'a ReplayEvent>) -> Option<Self> {
        events
            .into_iter()
            .filter(|e| e.has_timestamp())
            .fold(None, |acc: Option<TimeRange>, e| match acc {
                Some(mut r) => {
                    r.include(e.game_time);
                    Some(r)
                }
                None => Some(TimeRange::at(e.game_time)),
            })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

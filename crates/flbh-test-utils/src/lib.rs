//! Test fixtures for FLBH containers and replay archives.
//!
//! The encoders here are written independently of `flbh-replay` so tests
//! check the codec against a second, byte-level rendition of the format.
//!
//! - [`ContainerBuilder`] assembles a container from actions, a snapshot,
//!   and records.
//! - [`ArchiveBuilder`] writes a replay archive (zip) to disk.
//! - [`read_archive`] lists an archive's file entries for assertions.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub use tempfile::TempDir;

/// Container magic as written on disk.
pub const MAGIC: [u8; 4] = *b"FLBH";

/// Metadata entry name.
pub const METADATA: &str = "metadata.json";
/// Icon entry name.
pub const ICON: &str = "icon.png";
/// Prefix for chunk cache entries.
pub const CHUNK_CACHE_PREFIX: &str = "level_chunk_caches/";

/// Little-endian base-128 varint.
pub fn varint(mut v: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let low = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(low);
            return out;
        }
        out.push(low | 0x80);
    }
}

/// Encode one event record.
pub fn record(action_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = varint(action_id);
    out.extend_from_slice(&(payload.len() as i32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Payload that starts with a big-endian game time.
pub fn timed_payload(game_time: i64, extra: &[u8]) -> Vec<u8> {
    let mut out = game_time.to_be_bytes().to_vec();
    out.extend_from_slice(extra);
    out
}

/// Builds container bytes.
#[derive(Clone, Debug, Default)]
pub struct ContainerBuilder {
    actions: Vec<String>,
    snapshot: Vec<u8>,
    records: Vec<Vec<u8>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, name: &str) -> Self {
        self.actions.push(name.to_owned());
        self
    }

    pub fn snapshot(mut self, bytes: &[u8]) -> Self {
        self.snapshot = bytes.to_vec();
        self
    }

    /// Record whose payload leads with `game_time`.
    ///
    /// `tag` is appended after the timestamp so payloads stay distinguishable.
    pub fn timed(self, action_id: u32, game_time: i64, tag: &[u8]) -> Self {
        self.raw(record(action_id, &timed_payload(game_time, tag)))
    }

    /// Record whose payload is used as-is.
    pub fn event(self, action_id: u32, payload: &[u8]) -> Self {
        self.raw(record(action_id, payload))
    }

    /// Arbitrary bytes appended to the event stream.
    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.records.push(bytes);
        self
    }

    /// Encoded bytes of the `i`-th appended record.
    pub fn record_bytes(&self, i: usize) -> &[u8] {
        &self.records[i]
    }

    /// Header bytes only: magic, registry, snapshot.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend(varint(self.actions.len() as u32));
        for name in &self.actions {
            out.extend(varint(name.len() as u32));
            out.extend_from_slice(name.as_bytes());
        }
        out.extend_from_slice(&(self.snapshot.len() as i32).to_be_bytes());
        out.extend_from_slice(&self.snapshot);
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        for r in &self.records {
            out.extend_from_slice(r);
        }
        out
    }
}

/// Builds a replay archive on disk.
#[derive(Clone, Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(self, meta: &Value) -> Self {
        let bytes = serde_json::to_vec(meta).unwrap_or_default();
        self.entry(METADATA, bytes)
    }

    pub fn icon(self, bytes: &[u8]) -> Self {
        self.entry(ICON, bytes.to_vec())
    }

    pub fn chunk_cache(self, name: &str, bytes: &[u8]) -> Self {
        self.entry(&format!("{CHUNK_CACHE_PREFIX}{name}"), bytes.to_vec())
    }

    pub fn container(self, name: &str, container: &ContainerBuilder) -> Self {
        self.entry(name, container.build())
    }

    pub fn entry(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.entries.push((name.to_owned(), bytes));
        self
    }

    pub fn write_to(&self, path: &Path) -> ZipResult<()> {
        let mut zip = ZipWriter::new(File::create(path)?);
        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip.write_all(bytes)?;
        }
        zip.finish()?;
        Ok(())
    }
}

/// File entries of an archive, in archive order.
pub fn read_archive(path: &Path) -> ZipResult<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        out.push((file.name().to_owned(), bytes));
    }
    Ok(out)
}

/// Bytes of the entry called `name`, if present.
pub fn archive_entry(entries: &[(String, Vec<u8>)], name: &str) -> Option<Vec<u8>> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, b)| b.clone())
}

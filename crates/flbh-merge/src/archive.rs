//! Replay archive access.
//!
//! A replay archive is a zip file holding `metadata.json`, an optional
//! `icon.png`, optional chunk caches under `level_chunk_caches/`, and one
//! or more FLBH container entries. [`ReplayArchive`] reads a source archive;
//! [`MergedArchiveWriter`] writes the output atomically.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flbh_replay::{has_magic, ContainerHeader, ContainerWriter};
use serde_json::Value;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::MergeError;

/// Metadata entry name.
pub const METADATA_ENTRY: &str = "metadata.json";
/// Icon entry name.
pub const ICON_ENTRY: &str = "icon.png";
/// Directory prefix of chunk cache entries.
pub const CHUNK_CACHE_PREFIX: &str = "level_chunk_caches/";
/// Container entry name in merged output.
pub const CONTAINER_ENTRY: &str = "replay.flbh";

/// A named file read out of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name within the archive.
    pub name: String,
    /// Uncompressed contents.
    pub data: Vec<u8>,
}

/// Read-only handle on a source replay archive.
///
/// The underlying file is closed when the handle is dropped.
pub struct ReplayArchive {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
}

impl ReplayArchive {
    /// Open the archive at `path`.
    pub fn open(path: &Path) -> Result<Self, MergeError> {
        let file = File::open(path).map_err(|e| MergeError::io(path, e))?;
        let zip = ZipArchive::new(BufReader::new(file)).map_err(|e| MergeError::archive(path, e))?;
        tracing::debug!(path = %path.display(), entries = zip.len(), "opened archive");
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Parsed `metadata.json`. It must exist and be a JSON object.
    pub fn metadata(&mut self) -> Result<Value, MergeError> {
        let bytes = self
            .read_named(METADATA_ENTRY)?
            .ok_or_else(|| MergeError::MissingMetadata {
                path: self.path.clone(),
            })?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| MergeError::InvalidMetadata {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        if !value.is_object() {
            return Err(MergeError::InvalidMetadata {
                path: self.path.clone(),
                detail: "top level is not a JSON object".into(),
            });
        }
        Ok(value)
    }

    /// Contents of `icon.png`, if present.
    pub fn icon(&mut self) -> Result<Option<Vec<u8>>, MergeError> {
        self.read_named(ICON_ENTRY)
    }

    /// Names of chunk cache entries, in archive order.
    pub fn chunk_cache_names(&self) -> Vec<String> {
        self.zip
            .file_names()
            .filter(|n| is_chunk_cache(n) && !n.ends_with('/'))
            .map(str::to_owned)
            .collect()
    }

    /// Every chunk cache entry, in archive order.
    pub fn chunk_caches(&mut self) -> Result<Vec<ArchiveEntry>, MergeError> {
        self.read_matching(is_chunk_cache)
    }

    /// Every container entry, in archive order.
    ///
    /// A container entry is any file that is not metadata, icon or chunk
    /// cache and whose contents start with the FLBH magic. Other entries
    /// are skipped.
    pub fn containers(&mut self) -> Result<Vec<ArchiveEntry>, MergeError> {
        let mut entries = self.read_matching(|name| !is_reserved(name))?;
        entries.retain(|entry| {
            let ok = has_magic(&entry.data);
            if !ok {
                tracing::debug!(
                    archive = %self.path.display(),
                    entry = %entry.name,
                    "skipping non-container entry"
                );
            }
            ok
        });
        Ok(entries)
    }

    fn read_named(&mut self, name: &str) -> Result<Option<Vec<u8>>, MergeError> {
        let file = match self.zip.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(MergeError::archive(&self.path, e)),
        };
        let size = file.size();
        read_all(file, size, &self.path).map(Some)
    }

    fn read_matching(
        &mut self,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<ArchiveEntry>, MergeError> {
        let mut out = Vec::new();
        for i in 0..self.zip.len() {
            let file = self
                .zip
                .by_index(i)
                .map_err(|e| MergeError::archive(&self.path, e))?;
            if file.is_dir() || !keep(file.name()) {
                continue;
            }
            let name = file.name().to_owned();
            let size = file.size();
            let data = read_all(file, size, &self.path)?;
            out.push(ArchiveEntry { name, data });
        }
        Ok(out)
    }
}

fn read_all(mut reader: impl Read, size: u64, path: &Path) -> Result<Vec<u8>, MergeError> {
    let mut buf = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
    reader
        .read_to_end(&mut buf)
        .map_err(|e| MergeError::io(path, e))?;
    Ok(buf)
}

fn is_chunk_cache(name: &str) -> bool {
    name.starts_with(CHUNK_CACHE_PREFIX)
}

/// Entries that are never containers: metadata and icon (at any depth)
/// and chunk caches.
fn is_reserved(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    base == METADATA_ENTRY || base == ICON_ENTRY || is_chunk_cache(name)
}

type Sink = ZipWriter<BufWriter<NamedTempFile>>;

/// Writer for the merged output archive.
///
/// Entries go to a temporary file next to the destination. [`finish`]
/// renames it into place; dropping the writer without finishing removes
/// the temporary file and leaves the destination untouched.
///
/// [`finish`]: MergedArchiveWriter::finish
pub struct MergedArchiveWriter {
    path: PathBuf,
    zip: Sink,
    entries: usize,
}

impl MergedArchiveWriter {
    /// Start writing an archive destined for `path`.
    pub fn create(path: &Path) -> Result<Self, MergeError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir).map_err(|e| MergeError::io(dir, e))?;
        tracing::debug!(tmp = %tmp.path().display(), "writing merged archive");
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(BufWriter::new(tmp)),
            entries: 0,
        })
    }

    /// Final destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries started so far.
    pub fn entries_written(&self) -> usize {
        self.entries
    }

    /// Write a whole entry.
    pub fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<(), MergeError> {
        self.start(name)?;
        self.zip
            .write_all(data)
            .map_err(|e| MergeError::io(&self.path, e))
    }

    /// Write `metadata.json`, pretty-printed.
    pub fn write_metadata(&mut self, metadata: &Value) -> Result<(), MergeError> {
        let bytes = serde_json::to_vec_pretty(metadata)?;
        self.write_entry(METADATA_ENTRY, &bytes)
    }

    /// Start the container entry `name` and write `header` into it.
    ///
    /// Records appended through the returned writer land in that entry.
    pub fn container_writer(
        &mut self,
        name: &str,
        header: &ContainerHeader,
    ) -> Result<ContainerWriter<&mut Sink>, MergeError> {
        self.start(name)?;
        ContainerWriter::new(&mut self.zip, header).map_err(|e| MergeError::io(&self.path, e))
    }

    /// Finalize the archive and move it to its destination.
    pub fn finish(self) -> Result<PathBuf, MergeError> {
        let Self { path, zip, entries } = self;
        let buffered = zip.finish().map_err(|e| MergeError::archive(&path, e))?;
        let tmp = buffered
            .into_inner()
            .map_err(|e| MergeError::io(&path, e.into_error()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| MergeError::io(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| MergeError::io(&path, e.error))?;
        tracing::debug!(path = %path.display(), entries, "persisted merged archive");
        Ok(path)
    }

    fn start(&mut self, name: &str) -> Result<(), MergeError> {
        self.zip
            .start_file(name, SimpleFileOptions::default())
            .map_err(|e| MergeError::archive(&self.path, e))?;
        self.entries += 1;
        Ok(())
    }
}

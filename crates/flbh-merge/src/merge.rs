//! The merge pipeline.
//!
//! [`merge_replays`] reads two replay archives, merges their metadata,
//! interleaves their events by game time, and writes one archive that
//! plays back both recordings.

use std::path::{Path, PathBuf};

use flbh_replay::{extract_events, ContainerHeader, ReplayEvent, TimeRange};
use serde::Serialize;

use crate::archive::{MergedArchiveWriter, ReplayArchive, CONTAINER_ENTRY, ICON_ENTRY};
use crate::error::MergeError;
use crate::metadata::{merge_metadata_with_suffix, MERGED_DESCRIPTION_SUFFIX};
use crate::schedule::schedule;

/// Inputs for a merge run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    /// Archive whose header, icon and chunk caches are kept.
    pub base: PathBuf,
    /// Archive whose events are merged in.
    pub incoming: PathBuf,
    /// Destination archive.
    pub output: PathBuf,
    /// Source label for base events.
    pub base_label: String,
    /// Source label for incoming events.
    pub incoming_label: String,
    /// Appended to the merged description.
    pub description_suffix: String,
    /// Name of the container entry in the output.
    pub container_entry: String,
}

impl MergeConfig {
    /// Config with the default description suffix and container entry name.
    pub fn new(
        base: impl Into<PathBuf>,
        incoming: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        base_label: impl Into<String>,
        incoming_label: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            incoming: incoming.into(),
            output: output.into(),
            base_label: base_label.into(),
            incoming_label: incoming_label.into(),
            description_suffix: MERGED_DESCRIPTION_SUFFIX.to_owned(),
            container_entry: CONTAINER_ENTRY.to_owned(),
        }
    }
}

/// What was read from one source archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Source label.
    pub label: String,
    /// Archive path.
    pub path: PathBuf,
    /// Container entries found.
    pub containers: usize,
    /// Events extracted across all containers.
    pub events: usize,
    /// Earliest timestamped event, if any.
    pub min_time: Option<i64>,
    /// Latest timestamped event, if any.
    pub max_time: Option<i64>,
    /// Recoverable problems met while extracting.
    pub warnings: Vec<String>,
}

/// Result of a successful merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Where the merged archive was written.
    pub output: PathBuf,
    /// Base source.
    pub base: SourceSummary,
    /// Incoming source.
    pub incoming: SourceSummary,
    /// Events in the merged container.
    pub merged_events: usize,
    /// Events left out of the merged container.
    pub excluded_events: usize,
    /// Diagnostic cut points over the global time span.
    pub breakpoints: Vec<i64>,
    /// Timestamped events per breakpoint bucket.
    pub bucket_counts: Vec<usize>,
    /// Whether the base icon was copied.
    pub icon_copied: bool,
    /// Base chunk caches copied into the output.
    pub chunk_caches_copied: usize,
    /// Incoming chunk caches not carried over.
    pub chunk_caches_dropped: usize,
    /// Description of the action registry mismatch, if any.
    pub registry_divergence: Option<String>,
}

struct LoadedSource {
    header: Option<ContainerHeader>,
    events: Vec<ReplayEvent>,
    summary: SourceSummary,
}

fn load_source(archive: &mut ReplayArchive, label: &str) -> Result<LoadedSource, MergeError> {
    let containers = archive.containers()?;
    let mut summary = SourceSummary {
        label: label.to_owned(),
        path: archive.path().to_path_buf(),
        containers: containers.len(),
        ..Default::default()
    };
    let mut header = None;
    let mut events = Vec::new();

    for entry in &containers {
        let extraction =
            extract_events(&entry.data, label).map_err(|source| MergeError::Format {
                path: archive.path().to_path_buf(),
                entry: entry.name.clone(),
                source,
            })?;
        if let Some(w) = &extraction.warning {
            summary.warnings.push(format!("{}: {w}", entry.name));
        }
        header.get_or_insert(extraction.header);
        events.extend(extraction.events);
    }

    summary.events = events.len();
    if let Some(range) = TimeRange::of_events(&events) {
        summary.min_time = Some(range.min);
        summary.max_time = Some(range.max);
    }
    tracing::info!(
        source = label,
        containers = summary.containers,
        events = summary.events,
        "extracted events"
    );

    Ok(LoadedSource {
        header,
        events,
        summary,
    })
}

/// Merge `config.incoming` into `config.base` and write `config.output`.
///
/// The output keeps the base archive's container header (action registry
/// and snapshot), icon and chunk caches. Metadata is merged, and the event
/// stream holds every event from both sources ordered by game time.
///
/// Nothing is written to `config.output` unless the whole merge succeeds.
pub fn merge_replays(config: &MergeConfig) -> Result<MergeReport, MergeError> {
    tracing::info!(
        base = %config.base.display(),
        incoming = %config.incoming.display(),
        output = %config.output.display(),
        "merging replays"
    );

    let mut base = ReplayArchive::open(&config.base)?;
    let mut incoming = ReplayArchive::open(&config.incoming)?;

    let metadata = merge_metadata_with_suffix(
        &base.metadata()?,
        &incoming.metadata()?,
        &config.description_suffix,
    )?;

    let base_src = load_source(&mut base, &config.base_label)?;
    let incoming_src = load_source(&mut incoming, &config.incoming_label)?;

    let header = base_src.header.ok_or_else(|| MergeError::MissingContainer {
        path: config.base.clone(),
    })?;
    if incoming_src.header.is_none() {
        tracing::warn!(
            path = %config.incoming.display(),
            "incoming archive has no replay container; it contributes no events"
        );
    }

    let registry_divergence = incoming_src
        .header
        .as_ref()
        .map(|h| header.registry.compare(&h.registry))
        .filter(|d| !d.is_identical())
        .map(|d| {
            tracing::warn!(%d, "action registries differ; output uses the base registry");
            d.to_string()
        });

    let icon = base.icon()?;
    let chunk_caches = base.chunk_caches()?;
    let chunk_caches_dropped = incoming.chunk_cache_names().len();
    if chunk_caches_dropped > 0 {
        tracing::warn!(
            count = chunk_caches_dropped,
            "incoming chunk caches are not carried over"
        );
    }
    drop(base);
    drop(incoming);

    let mut events = base_src.events;
    events.extend(incoming_src.events);
    let plan = schedule(events);

    let mut out = MergedArchiveWriter::create(&config.output)?;
    out.write_metadata(&metadata)?;
    if let Some(icon) = &icon {
        out.write_entry(ICON_ENTRY, icon)?;
    }
    for cache in &chunk_caches {
        out.write_entry(&cache.name, &cache.data)?;
    }
    {
        let mut container = out.container_writer(&config.container_entry, &header)?;
        container
            .write_events(plan.included())
            .map_err(|e| MergeError::io(&config.output, e))?;
        tracing::debug!(
            records = container.records_written(),
            bytes = container.bytes_written(),
            "wrote merged container"
        );
    }
    let output = out.finish()?;

    let report = MergeReport {
        output,
        base: base_src.summary,
        incoming: incoming_src.summary,
        merged_events: plan.len(),
        excluded_events: plan.excluded_count(),
        breakpoints: plan.breakpoints().as_slice().to_vec(),
        bucket_counts: plan.bucket_counts().to_vec(),
        icon_copied: icon.is_some(),
        chunk_caches_copied: chunk_caches.len(),
        chunk_caches_dropped,
        registry_divergence,
    };
    tracing::info!(
        output = %report.output.display(),
        events = report.merged_events,
        "merge complete"
    );
    Ok(report)
}

impl MergeReport {
    /// Path of the written archive.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether any source reported a recoverable problem.
    pub fn has_warnings(&self) -> bool {
        !self.base.warnings.is_empty()
            || !self.incoming.warnings.is_empty()
            || self.registry_divergence.is_some()
    }
}

//! Merge independently recorded replay archives into one.
//!
//! Two recordings of the same session (for example one per dimension) each
//! hold a chronological event stream. This crate interleaves them by game
//! time into a single archive that plays back both:
//!
//! 1. [`ReplayArchive`] reads each source archive's metadata, icon, chunk
//!    caches and container entries.
//! 2. [`merge_metadata`] unions the `dimensions` lists and marks the
//!    description as merged.
//! 3. [`schedule`] stable-sorts the events of both sources by game time.
//! 4. [`MergedArchiveWriter`] writes the result to a temporary file and
//!    moves it into place only once complete.
//!
//! [`merge_replays`] runs the whole pipeline from a [`MergeConfig`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod error;
pub mod merge;
pub mod metadata;
pub mod schedule;

pub use archive::{ArchiveEntry, MergedArchiveWriter, ReplayArchive};
pub use error::{MergeError, MetadataError};
pub use merge::{merge_replays, MergeConfig, MergeReport, SourceSummary};
pub use metadata::{merge_metadata, merge_metadata_with_suffix, MERGED_DESCRIPTION_SUFFIX};
pub use schedule::{schedule, Breakpoints, MergePlan};

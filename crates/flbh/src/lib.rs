//! FLBH: read, write and merge replay recordings.
//!
//! This is the top-level facade crate that re-exports the public API of the
//! `flbh-*` sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use flbh::prelude::*;
//!
//! let header = ContainerHeader {
//!     registry: ActionRegistry::new(vec!["flashback:action/next_tick".into()]),
//!     snapshot: vec![],
//! };
//! let mut a = Vec::new();
//! let mut w = ContainerWriter::new(&mut a, &header).unwrap();
//! w.write_record(0, &30i64.to_be_bytes()).unwrap();
//! w.write_record(0, &10i64.to_be_bytes()).unwrap();
//! drop(w);
//!
//! let events = extract_events(&a, "overworld").unwrap().events;
//! let plan = schedule(events);
//! let times: Vec<i64> = plan.included().iter().map(|e| e.game_time).collect();
//! assert_eq!(times, vec![10, 30]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`replay`] | `flbh-replay` | Container codec, event extraction, writer |
//! | [`merge`] | `flbh-merge` | Metadata merge, scheduling, archives, pipeline |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Container codec and event extraction (`flbh-replay`).
///
/// Decode containers with [`replay::Container`], pull events out with
/// [`replay::extract_events`], write with [`replay::ContainerWriter`].
pub use flbh_replay as replay;

/// Replay archive merging (`flbh-merge`).
///
/// [`merge::merge_replays`] runs the full pipeline.
pub use flbh_merge as merge;

/// Common imports.
pub mod prelude {
    pub use flbh_replay::{
        extract_events, ActionRegistry, Container, ContainerHeader, ContainerWriter, FormatError,
        ReplayEvent, TimeRange, NO_TIMESTAMP,
    };

    pub use flbh_merge::{
        merge_metadata, merge_replays, schedule, MergeConfig, MergeError, MergePlan, MergeReport,
    };
}

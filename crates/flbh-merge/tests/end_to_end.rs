//! End-to-end merges of archives built on disk.

use std::path::PathBuf;

use flbh_merge::{merge_replays, MergeConfig, MergeError};
use flbh_replay::Container;
use flbh_test_utils::{
    archive_entry, read_archive, record, timed_payload, ArchiveBuilder, ContainerBuilder, TempDir,
};
use serde_json::{json, Value};

const TICK: &str = "flashback:action/next_tick";
const PACKET: &str = "flashback:action/game_packet";

fn overworld() -> ContainerBuilder {
    ContainerBuilder::new()
        .action(TICK)
        .action(PACKET)
        .snapshot(&[0xAA; 32])
        .timed(0, 10, b"ow-10")
        .timed(1, 30, b"ow-30")
        .timed(0, 20, b"ow-20")
}

fn nether() -> ContainerBuilder {
    ContainerBuilder::new()
        .action(TICK)
        .action(PACKET)
        .snapshot(&[0xBB; 8])
        .timed(1, 15, b"ne-15")
        .timed(0, 25, b"ne-25")
}

struct Fixture {
    dir: TempDir,
    base: PathBuf,
    incoming: PathBuf,
}

impl Fixture {
    fn new(base: ArchiveBuilder, incoming: ArchiveBuilder) -> Self {
        let dir = TempDir::new().unwrap();
        let base_path = dir.path().join("overworld.zip");
        let incoming_path = dir.path().join("nether.zip");
        base.write_to(&base_path).unwrap();
        incoming.write_to(&incoming_path).unwrap();
        Self {
            dir,
            base: base_path,
            incoming: incoming_path,
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("merged.zip")
    }

    fn config(&self) -> MergeConfig {
        MergeConfig::new(
            &self.base,
            &self.incoming,
            self.output(),
            "overworld",
            "nether",
        )
    }
}

fn standard() -> Fixture {
    Fixture::new(
        ArchiveBuilder::new()
            .metadata(&json!({
                "name": "Speedrun",
                "description": "Any%",
                "dimensions": ["minecraft:overworld"],
            }))
            .icon(b"PNGDATA")
            .chunk_cache("0", &[1, 2, 3])
            .container("replay.flbh", &overworld()),
        ArchiveBuilder::new()
            .metadata(&json!({
                "name": "Speedrun nether",
                "description": "other",
                "dimensions": ["minecraft:the_nether"],
            }))
            .chunk_cache("0", &[9, 9])
            .chunk_cache("1", &[8])
            .container("replay.flbh", &nether()),
    )
}

#[test]
fn events_interleave_by_game_time() {
    let fx = standard();
    let report = merge_replays(&fx.config()).unwrap();
    assert_eq!(report.merged_events, 5);
    assert_eq!(report.base.events, 3);
    assert_eq!(report.incoming.events, 2);
    assert_eq!(report.breakpoints, vec![20]);

    let entries = read_archive(&fx.output()).unwrap();
    let container = Container::decode(&archive_entry(&entries, "replay.flbh").unwrap()).unwrap();

    let times: Vec<i64> = container
        .records()
        .map(|r| r.unwrap().game_time())
        .collect();
    assert_eq!(times, vec![10, 15, 20, 25, 30]);

    let expected: Vec<u8> = [
        record(0, &timed_payload(10, b"ow-10")),
        record(1, &timed_payload(15, b"ne-15")),
        record(0, &timed_payload(20, b"ow-20")),
        record(0, &timed_payload(25, b"ne-25")),
        record(1, &timed_payload(30, b"ow-30")),
    ]
    .concat();
    assert_eq!(container.events, expected);
}

#[test]
fn output_keeps_base_header() {
    let fx = standard();
    merge_replays(&fx.config()).unwrap();

    let entries = read_archive(&fx.output()).unwrap();
    let bytes = archive_entry(&entries, "replay.flbh").unwrap();
    assert!(bytes.starts_with(&overworld().header_bytes()));
}

#[test]
fn metadata_is_merged() {
    let fx = standard();
    merge_replays(&fx.config()).unwrap();

    let entries = read_archive(&fx.output()).unwrap();
    let meta: Value = serde_json::from_slice(&archive_entry(&entries, "metadata.json").unwrap())
        .unwrap();
    assert_eq!(
        meta,
        json!({
            "name": "Speedrun",
            "description": "Any% (merged replay)",
            "dimensions": ["minecraft:overworld", "minecraft:the_nether"],
        })
    );
}

#[test]
fn icon_and_chunk_caches_come_from_base() {
    let fx = standard();
    let report = merge_replays(&fx.config()).unwrap();
    assert!(report.icon_copied);
    assert_eq!(report.chunk_caches_copied, 1);
    assert_eq!(report.chunk_caches_dropped, 2);

    let entries = read_archive(&fx.output()).unwrap();
    let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "metadata.json",
            "icon.png",
            "level_chunk_caches/0",
            "replay.flbh"
        ]
    );
    assert_eq!(archive_entry(&entries, "icon.png"), Some(b"PNGDATA".to_vec()));
    assert_eq!(
        archive_entry(&entries, "level_chunk_caches/0"),
        Some(vec![1, 2, 3])
    );
}

#[test]
fn split_containers_are_all_read() {
    let part2 = ContainerBuilder::new().action(TICK).timed(0, 40, b"ow-40");
    let fx = Fixture::new(
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &overworld())
            .entry("readme.txt", b"not a container".to_vec())
            .container("replay-part2.flbh", &part2),
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &nether()),
    );
    let report = merge_replays(&fx.config()).unwrap();
    assert_eq!(report.base.containers, 2);
    assert_eq!(report.merged_events, 6);
    assert_eq!(report.base.max_time, Some(40));
}

#[test]
fn damaged_tail_keeps_earlier_events() {
    let damaged = nether().raw(vec![0x00, 0x00, 0x00, 0x00, 0x7F, 0x01]);
    let fx = Fixture::new(
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &overworld()),
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &damaged),
    );
    let report = merge_replays(&fx.config()).unwrap();
    assert_eq!(report.incoming.events, 2);
    assert_eq!(report.incoming.warnings.len(), 1);
    assert_eq!(report.merged_events, 5);
}

#[test]
fn missing_metadata_fails_without_output() {
    let fx = Fixture::new(
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &overworld()),
        ArchiveBuilder::new().container("replay.flbh", &nether()),
    );
    let err = merge_replays(&fx.config()).unwrap_err();
    match err {
        MergeError::MissingMetadata { path } => assert_eq!(path, fx.incoming),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fx.output().exists());
}

#[test]
fn bad_container_header_is_fatal() {
    let mut broken = b"FLBH".to_vec();
    broken.extend_from_slice(&[0xFF; 8]);
    let fx = Fixture::new(
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .entry("replay.flbh", broken),
        ArchiveBuilder::new()
            .metadata(&json!({}))
            .container("replay.flbh", &nether()),
    );
    let err = merge_replays(&fx.config()).unwrap_err();
    assert!(matches!(err, MergeError::Format { ref entry, .. } if entry == "replay.flbh"));
    assert!(!fx.output().exists());
}

#[test]
fn existing_output_is_replaced_only_on_success() {
    let fx = standard();
    std::fs::write(fx.output(), b"previous").unwrap();

    let mut bad = fx.config();
    bad.incoming = fx.dir.path().join("absent.zip");
    assert!(merge_replays(&bad).is_err());
    assert_eq!(std::fs::read(fx.output()).unwrap(), b"previous");

    merge_replays(&fx.config()).unwrap();
    assert!(read_archive(&fx.output()).is_ok());
}

#[test]
fn merging_a_replay_with_itself_duplicates_events() {
    let fx = standard();
    let mut cfg = fx.config();
    cfg.incoming = fx.base.clone();
    let report = merge_replays(&cfg).unwrap();
    assert_eq!(report.merged_events, 6);
    assert_eq!(report.registry_divergence, None);

    let entries = read_archive(&fx.output()).unwrap();
    let container = Container::decode(&archive_entry(&entries, "replay.flbh").unwrap()).unwrap();
    let times: Vec<i64> = container
        .records()
        .map(|r| r.unwrap().game_time())
        .collect();
    assert_eq!(times, vec![10, 10, 20, 20, 30, 30]);
}

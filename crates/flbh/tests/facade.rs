//! The facade exposes the merge pipeline end to end.

use flbh::prelude::*;
use flbh_test_utils::{ArchiveBuilder, ContainerBuilder, TempDir};
use serde_json::json;

#[test]
fn merge_through_facade() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.zip");
    let b = dir.path().join("b.zip");
    let out = dir.path().join("out.zip");

    ArchiveBuilder::new()
        .metadata(&json!({"description": "run"}))
        .container(
            "replay.flbh",
            &ContainerBuilder::new().action("tick").timed(0, 2, b"a"),
        )
        .write_to(&a)
        .unwrap();
    ArchiveBuilder::new()
        .metadata(&json!({}))
        .container(
            "replay.flbh",
            &ContainerBuilder::new().action("tick").timed(0, 1, b"b"),
        )
        .write_to(&b)
        .unwrap();

    let report = merge_replays(&MergeConfig::new(&a, &b, &out, "A", "B")).unwrap();
    assert_eq!(report.merged_events, 2);
    assert_eq!(report.output(), out.as_path());
}

//! Chronological scheduling of events from several sources.
//!
//! [`schedule`] stable-sorts events by game time and keeps the per-source
//! bookkeeping (time ranges, breakpoints, bucket tallies) used for
//! diagnostics. Breakpoints never change which events are emitted: every
//! timestamped event is checked against its own source's range, which it
//! always lies within.

use std::io::{self, Write};

use flbh_replay::{ReplayEvent, TimeRange};
use indexmap::IndexMap;

/// Interior cut points that split the global time span into equal buckets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Breakpoints(Vec<i64>);

impl Breakpoints {
    /// `N - 1` evenly spaced cut points over the union of `ranges`,
    /// where `N` is the number of ranges. Fewer than two ranges give none.
    ///
    /// The interval is `(max - min) / N` with integer division, computed in
    /// `i128` so extreme timestamps cannot overflow.
    pub fn compute<'a>(ranges: impl IntoIterator<Item = &'a TimeRange>) -> Self {
        let ranges: Vec<&TimeRange> = ranges.into_iter().collect();
        let n = ranges.len();
        if n <= 1 {
            return Self::default();
        }
        let global = ranges[1..].iter().fold(*ranges[0], |acc, r| acc.union(r));
        let min = global.min as i128;
        let interval = (global.max as i128 - min) / n as i128;
        Self(
            (1..n as i128)
                .map(|i| (min + i * interval) as i64)
                .collect(),
        )
    }

    /// Cut points in ascending order.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Number of cut points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no cut points.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bucket index of `t`: the number of cut points at or below `t`.
    pub fn bucket_of(&self, t: i64) -> usize {
        self.0.partition_point(|&bp| bp <= t)
    }
}

/// Outcome of [`schedule`]: the ordered events plus diagnostics.
#[derive(Clone, Debug)]
pub struct MergePlan {
    included: Vec<ReplayEvent>,
    excluded: usize,
    time_ranges: IndexMap<String, TimeRange>,
    breakpoints: Breakpoints,
    bucket_counts: Vec<usize>,
}

impl MergePlan {
    /// Events in output order.
    pub fn included(&self) -> &[ReplayEvent] {
        &self.included
    }

    /// Timestamped events that fell outside their source's range.
    pub fn excluded_count(&self) -> usize {
        self.excluded
    }

    /// Per-source span of timestamped events, in first-seen source order.
    pub fn time_ranges(&self) -> &IndexMap<String, TimeRange> {
        &self.time_ranges
    }

    /// Cut points over the global span.
    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Timestamped events per bucket; `breakpoints().len() + 1` entries.
    pub fn bucket_counts(&self) -> &[usize] {
        &self.bucket_counts
    }

    /// Number of events in the plan.
    pub fn len(&self) -> usize {
        self.included.len()
    }

    /// Whether the plan has no events.
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// Write the raw bytes of every included event, in order.
    /// Returns the number of bytes written.
    pub fn write_stream(&self, w: &mut dyn Write) -> io::Result<u64> {
        let mut written = 0u64;
        for event in &self.included {
            w.write_all(&event.raw)?;
            written += event.raw.len() as u64;
        }
        Ok(written)
    }

    /// The merged event stream as one buffer.
    pub fn stream_bytes(&self) -> Vec<u8> {
        let total = self.included.iter().map(|e| e.raw.len()).sum();
        let mut out = Vec::with_capacity(total);
        for event in &self.included {
            out.extend_from_slice(&event.raw);
        }
        out
    }

    /// Consume the plan, yielding the ordered events.
    pub fn into_events(self) -> Vec<ReplayEvent> {
        self.included
    }
}

/// Order `events` by game time.
///
/// `events` is expected in concatenation order (all of the base source,
/// then the incoming source). The sort is stable, so ties and sentinel
/// events keep that relative order.
pub fn schedule(mut events: Vec<ReplayEvent>) -> MergePlan {
    let mut time_ranges: IndexMap<String, TimeRange> = IndexMap::new();
    for e in events.iter().filter(|e| e.has_timestamp()) {
        time_ranges
            .entry(e.source.clone())
            .and_modify(|r| r.include(e.game_time))
            .or_insert_with(|| TimeRange::at(e.game_time));
    }

    events.sort_by_key(|e| e.game_time);

    let breakpoints = Breakpoints::compute(time_ranges.values());
    let mut bucket_counts = vec![0usize; breakpoints.len() + 1];
    let mut included = Vec::with_capacity(events.len());
    let mut excluded = 0usize;

    for event in events {
        if event.has_timestamp() {
            bucket_counts[breakpoints.bucket_of(event.game_time)] += 1;
            let in_range = time_ranges
                .get(&event.source)
                .is_some_and(|r| r.contains(event.game_time));
            if !in_range {
                excluded += 1;
                continue;
            }
        }
        included.push(event);
    }

    tracing::debug!(
        events = included.len(),
        sources = time_ranges.len(),
        breakpoints = ?breakpoints.as_slice(),
        "scheduled merge"
    );

    MergePlan {
        included,
        excluded,
        time_ranges,
        breakpoints,
        bucket_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flbh_replay::NO_TIMESTAMP;
    use proptest::prelude::*;

    fn ev(source: &str, t: i64, tag: u8) -> ReplayEvent {
        ReplayEvent {
            game_time: t,
            source: source.to_owned(),
            raw: vec![tag, t as u8],
        }
    }

    fn times(plan: &MergePlan) -> Vec<i64> {
        plan.included().iter().map(|e| e.game_time).collect()
    }

    #[test]
    fn interleaves_two_sources() {
        let events = vec![
            ev("overworld", 10, 1),
            ev("overworld", 30, 2),
            ev("overworld", 20, 3),
            ev("nether", 15, 4),
            ev("nether", 25, 5),
        ];
        let plan = schedule(events);
        assert_eq!(times(&plan), vec![10, 15, 20, 25, 30]);
        assert_eq!(plan.excluded_count(), 0);

        let sources: Vec<_> = plan.time_ranges().keys().cloned().collect();
        assert_eq!(sources, vec!["overworld", "nether"]);
        assert_eq!(plan.time_ranges()["overworld"], TimeRange { min: 10, max: 30 });
        assert_eq!(plan.time_ranges()["nether"], TimeRange { min: 15, max: 25 });
    }

    #[test]
    fn ties_keep_concatenation_order() {
        let plan = schedule(vec![ev("a", 5, 1), ev("a", 5, 2), ev("b", 5, 3)]);
        let tags: Vec<_> = plan.included().iter().map(|e| e.raw[0]).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn sentinels_sort_to_zero_and_are_kept() {
        let plan = schedule(vec![
            ev("a", 10, 1),
            ev("a", NO_TIMESTAMP, 2),
            ev("b", -5, 3),
            ev("b", NO_TIMESTAMP, 4),
        ]);
        let tags: Vec<_> = plan.included().iter().map(|e| e.raw[0]).collect();
        assert_eq!(tags, vec![3, 2, 4, 1]);
        assert_eq!(plan.time_ranges()["a"], TimeRange::at(10));
    }

    #[test]
    fn sentinel_only_source_has_no_range() {
        let plan = schedule(vec![ev("a", 3, 1), ev("b", NO_TIMESTAMP, 2)]);
        assert_eq!(plan.len(), 2);
        assert!(!plan.time_ranges().contains_key("b"));
        assert!(plan.breakpoints().is_empty());
    }

    #[test]
    fn breakpoints_split_global_span() {
        let ranges = [
            TimeRange { min: 10, max: 30 },
            TimeRange { min: 15, max: 25 },
        ];
        let bp = Breakpoints::compute(&ranges);
        assert_eq!(bp.as_slice(), &[20]);
        assert_eq!(bp.bucket_of(19), 0);
        assert_eq!(bp.bucket_of(20), 1);
        assert_eq!(bp.bucket_of(30), 1);

        let three = [
            TimeRange { min: 0, max: 10 },
            TimeRange { min: 50, max: 90 },
            TimeRange { min: 7, max: 8 },
        ];
        assert_eq!(Breakpoints::compute(&three).as_slice(), &[30, 60]);
    }

    #[test]
    fn breakpoints_survive_extreme_timestamps() {
        let ranges = [TimeRange::at(i64::MIN + 1), TimeRange::at(i64::MAX)];
        let bp = Breakpoints::compute(&ranges);
        assert_eq!(bp.len(), 1);
        assert!(bp.as_slice()[0] > i64::MIN && bp.as_slice()[0] < i64::MAX);
    }

    #[test]
    fn bucket_counts_cover_timestamped_events() {
        let plan = schedule(vec![
            ev("a", 10, 0),
            ev("a", 30, 0),
            ev("b", 15, 0),
            ev("b", 25, 0),
            ev("b", NO_TIMESTAMP, 0),
        ]);
        assert_eq!(plan.bucket_counts(), &[2, 2]);
    }

    #[test]
    fn stream_is_concatenated_raw_bytes() {
        let plan = schedule(vec![ev("a", 2, 7), ev("b", 1, 9)]);
        assert_eq!(plan.stream_bytes(), vec![9, 1, 7, 2]);

        let mut out = Vec::new();
        assert_eq!(plan.write_stream(&mut out).unwrap(), 4);
        assert_eq!(out, plan.stream_bytes());
    }

    #[test]
    fn empty_input() {
        let plan = schedule(Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.bucket_counts(), &[0]);
    }

    proptest! {
        #[test]
        fn output_is_sorted_permutation(
            a in prop::collection::vec(-1000i64..1000, 0..50),
            b in prop::collection::vec(-1000i64..1000, 0..50),
        ) {
            let mut events: Vec<_> = a.iter().map(|&t| ev("a", t, 0)).collect();
            events.extend(b.iter().map(|&t| ev("b", t, 1)));
            let n = events.len();

            let plan = schedule(events);
            prop_assert_eq!(plan.len(), n);
            prop_assert_eq!(plan.excluded_count(), 0);
            let t = times(&plan);
            prop_assert!(t.windows(2).all(|w| w[0] <= w[1]));

            let mut expected: Vec<i64> = a.iter().chain(&b).copied().collect();
            expected.sort();
            prop_assert_eq!(t, expected);
        }
    }
}

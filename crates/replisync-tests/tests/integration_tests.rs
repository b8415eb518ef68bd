//! Integration tests for replisync
//!
//! These drive complete runs through `SyncEngine` against real directory
//! trees and check the replica, the counters, and the audit log.

use proptest::prelude::*;
use replisync_sync::{PeriodicScheduler, SyncEngine, SyncOptions, SyncRun};
use replisync_tests::test_utils::{
    generate_test_data, tree_files, tree_paths, write_tree, SyncFixture, TestDataPattern,
};
use replisync_types::{Error, HashAlgorithm, Result, RunSummary, SyncInterval};
use rstest::rstest;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn run(engine: &mut SyncEngine) -> RunSummary {
    engine
        .run_once(&CancellationToken::new())
        .await
        .expect("run failed")
}

fn assert_mirrored(fixture: &SyncFixture) {
    let source = tree_files(&fixture.source);
    let replica = tree_files(&fixture.replica);
    assert_eq!(source, replica, "replica files differ from source");

    let source_paths = tree_paths(&fixture.source);
    for path in tree_paths(&fixture.replica) {
        assert!(
            source_paths.contains(&path),
            "orphan left in replica: {}",
            path.display()
        );
    }
}

fn is_timestamped(line: &str) -> bool {
    let bytes = line.as_bytes();
    line.len() > 22
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b' '
        && bytes[13] == b':'
        && bytes[16] == b':'
        && &line[19..22] == " - "
        && line[..19]
            .chars()
            .filter(|c| c.is_ascii_digit())
            .count()
            == 14
}

#[tokio::test]
async fn test_copy_into_empty_replica() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(
        (summary.copied, summary.removed, summary.identical),
        (1, 0, 0)
    );
    assert_eq!(fs::read_to_string(fixture.replica.join("a.txt")).unwrap(), "hi");
}

#[tokio::test]
async fn test_stale_file_removed_identical_skipped() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    fixture.write_replica(&[("a.txt", "hi"), ("b.txt", "x")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(
        (summary.copied, summary.removed, summary.identical),
        (0, 1, 1)
    );
    assert!(!fixture.replica.join("b.txt").exists());
    assert_mirrored(&fixture);
}

#[tokio::test]
async fn test_changed_content_is_overwritten() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("dir/a.txt", "v2")]);
    fixture.write_replica(&[("dir/a.txt", "v1")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.identical, 0);
    assert_eq!(
        fs::read_to_string(fixture.replica.join("dir/a.txt")).unwrap(),
        "v2"
    );
}

#[tokio::test]
async fn test_emptied_directory_removed_in_same_run() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("keep.txt", "k")]);
    fixture.write_replica(&[("keep.txt", "k"), ("gone/deeper/only.txt", "x")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.directories_removed, 2);
    assert!(!fixture.replica.join("gone").exists());
    assert_mirrored(&fixture);
}

#[tokio::test]
async fn test_second_run_only_skips() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[
        ("a.txt", generate_test_data(20_000, TestDataPattern::Random)),
        ("x/y/z.bin", generate_test_data(4096, TestDataPattern::Realistic)),
        ("x/empty.bin", Vec::new()),
    ]);
    fixture.write_replica(&[("stale/file.txt", b"old".to_vec())]);
    let (mut engine, _) = fixture.engine();

    run(&mut engine).await;
    let second = run(&mut engine).await;

    assert!(second.is_noop());
    assert_eq!(second.identical, 3);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn test_counters_match_tree_sizes() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[
        ("same.txt", "s"),
        ("changed.txt", "new"),
        ("added/one.txt", "1"),
        ("added/two.txt", "2"),
    ]);
    fixture.write_replica(&[
        ("same.txt", "s"),
        ("changed.txt", "old"),
        ("extra.txt", "e"),
        ("old/a.txt", "a"),
        ("old/b.txt", "b"),
    ]);
    let source_files = tree_files(&fixture.source).len() as u64;
    let replica_only = tree_files(&fixture.replica)
        .keys()
        .filter(|p| !fixture.source.join(p).exists())
        .count() as u64;
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.copied + summary.identical, source_files);
    assert_eq!(summary.removed, replica_only);
    assert_eq!(summary.copied, 3);
    assert_eq!(summary.identical, 1);
    assert_mirrored(&fixture);
}

#[tokio::test]
async fn test_file_and_directory_swap() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("node/inner.txt", "i"), ("leaf", "l")]);
    fixture.write_replica(&[("node", "was a file"), ("leaf/child.txt", "c")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.failed, 0);
    assert!(fixture.replica.join("node").is_dir());
    assert!(fixture.replica.join("leaf").is_file());
    assert_mirrored(&fixture);
}

#[tokio::test]
async fn test_audit_log_format() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi"), ("same.txt", "s")]);
    fixture.write_replica(&[("same.txt", "s"), ("b.txt", "x")]);
    let (mut engine, output) = fixture.engine();
    let source = engine.params().source.clone();
    let replica = engine.params().replica.clone();

    run(&mut engine).await;

    let log = fixture.log();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[..3].iter().all(|l| is_timestamped(l)));
    assert!(lines[0].ends_with(&format!(
        "{} removed from replica folder",
        replica.join("b.txt").display()
    )));
    assert!(lines[1].ends_with(&format!(
        "{} copied to replica folder",
        source.join("a.txt").display()
    )));
    assert!(lines[2].ends_with(&format!(
        "{} already exists in replica folder and is identical",
        source.join("same.txt").display()
    )));
    assert_eq!(
        &lines[3..],
        &["Files copied - 1", "Files removed - 1", "Files unaltered - 1"]
    );

    let mirrored: Vec<String> = output.contents().lines().map(String::from).collect();
    assert_eq!(mirrored.len(), 6);
    assert!(lines[..3]
        .iter()
        .zip(&mirrored[..3])
        .all(|(line, message)| line.ends_with(message.as_str())));
}

#[tokio::test]
async fn test_log_accumulates_across_runs() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    let (mut engine, _) = fixture.engine();

    run(&mut engine).await;
    let after_first = fixture.log();
    run(&mut engine).await;
    let after_second = fixture.log();

    assert!(after_second.starts_with(&after_first));
    assert_eq!(after_second.matches("Files copied - ").count(), 2);
}

#[rstest]
#[case(HashAlgorithm::Blake3, true)]
#[case(HashAlgorithm::Blake3, false)]
#[case(HashAlgorithm::Xxh3, true)]
#[case(HashAlgorithm::Xxh3, false)]
#[tokio::test]
async fn test_option_combinations_mirror(
    #[case] algorithm: HashAlgorithm,
    #[case] staged_copy: bool,
) {
    let fixture = SyncFixture::new();
    fixture.write_source(&[
        ("a.bin", generate_test_data(70_000, TestDataPattern::Random)),
        ("d/b.bin", generate_test_data(100, TestDataPattern::Zeros)),
    ]);
    fixture.write_replica(&[("a.bin", generate_test_data(70_000, TestDataPattern::Zeros))]);
    let options = SyncOptions {
        algorithm,
        staged_copy,
        ..SyncOptions::default()
    };
    let (mut engine, _) = fixture.engine_with(options);

    let summary = run(&mut engine).await;

    assert_eq!(summary.copied, 2);
    assert_mirrored(&fixture);
    assert!(run(&mut engine).await.is_noop());
}

#[tokio::test]
async fn test_cancelled_before_start_leaves_replica_alone() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    fixture.write_replica(&[("b.txt", "x")]);
    let (mut engine, _) = fixture.engine();
    let token = CancellationToken::new();
    token.cancel();

    let result = engine.run_once(&token).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(fixture.replica.join("b.txt").exists());
    assert!(!fixture.replica.join("a.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_source_symlink_is_skipped_and_protected() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("real.txt", "r")]);
    std::os::unix::fs::symlink(
        fixture.source.join("real.txt"),
        fixture.source.join("link.txt"),
    )
    .unwrap();
    fixture.write_replica(&[("link.txt", "kept")]);
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.removed, 0);
    assert_eq!(
        fs::read_to_string(fixture.replica.join("link.txt")).unwrap(),
        "kept"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_replica_symlink_is_replaced_not_followed() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "source")]);
    let outside = fixture.root().join("outside.txt");
    fs::write(&outside, "untouched").unwrap();
    std::os::unix::fs::symlink(&outside, fixture.replica.join("a.txt")).unwrap();
    let (mut engine, _) = fixture.engine();

    let summary = run(&mut engine).await;

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.copied, 1);
    assert_eq!(fs::read_to_string(&outside).unwrap(), "untouched");
    assert!(!fs::symlink_metadata(fixture.replica.join("a.txt"))
        .unwrap()
        .file_type()
        .is_symlink());
}

/// Edits the source after each run so the next run has work to do
struct ChangingSource<'a> {
    engine: SyncEngine,
    source: &'a Path,
    summaries: Vec<RunSummary>,
}

impl SyncRun for ChangingSource<'_> {
    async fn run(&mut self, token: &CancellationToken) -> Result<RunSummary> {
        let summary = self.engine.run_once(token).await?;
        self.summaries.push(summary.clone());
        let n = self.summaries.len();
        write_tree(self.source, &[(format!("run{}.txt", n).as_str(), "new")]);
        Ok(summary)
    }
}

#[tokio::test]
async fn test_periodic_runs_pick_up_changes() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    let (engine, _) = fixture.engine();
    let mut target = ChangingSource {
        engine,
        source: &fixture.source,
        summaries: Vec::new(),
    };

    let interval = SyncInterval::from_secs(1).unwrap();
    let report = PeriodicScheduler::new(interval, CancellationToken::new())
        .with_max_runs(3)
        .start(&mut target)
        .await;

    assert_eq!(report.runs, 3);
    assert_eq!(report.failed_runs, 0);
    let copied: Vec<u64> = target.summaries.iter().map(|s| s.copied).collect();
    assert_eq!(copied, vec![1, 1, 1]);
    assert!(fixture.replica.join("run2.txt").exists());
}

#[tokio::test]
async fn test_run_periodic_stops_on_cancel() {
    let fixture = SyncFixture::new();
    fixture.write_source(&[("a.txt", "hi")]);
    let (mut engine, _) = fixture.engine();
    let token = CancellationToken::new();

    let canceller = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            token.cancel();
        }
    });
    let report = tokio::time::timeout(Duration::from_secs(10), engine.run_periodic(token))
        .await
        .expect("scheduler did not stop");
    canceller.await.unwrap();

    assert!(report.stopped_by_cancel);
    assert!(report.runs >= 1);
    assert!(fixture.replica.join("a.txt").exists());
}

fn tree_strategy(min: usize) -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "[a-c]{1,2}(/[a-c]{1,2}){0,2}\\.txt",
        prop::collection::vec(any::<u8>(), 0..64),
        min..8,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_any_trees_converge(source in tree_strategy(1), replica in tree_strategy(0)) {
        let fixture = SyncFixture::new();
        let source_files: Vec<(&str, &Vec<u8>)> =
            source.iter().map(|(p, c)| (p.as_str(), c)).collect();
        let replica_files: Vec<(&str, &Vec<u8>)> =
            replica.iter().map(|(p, c)| (p.as_str(), c)).collect();
        fixture.write_source(&source_files);
        fixture.write_replica(&replica_files);

        let replica_only = replica.keys().filter(|p| !source.contains_key(*p)).count() as u64;
        let (mut engine, _) = fixture.engine();
        let (first, second) = tokio_test::block_on(async {
            let first = run(&mut engine).await;
            let second = run(&mut engine).await;
            (first, second)
        });

        prop_assert_eq!(first.copied + first.identical, source.len() as u64);
        prop_assert_eq!(first.removed, replica_only);
        prop_assert_eq!(first.failed, 0);
        prop_assert!(second.is_noop());
        prop_assert_eq!(second.identical, source.len() as u64);

        let mirrored: BTreeMap<PathBuf, Vec<u8>> = source
            .iter()
            .map(|(p, c)| (PathBuf::from(p), c.clone()))
            .collect();
        prop_assert_eq!(tree_files(&fixture.replica), mirrored);
        let source_paths = tree_paths(&fixture.source);
        prop_assert!(tree_paths(&fixture.replica).iter().all(|p| source_paths.contains(p)));
    }
}

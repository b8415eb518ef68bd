//! Fixture helpers for end-to-end sync tests

use replisync_config::SyncParams;
use replisync_sync::{SyncEngine, SyncOptions};
use replisync_types::SyncInterval;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros
    Zeros,
    /// Deterministic pseudo-random bytes
    Random,
    /// Repeating structured bytes
    Realistic,
}

/// Generate test data with specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Random => {
            let mut state = 0x2545_f491_4f6c_dd1d_u64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 24) as u8
                })
                .collect()
        }
        TestDataPattern::Realistic => (0..size).map(|i| ((i * 7 + 13) % 256) as u8).collect(),
    }
}

/// Console stand-in that keeps everything the audit log mirrors
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A source tree, a replica tree, and a log file side by side in one
/// temporary directory
pub struct SyncFixture {
    root: TempDir,
    /// Source root
    pub source: PathBuf,
    /// Replica root
    pub replica: PathBuf,
    /// Audit log location
    pub log_file: PathBuf,
}

impl SyncFixture {
    /// Empty source and replica folders
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let source = root.path().join("source");
        let replica = root.path().join("replica");
        fs::create_dir_all(&source).expect("Failed to create source");
        fs::create_dir_all(&replica).expect("Failed to create replica");
        let log_file = root.path().join("log.txt");
        Self {
            root,
            source,
            replica,
            log_file,
        }
    }

    /// Directory holding both trees and the log
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write files below the source root
    pub fn write_source<C: AsRef<[u8]>>(&self, files: &[(&str, C)]) {
        write_tree(&self.source, files);
    }

    /// Write files below the replica root
    pub fn write_replica<C: AsRef<[u8]>>(&self, files: &[(&str, C)]) {
        write_tree(&self.replica, files);
    }

    /// Validated parameters for this layout
    pub fn params(&self, interval_secs: u64) -> SyncParams {
        let interval = SyncInterval::from_secs(interval_secs).expect("Invalid interval");
        SyncParams::validate(&self.source, &self.replica, &self.log_file, interval)
            .expect("Invalid fixture parameters")
    }

    /// Engine with default options, mirroring to a captured buffer
    pub fn engine(&self) -> (SyncEngine, CapturedOutput) {
        self.engine_with(SyncOptions::default())
    }

    /// Engine with the given options, mirroring to a captured buffer
    pub fn engine_with(&self, options: SyncOptions) -> (SyncEngine, CapturedOutput) {
        let output = CapturedOutput::default();
        let engine = SyncEngine::new(self.params(1), options).with_mirror(Box::new(output.clone()));
        (engine, output)
    }

    /// Contents of the audit log, empty if nothing was written yet
    pub fn log(&self) -> String {
        fs::read_to_string(&self.log_file).unwrap_or_default()
    }
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `files` (relative path, content) below `root`, creating parents
pub fn write_tree<C: AsRef<[u8]>>(root: &Path, files: &[(&str, C)]) {
    for (path, content) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent");
        }
        fs::write(&path, content).expect("Failed to write test file");
    }
}

/// Regular files below `root`, keyed by relative path
pub fn tree_files(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry outside root")
                .to_path_buf();
            let content = fs::read(entry.path()).expect("Failed to read file");
            (relative, content)
        })
        .collect()
}

/// Every entry below `root`, files and directories, as relative paths
pub fn tree_paths(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .expect("entry outside root")
                .to_path_buf()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_test_data_patterns() {
        let zeros = generate_test_data(1024, TestDataPattern::Zeros);
        assert!(zeros.iter().all(|&b| b == 0));

        let random = generate_test_data(1024, TestDataPattern::Random);
        assert_eq!(random, generate_test_data(1024, TestDataPattern::Random));
        assert_ne!(random, zeros);

        assert_eq!(generate_test_data(10, TestDataPattern::Realistic).len(), 10);
    }

    #[test]
    fn test_tree_helpers() {
        let fixture = SyncFixture::new();
        fixture.write_source(&[("a.txt", "a"), ("d/b.txt", "b")]);

        let files = tree_files(&fixture.source);
        assert_eq!(files.len(), 2);
        assert_eq!(files[Path::new("d/b.txt")], b"b");

        let paths = tree_paths(&fixture.source);
        assert!(paths.contains(Path::new("d")));
        assert_eq!(paths.len(), 3);
    }
}

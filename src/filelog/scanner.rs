//! Directory scanner for rotated log files
//!
//! Files are named `<prefix>.<index>` where index is a non-negative
//! integer. Anything else in the directory is ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A rotated log file seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub index: u64,
    pub path: PathBuf,
    /// Size in bytes at scan time
    pub size: u64,
}

/// Snapshot of the rotated files in a directory
///
/// Built fresh for every rotation decision; never cached.
#[derive(Debug, Clone, Default)]
pub struct LogFileIndex {
    entries: BTreeMap<u64, LogFileEntry>,
}

impl LogFileIndex {
    /// Scan `dir` for files named `<prefix>.<index>`
    pub fn scan(dir: &Path, prefix: &str) -> io::Result<Self> {
        let mut entries = BTreeMap::new();

        for dirent in fs::read_dir(dir)? {
            let dirent = dirent?;
            let name = dirent.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(index) = parse_index(name, prefix) else {
                continue;
            };
            let metadata = match dirent.metadata() {
                Ok(m) if m.is_file() => m,
                // Directory named like a log file, or removed mid-scan
                _ => continue,
            };
            entries.insert(
                index,
                LogFileEntry {
                    index,
                    path: dirent.path(),
                    size: metadata.len(),
                },
            );
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry with the highest index
    pub fn newest(&self) -> Option<&LogFileEntry> {
        self.entries.values().next_back()
    }

    /// Entries ordered from most recent (highest index) to oldest
    pub fn newest_first(&self) -> impl Iterator<Item = &LogFileEntry> {
        self.entries.values().rev()
    }

    pub fn get(&self, index: u64) -> Option<&LogFileEntry> {
        self.entries.get(&index)
    }

    /// Combined size of every scanned file
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

/// Build the file name for a rotation index
pub fn log_file_name(prefix: &str, index: u64) -> String {
    format!("{}.{}", prefix, index)
}

/// Extract the index from `<prefix>.<digits>`
///
/// Indices beyond `u32::MAX` are treated like malformed names, so the
/// next index always fits.
fn parse_index(name: &str, prefix: &str) -> Option<u64> {
    let suffix = name.strip_prefix(prefix)?.strip_prefix('.')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u32>().ok().map(u64::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, len: usize) {
        fs::write(dir.join(name), vec![b'x'; len]).unwrap();
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("log.0", "log"), Some(0));
        assert_eq!(parse_index("log.42", "log"), Some(42));
        assert_eq!(parse_index("log.007", "log"), Some(7));

        assert_eq!(parse_index("log.", "log"), None);
        assert_eq!(parse_index("log", "log"), None);
        assert_eq!(parse_index("log.x", "log"), None);
        assert_eq!(parse_index("log.-1", "log"), None);
        assert_eq!(parse_index("log.+1", "log"), None);
        assert_eq!(parse_index("log.1.bak", "log"), None);
        assert_eq!(parse_index("logs.1", "log"), None);
        assert_eq!(parse_index("other.1", "log"), None);
    }

    #[test]
    fn test_parse_index_overflow_ignored() {
        assert_eq!(parse_index("log.99999999999999999999999", "log"), None);
        assert_eq!(parse_index("log.18446744073709551615", "log"), None);
        assert_eq!(parse_index("log.4294967296", "log"), None);
        assert_eq!(parse_index("log.4294967295", "log"), Some(u32::MAX as u64));
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(log_file_name("twinelog", 3), "twinelog.3");
    }

    #[test]
    fn test_scan_orders_newest_first() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "log.0", 10);
        touch(tmp.path(), "log.2", 30);
        touch(tmp.path(), "log.1", 20);
        touch(tmp.path(), "log.txt", 5);
        touch(tmp.path(), "other.5", 5);

        let index = LogFileIndex::scan(tmp.path(), "log").unwrap();
        assert_eq!(index.len(), 3);

        let order: Vec<u64> = index.newest_first().map(|e| e.index).collect();
        assert_eq!(order, vec![2, 1, 0]);

        let newest = index.newest().unwrap();
        assert_eq!(newest.index, 2);
        assert_eq!(newest.size, 30);
        assert_eq!(index.total_size(), 60);
    }

    #[test]
    fn test_scan_skips_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("log.9")).unwrap();
        touch(tmp.path(), "log.1", 1);

        let index = LogFileIndex::scan(tmp.path(), "log").unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get(9).is_none());
    }

    #[test]
    fn test_scan_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let index = LogFileIndex::scan(tmp.path(), "log").unwrap();
        assert!(index.is_empty());
        assert!(index.newest().is_none());
    }

    #[test]
    fn test_scan_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(LogFileIndex::scan(&missing, "log").is_err());
    }
}

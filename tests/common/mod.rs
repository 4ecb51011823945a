#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Reads a CSV file back as (headers, rows) for assertions.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .expect("open csv output");
    let headers = reader
        .headers()
        .expect("csv headers")
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(|field| field.to_string())
                .collect()
        })
        .collect();
    (headers, rows)
}

/// Column accessor over the (headers, rows) pair returned by [`read_csv`].
pub fn cell<'a>(
    headers: &[String],
    row: &'a [String],
    column: &str,
) -> &'a str {
    let idx = headers
        .iter()
        .position(|h| h == column)
        .unwrap_or_else(|| panic!("column '{column}' not in output"));
    row.get(idx).map(String::as_str).unwrap_or("")
}

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use metric_frames::{Attribute, Record};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

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

pub fn record(pairs: &[(&str, Attribute)]) -> Record {
    pairs.iter().cloned().collect()
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Three samples from two series sharing `ts = 1`.
pub fn two_series_records() -> Vec<Record> {
    vec![
        record(&[
            ("ts", Attribute::from(1_i64)),
            ("series", Attribute::from("a")),
            ("val", Attribute::from(5_i64)),
        ]),
        record(&[
            ("ts", Attribute::from(1_i64)),
            ("series", Attribute::from("b")),
            ("val", Attribute::from(7_i64)),
        ]),
        record(&[
            ("ts", Attribute::from(2_i64)),
            ("series", Attribute::from("a")),
            ("val", Attribute::from(9_i64)),
        ]),
    ]
}

pub const TWO_SERIES_JSON: &str = r#"[
  {"ts": 1, "series": "a", "val": 5},
  {"ts": 1, "series": "b", "val": 7},
  {"ts": 2, "series": "a", "val": 9}
]"#;

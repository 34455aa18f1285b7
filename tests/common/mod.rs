#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use prequel::load::{Destination, LoadOptions};
use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory for input files and databases, removed on drop.
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

    /// Load options that put the database in this workspace under `db_name`.
    pub fn options(&self, db_name: &str) -> LoadOptions {
        LoadOptions {
            destination: Destination {
                directory: self.path().to_path_buf(),
                file_name: Some(db_name.to_string()),
            },
            ..LoadOptions::default()
        }
    }

    pub fn open(&self, db_name: &str) -> Connection {
        Connection::open(self.path().join(db_name)).expect("open database")
    }
}

/// Table names in the database, in creation order.
pub fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid")
        .expect("prepare table listing");
    stmt.query_map([], |row| row.get(0))
        .expect("query tables")
        .collect::<Result<Vec<String>, _>>()
        .expect("collect tables")
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}

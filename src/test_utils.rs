//! Shared test setup.

#![cfg(test)]

use crate::db::Database;
use tempfile::{tempdir, TempDir};

/// Create a throwaway database with migrations applied.
///
/// Keep the returned `TempDir` alive for the duration of the test, otherwise
/// the database file is removed underneath the worker thread.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.sqlite3");
    let db = Database::new(db_path).expect("Failed to open test database");
    (db, dir)
}

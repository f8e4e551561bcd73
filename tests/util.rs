//! Shared test utilities for integration tests
//!
//! Provides common fixture creation and helper functions
//! used across multiple test files.

#![allow(dead_code)]

use assert_cmd::Command;

use assert_fs::prelude::*;

/// Ten numbered lines: "line 1" .. "line 10"
pub fn ten_lines() -> String
{
    (1..=10)
        .map(|i| format!("line {i}\n"))
        .collect()
}

/// Temp project holding `app.py` with ten numbered lines
pub fn project() -> assert_fs::TempDir
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("app.py")
        .write_str(&ten_lines())
        .expect("write app.py");

    tmp
}

/// `gv` rooted at `dir`, colors off, environment config cleared
pub fn gv(dir: &std::path::Path) -> Command
{
    let mut cmd = Command::cargo_bin("gv").expect("bin");
    cmd.current_dir(dir)
        .env_remove("GITVISION_LOG")
        .env_remove("GITVISION_RESOLVER__MIN_CONFIDENCE")
        .arg("--no-color");
    cmd
}

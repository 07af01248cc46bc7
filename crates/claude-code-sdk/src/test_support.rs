//! Helpers shared by the in-crate subprocess tests.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tempfile::TempDir;

/// Write an executable `/bin/sh` script standing in for `claude`.
pub(crate) fn fake_cli(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("claude");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

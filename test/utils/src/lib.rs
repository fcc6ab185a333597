use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

/// Writes `size` bytes of a PDF-looking document named `name` into a fresh
/// directory. The directory is removed when the returned `TempDir` drops.
pub fn temp_document(name: &str, size: usize) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);

    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(size, b'0');
    fs::write(&path, bytes)?;

    return Ok((dir, path));
}

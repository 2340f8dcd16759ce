//! Filesystem fixtures for pipeline tests.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use zip::ZipArchive;

/// Create a fresh temporary directory whose name starts with `prefix`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir(prefix: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .context("failed to create temp dir")
}

/// Write `contents` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Materialise `(relative path, contents)` pairs under `root`.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn write_tree(root: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    for (relative, contents) in entries {
        write_file(&root.join(relative), contents)?;
    }
    Ok(())
}

/// Lay out a Bruker-style acquisition directory `name` under `root`.
///
/// # Errors
///
/// Returns an error if the tree cannot be written.
pub fn bruker_acquisition(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = root.join(name);
    write_file(&dir.join("analysis.tdf"), b"tdf-metadata")?;
    write_file(&dir.join("analysis.tdf_bin"), &[0, 1, 2, 3, 4, 5, 6, 7])?;
    write_file(&dir.join("chromatography-data.sqlite"), b"chromatography")?;
    write_file(&dir.join("method").join("acquisition.method"), b"<method/>")?;
    Ok(dir)
}

/// Read every file entry of a zip archive into memory, keyed by entry name.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or decoded.
pub fn read_zip_entries(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("failed to decode archive")?;
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context("failed to read entry")?;
        if entry.is_dir() {
            continue;
        }
        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .context("failed to read entry contents")?;
        entries.insert(entry.name().to_string(), contents);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bruker_acquisition_writes_nested_tree() -> Result<()> {
        let temp = temp_dir("rawvault-fixtures-")?;
        let dir = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        assert!(dir.join("analysis.tdf").is_file());
        assert!(dir.join("method/acquisition.method").is_file());
        Ok(())
    }
}

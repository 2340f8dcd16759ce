//! Transfer unit selection and directory packaging.
//!
//! # Design
//! - Thermo acquisitions are single files and pass through untouched.
//! - Bruker and Sciex acquisitions are directories named by extension; the
//!   first match in lexicographic order is packaged into a zip archive.
//! - Archives are written under a `.partial` name and renamed only once
//!   complete, so a leftover file never looks like a finished archive.
//! - Symlinks are followed and stored as the content they point at; anything
//!   that is neither a file nor a directory fails packaging.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use rawvault_config::InstrumentKind;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

use crate::error::{PackagingCause, PipelineError, PipelineResult};
use crate::unit::TransferUnit;

const ARCHIVE_EXTENSION: &str = "zip";
const PARTIAL_SUFFIX: &str = "partial";

/// Determine the file to move for `instrument`, packaging when required.
///
/// # Errors
///
/// Returns [`PipelineError::NotFound`] when the source or its expected
/// sub-directory is missing, and [`PipelineError::Packaging`] when the
/// archive cannot be written.
pub fn resolve_transfer_unit(
    source: &Path,
    instrument: InstrumentKind,
    staging: &Path,
) -> PipelineResult<TransferUnit> {
    let Some(extension) = instrument.package_extension() else {
        return TransferUnit::original(source);
    };
    let directory = locate_package_dir(source, extension)?;
    let archive = package_directory(&directory, staging)?;
    TransferUnit::packaged(archive)
}

/// Find the acquisition directory carrying `extension` at or under `source`.
///
/// # Errors
///
/// Returns [`PipelineError::NotFound`] if `source` is not a directory or no
/// child directory carries the extension.
pub fn locate_package_dir(source: &Path, extension: &str) -> PipelineResult<PathBuf> {
    match fs::metadata(source) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(PipelineError::not_found(source, "not_a_directory")),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PipelineError::not_found(source, "missing"));
        }
        Err(err) => return Err(PipelineError::io("package.source_metadata", source, err)),
    }

    if source
        .file_name()
        .is_some_and(|name| has_extension(&name.to_string_lossy(), extension))
    {
        return Ok(source.to_path_buf());
    }

    let entries =
        fs::read_dir(source).map_err(|err| PipelineError::io("package.read_source", source, err))?;
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io("package.read_entry", source, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry
            .file_type()
            .map_err(|err| PipelineError::io("package.entry_type", entry.path(), err))?
            .is_dir();
        if is_dir && has_extension(&name, extension) {
            matches.push(name);
        }
    }
    matches.sort();

    matches
        .first()
        .map(|name| source.join(name))
        .ok_or_else(|| PipelineError::not_found(source, "no_matching_directory"))
}

fn has_extension(name: &str, extension: &str) -> bool {
    name.len() > extension.len()
        && name
            .get(name.len() - extension.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
}

/// Package `directory` into `<staging>/<name>.zip`.
///
/// Entries are rooted at the directory's own name. Symlinks are followed.
///
/// # Errors
///
/// Returns [`PipelineError::Packaging`] on any traversal or write failure;
/// the partial archive is removed before returning.
pub fn package_directory(directory: &Path, staging: &Path) -> PipelineResult<PathBuf> {
    let name = directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::not_found(directory, "no_directory_name"))?;

    fs::create_dir_all(staging).map_err(|err| {
        PipelineError::packaging("package.create_staging", staging, PackagingCause::Io(err))
    })?;

    let archive = staging.join(format!("{name}.{ARCHIVE_EXTENSION}"));
    let partial = staging.join(format!("{name}.{ARCHIVE_EXTENSION}.{PARTIAL_SUFFIX}"));

    if let Err(err) = write_archive(directory, &name, &partial) {
        if let Err(cleanup) = fs::remove_file(&partial)
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            debug!(path = %partial.display(), error = %cleanup, "partial archive cleanup failed");
        }
        return Err(err);
    }

    fs::rename(&partial, &archive).map_err(|err| {
        PipelineError::packaging("package.rename", &archive, PackagingCause::Io(err))
    })?;
    info!(
        directory = %directory.display(),
        archive = %archive.display(),
        "packaged acquisition directory"
    );
    Ok(archive)
}

fn write_archive(directory: &Path, root_name: &str, partial: &Path) -> PipelineResult<()> {
    let file = File::create(partial).map_err(|err| {
        PipelineError::packaging("package.create_archive", partial, PackagingCause::Io(err))
    })?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for entry in WalkDir::new(directory).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            PipelineError::packaging("package.walk", directory, PackagingCause::Walk(err))
        })?;
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            return Err(PipelineError::packaging(
                "package.entry_type",
                entry.path(),
                PackagingCause::UnsupportedEntry,
            ));
        }
        let entry_name = archive_entry_name(root_name, directory, entry.path());

        if file_type.is_dir() {
            writer
                .add_directory(format!("{entry_name}/"), options)
                .map_err(|err| {
                    PipelineError::packaging("package.add_directory", entry.path(), PackagingCause::Zip(err))
                })?;
            continue;
        }

        writer.start_file(entry_name, options).map_err(|err| {
            PipelineError::packaging("package.start_file", entry.path(), PackagingCause::Zip(err))
        })?;
        let mut input = File::open(entry.path()).map_err(|err| {
            PipelineError::packaging("package.open_entry", entry.path(), PackagingCause::Io(err))
        })?;
        io::copy(&mut input, &mut writer).map_err(|err| {
            PipelineError::packaging("package.write_entry", entry.path(), PackagingCause::Io(err))
        })?;
    }

    let file = writer.finish().map_err(|err| {
        PipelineError::packaging("package.finish", partial, PackagingCause::Zip(err))
    })?;
    file.sync_all().map_err(|err| {
        PipelineError::packaging("package.sync", partial, PackagingCause::Io(err))
    })
}

fn archive_entry_name(root_name: &str, directory: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(directory).unwrap_or(path);
    let mut name = root_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawvault_test_support::fixtures::{bruker_acquisition, read_zip_entries, write_file};

    type TestResult<T> = anyhow::Result<T>;

    #[test]
    fn thermo_file_passes_through() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let raw = write_file(&temp.path().join("RUN001.raw"), b"spectra")?;
        let unit = resolve_transfer_unit(&raw, InstrumentKind::Thermo, &temp.path().join("staging"))?;
        assert_eq!(unit.path(), raw.as_path());
        assert!(!unit.is_temporary());
        assert!(!temp.path().join("staging").exists());
        Ok(())
    }

    #[test]
    fn bruker_directory_is_found_among_children() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir(temp.path().join("notes"))?;
        write_file(&temp.path().join("readme.d"), b"a file, not a directory")?;
        bruker_acquisition(temp.path(), "SAMPLE_02.d")?;
        bruker_acquisition(temp.path(), "SAMPLE_01.d")?;

        let found = locate_package_dir(temp.path(), ".d")?;
        assert_eq!(found, temp.path().join("SAMPLE_01.d"));
        Ok(())
    }

    #[test]
    fn source_with_extension_is_packaged_itself() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = temp.path().join("Batch7.WIFF");
        fs::create_dir(&acquisition)?;
        assert_eq!(locate_package_dir(&acquisition, ".wiff")?, acquisition);
        Ok(())
    }

    #[test]
    fn missing_extension_directory_is_not_found() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir(temp.path().join("SAMPLE_01.wiff"))?;
        assert!(matches!(
            locate_package_dir(temp.path(), ".d"),
            Err(PipelineError::NotFound {
                reason: "no_matching_directory",
                ..
            })
        ));
        assert!(matches!(
            locate_package_dir(&temp.path().join("absent"), ".d"),
            Err(PipelineError::NotFound {
                reason: "missing",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn archive_round_trips_directory_contents() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        let staging = temp.path().join("staging");

        let unit = resolve_transfer_unit(temp.path(), InstrumentKind::Bruker, &staging)?;
        assert!(unit.is_temporary());
        assert_eq!(unit.logical_name(), "SAMPLE_01.d.zip");
        assert!(!staging.join("SAMPLE_01.d.zip.partial").exists());

        let entries = read_zip_entries(unit.path())?;
        for relative in [
            "analysis.tdf",
            "analysis.tdf_bin",
            "chromatography-data.sqlite",
            "method/acquisition.method",
        ] {
            let expected = fs::read(acquisition.join(relative))?;
            assert_eq!(
                entries.get(&format!("SAMPLE_01.d/{relative}")),
                Some(&expected),
                "entry {relative}"
            );
        }
        assert_eq!(entries.len(), 4);
        Ok(())
    }

    #[test]
    fn unwritable_staging_is_a_packaging_error() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        let staging = temp.path().join("staging");
        fs::write(&staging, b"file in the way")?;

        let result = package_directory(&acquisition, &staging);
        assert!(matches!(result, Err(PipelineError::Packaging { .. })));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_stored_as_its_target_content() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        let shared = write_file(&temp.path().join("shared_calibration.bin"), b"calibration table")?;
        std::os::unix::fs::symlink(&shared, acquisition.join("calibration.bin"))?;
        let staging = temp.path().join("staging");

        let archive = package_directory(&acquisition, &staging)?;
        let entries = read_zip_entries(&archive)?;
        assert_eq!(
            entries.get("SAMPLE_01.d/calibration.bin"),
            Some(&b"calibration table".to_vec())
        );
        assert_eq!(entries.len(), 5);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_fails_and_leaves_no_archive() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        std::os::unix::fs::symlink(temp.path().join("gone.bin"), acquisition.join("zz_dangling"))?;
        let staging = temp.path().join("staging");

        let result = package_directory(&acquisition, &staging);
        assert!(matches!(
            result,
            Err(PipelineError::Packaging {
                operation: "package.walk",
                ..
            })
        ));
        assert!(!staging.join("SAMPLE_01.d.zip.partial").exists());
        assert!(!staging.join("SAMPLE_01.d.zip").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn socket_entry_fails_mid_walk_and_removes_partial() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let acquisition = bruker_acquisition(temp.path(), "SAMPLE_01.d")?;
        let _listener = std::os::unix::net::UnixListener::bind(acquisition.join("zz.sock"))?;
        let staging = temp.path().join("staging");

        let result = package_directory(&acquisition, &staging);
        assert!(matches!(
            result,
            Err(PipelineError::Packaging {
                operation: "package.entry_type",
                source: PackagingCause::UnsupportedEntry,
                ..
            })
        ));
        assert!(!staging.join("SAMPLE_01.d.zip.partial").exists());
        assert!(!staging.join("SAMPLE_01.d.zip").exists());
        Ok(())
    }
}

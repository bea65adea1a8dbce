//! Zip archive unpacking

use headline_core::{Error, Result};
use std::fs::File;
use std::path::Path;
use zip::ZipArchive;

/// Unpack a zip archive into `dest`, creating it if needed
///
/// Entries whose path would escape `dest` are rejected by the zip reader.
/// Returns the number of entries unpacked.
pub fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::archive(format!(
            "Failed to read archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    if archive.is_empty() {
        return Err(Error::archive(format!(
            "Archive {} contains no entries",
            archive_path.display()
        )));
    }

    std::fs::create_dir_all(dest)?;
    archive.extract(dest).map_err(|e| {
        Error::archive(format!(
            "Failed to unpack {} into {}: {}",
            archive_path.display(),
            dest.display(),
            e
        ))
    })?;

    Ok(archive.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, contents) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_unpack_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("model.zip");
        write_zip(
            &archive,
            &[("model-best/meta.json", "{}"), ("model-best/bow.json", "{}")],
        );

        let dest = dir.path().join("out");
        let count = unpack_zip(&archive, &dest).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("model-best/meta.json").is_file());
        assert!(dest.join("model-best/bow.json").is_file());
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("model.zip");
        std::fs::write(&archive, b"PK\x03\x04 definitely not a zip").unwrap();

        let err = unpack_zip(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    #[test]
    fn test_empty_archive_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        write_zip(&archive, &[]);

        let err = unpack_zip(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }
}

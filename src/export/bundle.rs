//! Flat zip archiving of named byte entries.
//!
//! Media bundles are one level deep: a bundle holds files, never another
//! bundle. Nesting is already rejected when the descriptor is constructed;
//! this module only assembles bytes.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use crate::error::{Error, ExportError, Result};

/// Assemble named byte entries into a zip archive, preserving entry order
///
/// Entry names must be unique within the archive.
pub fn archive(archive_name: &str, entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut seen = HashSet::new();
    for (name, _) in entries {
        if !seen.insert(name.as_str()) {
            return Err(Error::Export(ExportError::DuplicateEntry {
                filename: name.clone(),
            }));
        }
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_error(archive_name, e))?;
        writer.write_all(bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| archive_error(archive_name, e))?;

    tracing::debug!(
        archive = archive_name,
        entries = entries.len(),
        bytes = cursor.get_ref().len(),
        "bundle archived"
    );
    Ok(cursor.into_inner())
}

fn archive_error(archive_name: &str, e: zip::result::ZipError) -> Error {
    Error::Export(ExportError::Archive {
        filename: archive_name.to_string(),
        reason: e.to_string(),
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archive_round_trips_entries_in_order() {
        let entries = vec![
            ("1.png".to_string(), vec![1u8, 2, 3]),
            ("2.png".to_string(), vec![4u8, 5]),
        ];
        let bytes = archive("bundle.zip", &entries).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["1.png", "2.png"], "entry order is preserved");

        let mut content = Vec::new();
        zip.by_name("2.png").unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, vec![4u8, 5]);
    }

    #[test]
    fn duplicate_entry_names_are_rejected() {
        let entries = vec![
            ("1.png".to_string(), vec![1u8]),
            ("1.png".to_string(), vec![2u8]),
        ];
        let result = archive("bundle.zip", &entries);
        assert!(matches!(
            result,
            Err(Error::Export(ExportError::DuplicateEntry { ref filename })) if filename == "1.png"
        ));
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = archive("empty.zip", &[]).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 0);
    }
}

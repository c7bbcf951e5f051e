use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pipeline::Encoded;

/// Destination paths of one run. `table` is only used by SSPR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub data: PathBuf,
    pub table: PathBuf,
}

/// Write a whole buffer to `path`, replacing any existing file.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|source| Error::CannotOpen {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Persist an encoded run; returns the files written.
pub fn write_encoded(encoded: &Encoded, paths: &OutputPaths) -> Result<Vec<PathBuf>> {
    match encoded {
        Encoded::Raw(bytes) => {
            tracing::info!(path = %paths.data.display(), bytes = bytes.len(), "saving RAW file");
            write_file(&paths.data, bytes)?;
            Ok(vec![paths.data.clone()])
        }
        Encoded::Hspr(bytes) => {
            tracing::info!(path = %paths.data.display(), bytes = bytes.len(), "saving HSPR file");
            write_file(&paths.data, bytes)?;
            Ok(vec![paths.data.clone()])
        }
        Encoded::Sspr(sheet) => {
            tracing::info!(
                path = %paths.data.display(),
                table = %paths.table.display(),
                sprites = sheet.records.len() - 1,
                "saving SSPR file"
            );
            write_file(&paths.data, &sheet.data)?;
            write_file(&paths.table, &sheet.table)?;
            Ok(vec![paths.data.clone(), paths.table.clone()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sspr::{SpriteSheet, TableRecord};

    #[test]
    fn sspr_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths {
            data: dir.path().join("s.dat"),
            table: dir.path().join("s.tab"),
        };
        let sheet = SpriteSheet {
            data: vec![1, 0],
            table: vec![0; 6],
            records: vec![TableRecord {
                offset: 0,
                width: 0,
                height: 0,
            }],
        };
        let written = write_encoded(&Encoded::Sspr(sheet), &paths).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(&paths.data).unwrap(), vec![1, 0]);
        assert_eq!(std::fs::read(&paths.table).unwrap(), vec![0; 6]);
    }

    #[test]
    fn unwritable_destination_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.raw");
        assert!(matches!(
            write_file(&path, &[1]),
            Err(Error::CannotOpen { .. })
        ));
    }
}

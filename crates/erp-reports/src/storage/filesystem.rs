use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Suffix of the staging copy written next to a destination before it is
/// renamed into place.
const STAGING_SUFFIX: &str = ".partial";

/// Result of placing one download at its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    pub path: PathBuf,
    /// Extra copy kept under the portal's own filename, when requested.
    pub archived: Option<PathBuf>,
}

/// Copies finished downloads into destination folders under computed names.
///
/// Destinations are overwritten in place. The copy goes to a staging file in
/// the destination directory first and is renamed over the old file, so a
/// half-written spreadsheet never appears under the final name.
#[derive(Debug, Default, Clone)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        Self
    }

    pub fn relocate(
        &self,
        download: &Path,
        directory: &Path,
        filename: &str,
        keep_original_name: bool,
    ) -> Result<Relocated, StorageError> {
        self.ensure_directory(directory)?;

        let destination = directory.join(filename);
        self.copy_over(download, &destination)?;

        let archived = if keep_original_name {
            match download.file_name() {
                Some(original) if Path::new(original) != Path::new(filename) => {
                    let archive_path = directory.join(original);
                    self.copy_over(download, &archive_path)?;
                    Some(archive_path)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(Relocated {
            path: destination,
            archived,
        })
    }

    /// Deletes the temporary download once it has been relocated.
    pub fn remove_download(&self, download: &Path) -> Result<(), StorageError> {
        std::fs::remove_file(download).map_err(|e| StorageError::RemoveFile {
            path: download.to_path_buf(),
            source: e,
        })
    }

    fn copy_over(&self, source: &Path, destination: &Path) -> Result<(), StorageError> {
        let staging = staging_path(destination);

        std::fs::copy(source, &staging).map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: staging.clone(),
            source: e,
        })?;

        // Windows refuses to rename over an existing file
        if std::fs::symlink_metadata(destination).is_ok() {
            if let Err(e) = std::fs::remove_file(destination) {
                let _ = std::fs::remove_file(&staging);
                return Err(StorageError::RemoveFile {
                    path: destination.to_path_buf(),
                    source: e,
                });
            }
        }

        std::fs::rename(&staging, destination).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            StorageError::CopyFile {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            }
        })
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(STAGING_SUFFIX);
    destination.with_file_name(name)
}

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StorageError;

/// Moves `src` to `dst`, copying and deleting when a rename cannot cross
/// devices.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    let failed = |source| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst).map_err(failed)?;
    fs::remove_file(src).map_err(failed)
}

fn create_dirs(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path).map_err(|source| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

/// Moves a processed import file to `{input_directory}/archive/` as
/// `YYYY-MM-DD_{stem}.{ext}`. A file archived earlier the same day under the
/// same name is kept; the newcomer becomes `YYYY-MM-DD_{stem}_2.{ext}`, and
/// so on.
pub fn archive_file(
    source_path: &Path,
    input_directory: &Path,
    date: NaiveDate,
) -> Result<PathBuf, StorageError> {
    let archive_dir = input_directory.join("archive");
    create_dirs(&archive_dir)?;

    let stem = source_path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("import");
    let ext = source_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let day = date.format("%Y-%m-%d");

    for copy in 1..=1000 {
        let suffix = if copy == 1 {
            String::new()
        } else {
            format!("_{}", copy)
        };
        let target = archive_dir.join(format!("{}_{}{}{}", day, stem, suffix, ext));
        if fs::symlink_metadata(&target).is_err() {
            move_file(source_path, &target)?;
            log::debug!("Archived import file as {}", target.display());
            return Ok(target);
        }
    }

    Err(StorageError::FileExists(
        archive_dir.join(format!("{}_{}{}", day, stem, ext)),
    ))
}

/// Folders created for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFolders {
    /// `{root}/orders/{slug}/{YYYYMMDD_HHMMSS}[_N]`
    pub export_dir: PathBuf,
    /// `{export_dir}/qr_codes`
    pub qr_dir: PathBuf,
    /// The timestamp component as actually created, including any suffix.
    pub batch_name: String,
}

pub struct OrderStorage {
    output_directory: PathBuf,
}

impl OrderStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Creates the export and QR folders for an order. Two orders for the
    /// same dealership within one second get `_2`, `_3`, ... suffixes; the
    /// folder is claimed with `create_dir`, which fails if it already exists.
    pub fn create_batch_folders(
        &self,
        slug: &str,
        timestamp: NaiveDateTime,
    ) -> Result<BatchFolders, StorageError> {
        let dealership_dir = self.output_directory.join("orders").join(slug);
        create_dirs(&dealership_dir)?;

        let stamp = timestamp.format("%Y%m%d_%H%M%S").to_string();
        for counter in 1..=1000 {
            let batch_name = if counter == 1 {
                stamp.clone()
            } else {
                format!("{}_{}", stamp, counter)
            };
            let export_dir = dealership_dir.join(&batch_name);

            match fs::create_dir(&export_dir) {
                Ok(()) => {
                    let qr_dir = export_dir.join("qr_codes");
                    create_dirs(&qr_dir)?;
                    log::debug!("Created order folder {}", export_dir.display());
                    return Ok(BatchFolders {
                        export_dir,
                        qr_dir,
                        batch_name,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CreateDirectory {
                        path: export_dir,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::DirectoryExists(dealership_dir.join(stamp)))
    }
}

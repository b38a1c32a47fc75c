use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Unpacks `archive` into `dest` on a blocking thread.
///
/// Returns the number of entries in the archive.
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || extract_archive_blocking(&archive, &dest))
        .await
        .map_err(|e| Error::Extract(format!("Extraction task failed: {}", e)))?
}

/// Unpacks `archive` into `dest`.
///
/// Directories are created as needed and unix permissions recorded in the
/// archive are restored. Entries whose names would land outside `dest` are
/// rejected.
pub fn extract_archive_blocking(archive: &Path, dest: &Path) -> Result<usize> {
    tracing::info!("Unzipping {} into {}", archive.display(), dest.display());

    let file = File::open(archive)
        .map_err(|e| Error::Extract(format!("Failed to open {}: {}", archive.display(), e)))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| Error::Extract(format!("Failed to read {}: {}", archive.display(), e)))?;

    create_dir(dest)?;

    let count = zip.len();
    for index in 0..count {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| Error::Extract(format!("Failed to read entry {}: {}", index, e)))?;

        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::Extract(format!(
                "Entry '{}' escapes the destination directory",
                entry.name()
            ))
        })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            create_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }

        let mut out = File::create(&target)
            .map_err(|e| Error::Extract(format!("Failed to create {}: {}", target.display(), e)))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| Error::Extract(format!("Failed to write {}: {}", target.display(), e)))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            set_mode(&target, mode)?;
        }
    }

    tracing::debug!(entries = count, "Archive unpacked");
    Ok(count)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::Extract(format!("Failed to create {}: {}", path.display(), e)))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)).map_err(|e| {
        Error::Extract(format!(
            "Failed to set permissions on {}: {}",
            path.display(),
            e
        ))
    })
}

/// Sibling path a download or extraction is staged at before it is renamed
/// into place.
pub(crate) fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

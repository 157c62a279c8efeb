//! Directory operations for fixture working trees
//!
//! Recursive copy and delete, private working-directory creation, and
//! tar.gz template unpacking. Every server instance owns exactly one
//! working directory created here and removed at teardown.

use crate::errors::{FixtureError, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// Prefix for working-directory names under the system temp directory.
pub const WORKDIR_PREFIX: &str = "mysql-fixture";

/// Recursively copy `source` into `target`, preserving relative paths.
///
/// `target` must already exist. Directories are created as encountered,
/// files are copied byte-for-byte.
///
/// # Example
///
/// ```no_run
/// use mysql_fixture::fsops::copy_tree;
/// use std::path::Path;
///
/// copy_tree(Path::new("/opt/mysql-fixture/template"), Path::new("/tmp/work")).unwrap();
/// ```
pub fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            FixtureError::IoError(format!("Failed to walk {}: {}", source.display(), e))
        })?;

        let relative = entry.path().strip_prefix(source).map_err(|e| {
            FixtureError::IoError(format!("Path outside copy root: {}", e))
        })?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| {
                FixtureError::IoError(format!(
                    "Failed to create {}: {}",
                    destination.display(),
                    e
                ))
            })?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    FixtureError::IoError(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            fs::copy(entry.path(), &destination).map_err(|e| {
                FixtureError::IoError(format!(
                    "Failed to copy {} -> {}: {}",
                    entry.path().display(),
                    destination.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Delete a directory tree.
///
/// Deletion failures are reported, never swallowed. The caller decides
/// whether a failure masks a more important error.
pub fn remove_tree(root: &Path) -> Result<()> {
    fs::remove_dir_all(root).map_err(|e| {
        FixtureError::IoError(format!("Failed to delete {}: {}", root.display(), e))
    })
}

/// Create a uniquely named, restrictively permissioned working directory
/// under the system temp directory.
///
/// Name format: `mysql-fixture-{millis}-{uuid8}`. Mode 0770 on Unix, the
/// owning instance keeps exclusive use of it for its whole lifetime.
pub fn create_instance_dir() -> Result<PathBuf> {
    let millis = chrono::Utc::now().timestamp_millis();
    let uuid = Uuid::new_v4();
    let name = format!("{}-{}-{}", WORKDIR_PREFIX, millis, &uuid.to_string()[..8]);
    let dir = std::env::temp_dir().join(name);

    fs::create_dir(&dir).map_err(|e| {
        FixtureError::IoError(format!(
            "Failed to create working directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o770)).map_err(|e| {
            FixtureError::IoError(format!(
                "Failed to set permissions on {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    Ok(dir)
}

/// Unpack a `.tar.gz` archive into `target`, preserving relative paths.
pub fn unpack_archive(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| {
        FixtureError::IoError(format!("Failed to open {}: {}", archive.display(), e))
    })?;

    let decoder = GzDecoder::new(file);
    let mut tarball = tar::Archive::new(decoder);
    tarball.unpack(target).map_err(|e| {
        FixtureError::IoError(format!(
            "Failed to unpack {} -> {}: {}",
            archive.display(),
            target.display(),
            e
        ))
    })?;

    Ok(())
}

/// True if the path names an archive template rather than a directory.
pub fn is_archive_template(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

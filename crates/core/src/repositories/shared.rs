//! Shared repository utilities.
//!
//! File system helpers used by every store: whole-document replacement via a
//! temporary sibling file and rename, and per-patient directory resolution.

use crate::error::{YbocsError, YbocsResult};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use ybocs_types::Login;

/// Replaces `path` with `contents` atomically.
///
/// The bytes are written to `<path>.tmp` in the same directory, permissions are
/// restricted to the owner on Unix, and the temporary file is renamed over the
/// target. Readers observe either the old or the new document, never a partial one.
///
/// # Errors
///
/// Returns:
/// - [`YbocsError::DirCreation`] if the parent directory cannot be created,
/// - [`YbocsError::FileWrite`] if writing, chmod or rename fails.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> YbocsResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(YbocsError::DirCreation)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents).map_err(YbocsError::FileWrite)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
            .map_err(YbocsError::FileWrite)?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(YbocsError::FileWrite(e));
    }

    Ok(())
}

/// Returns the directory holding a patient's files: `<users_dir>/<login>/`.
///
/// [`Login`] only admits path-safe characters, so the result always stays
/// directly under `users_dir`.
pub(crate) fn patient_dir(users_dir: &Path, login: &Login) -> PathBuf {
    users_dir.join(login.as_str())
}

/// Locks a store mutex, recovering the guard if a previous holder panicked.
///
/// The guarded value is `()`; the files on disk are the state, and they are
/// only ever replaced whole, so a poisoned lock carries no torn data.
pub(crate) fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("doc.yaml");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!temp.path().join("nested").join("doc.yaml.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.yaml");
        write_atomic(&path, b"credentials: {}").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_patient_dir_is_direct_child() {
        let users = Path::new("/data/users");
        let login = Login::parse("jkowal").unwrap();
        assert_eq!(patient_dir(users, &login), PathBuf::from("/data/users/jkowal"));
    }
}

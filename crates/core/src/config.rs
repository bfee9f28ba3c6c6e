//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{
    DEFAULT_CREDENTIALS_FILE, DEFAULT_DATA_DIR, RESULTS_FILENAME, USERS_DIR_NAME,
};
use crate::{YbocsError, YbocsResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    credentials_file: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The data directory is created if it does not exist yet; the credential
    /// document may be absent and is then treated as an empty account set.
    pub fn new(data_dir: PathBuf, credentials_file: PathBuf) -> YbocsResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(YbocsError::InvalidInput("data_dir cannot be empty".into()));
        }
        if credentials_file.as_os_str().is_empty() {
            return Err(YbocsError::InvalidInput(
                "credentials_file cannot be empty".into(),
            ));
        }

        std::fs::create_dir_all(data_dir.join(USERS_DIR_NAME)).map_err(YbocsError::DirCreation)?;

        Ok(Self {
            data_dir,
            credentials_file,
        })
    }

    /// Build a configuration from optional raw values (typically environment variables),
    /// falling back to the defaults for blank or missing values.
    pub fn from_values(
        data_dir: Option<String>,
        credentials_file: Option<String>,
    ) -> YbocsResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let data_dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let credentials_file =
            non_blank(credentials_file).unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.into());

        Self::new(PathBuf::from(data_dir), PathBuf::from(credentials_file))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn credentials_file(&self) -> &Path {
        &self.credentials_file
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join(USERS_DIR_NAME)
    }

    pub fn results_file(&self) -> PathBuf {
        self.data_dir.join(RESULTS_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_users_dir() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");

        let cfg = CoreConfig::new(data_dir.clone(), temp.path().join("users.yaml")).unwrap();

        assert!(cfg.users_dir().is_dir());
        assert_eq!(cfg.results_file(), data_dir.join("wyniki.csv"));
    }

    #[test]
    fn test_new_rejects_empty_paths() {
        let result = CoreConfig::new(PathBuf::new(), PathBuf::from("users.yaml"));
        assert!(matches!(result, Err(YbocsError::InvalidInput(_))));
    }

    #[test]
    fn test_from_values_uses_overrides() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("clinic");
        let creds = temp.path().join("accounts.yaml");

        let cfg = CoreConfig::from_values(
            Some(data_dir.display().to_string()),
            Some(format!("  {}  ", creds.display())),
        )
        .unwrap();

        assert_eq!(cfg.data_dir(), data_dir.as_path());
        assert_eq!(cfg.credentials_file(), creds.as_path());
    }
}

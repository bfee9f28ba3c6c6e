//! Symptom assignment store.
//!
//! Each patient's checklist lives in `<users_dir>/<login>/objawy.json` as a
//! pretty-printed JSON array of symptom keys in sorted order. A save replaces
//! the whole set.

use crate::catalog::SymptomKey;
use crate::constants::SYMPTOMS_FILENAME;
use crate::repositories::shared::{lock, patient_dir, write_atomic};
use crate::{YbocsError, YbocsResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ybocs_types::Login;

#[derive(Debug)]
pub struct SymptomStore {
    users_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SymptomStore {
    pub fn new(users_dir: impl Into<PathBuf>) -> Self {
        Self {
            users_dir: users_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn symptoms_file(&self, login: &Login) -> PathBuf {
        patient_dir(&self.users_dir, login).join(SYMPTOMS_FILENAME)
    }

    /// Returns the patient's assigned symptoms.
    ///
    /// A patient with no file yet has an empty set. An unreadable or corrupt
    /// file also yields an empty set; the failure is logged. Entries that are not
    /// valid symptom keys are skipped one by one, each with a warning.
    pub fn get(&self, login: &Login) -> BTreeSet<SymptomKey> {
        let path = self.symptoms_file(login);
        if !path.exists() {
            return BTreeSet::new();
        }

        match read_entries(&path) {
            Ok(entries) => entries
                .iter()
                .filter_map(|raw| match SymptomKey::parse(raw) {
                    Ok(key) => Some(key),
                    Err(e) => {
                        tracing::warn!(login = %login, "skipping stored symptom: {}", e);
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(
                    login = %login,
                    path = %path.display(),
                    "ignoring unreadable symptom file: {}",
                    e
                );
                BTreeSet::new()
            }
        }
    }

    /// Replaces the patient's whole symptom set.
    pub fn replace(&self, login: &Login, keys: &BTreeSet<SymptomKey>) -> YbocsResult<()> {
        let path = self.symptoms_file(login);
        let json = serde_json::to_string_pretty(keys).map_err(YbocsError::Serialization)?;

        let _guard = lock(&self.write_lock);
        write_atomic(&path, json.as_bytes())?;

        tracing::info!(login = %login, count = keys.len(), "symptom assignment replaced");
        Ok(())
    }

    /// Lists every patient directory with its symptom set, sorted by login.
    ///
    /// Directory names that are not valid logins are skipped.
    pub fn list_patients(&self) -> YbocsResult<Vec<(Login, BTreeSet<SymptomKey>)>> {
        let entries = match fs::read_dir(&self.users_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(YbocsError::FileRead(e)),
        };

        let mut logins = Vec::new();
        for entry in entries {
            let entry = entry.map_err(YbocsError::FileRead)?;
            if !entry.file_type().map_err(YbocsError::FileRead)?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().map(Login::parse) {
                Some(Ok(login)) => logins.push(login),
                _ => tracing::warn!("skipping patient directory {:?}: not a valid login", name),
            }
        }
        logins.sort();

        Ok(logins
            .into_iter()
            .map(|login| {
                let keys = self.get(&login);
                (login, keys)
            })
            .collect())
    }
}

fn read_entries(path: &Path) -> YbocsResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(YbocsError::FileRead)?;
    serde_json::from_str(&contents).map_err(YbocsError::Deserialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn login(s: &str) -> Login {
        Login::parse(s).unwrap()
    }

    fn keys(raw: &[&str]) -> BTreeSet<SymptomKey> {
        raw.iter().map(|k| SymptomKey::parse(k).unwrap()).collect()
    }

    #[test]
    fn test_get_without_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SymptomStore::new(temp.path());
        assert!(store.get(&login("jkowal")).is_empty());
    }

    #[test]
    fn test_replace_then_get_returns_exact_set() {
        let temp = TempDir::new().unwrap();
        let store = SymptomStore::new(temp.path());
        let set = keys(&[
            "Kompulsje sprawdzania:Czy nie popełnił błędu",
            "Kompulsje różne:INNE:liczenie kroków",
        ]);

        store.replace(&login("jkowal"), &set).unwrap();
        assert_eq!(store.get(&login("jkowal")), set);

        let smaller = keys(&["Obsesje somatyczne i gromadzenie:Lęk przed chorobą"]);
        store.replace(&login("jkowal"), &smaller).unwrap();
        assert_eq!(store.get(&login("jkowal")), smaller);
    }

    #[test]
    fn test_file_is_sorted_pretty_json_array() {
        let temp = TempDir::new().unwrap();
        let store = SymptomStore::new(temp.path());
        let set = keys(&[
            "Obsesje seksualne:Treści dotyczące homoseksualizmu",
            "Kompulsje różne:Trichotillomania",
        ]);
        store.replace(&login("anowak"), &set).unwrap();

        let raw = fs::read_to_string(temp.path().join("anowak").join(SYMPTOMS_FILENAME)).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            parsed,
            vec![
                "Kompulsje różne:Trichotillomania".to_string(),
                "Obsesje seksualne:Treści dotyczące homoseksualizmu".to_string(),
            ]
        );
        assert!(raw.contains("\n  \""));
        assert!(raw.contains("Treści"), "non-ASCII text is stored unescaped");
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("jkowal");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(SYMPTOMS_FILENAME), "{ not json").unwrap();

        let store = SymptomStore::new(temp.path());
        assert!(store.get(&login("jkowal")).is_empty());
    }

    #[test]
    fn test_unknown_key_in_file_is_skipped_alone() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("jkowal");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(SYMPTOMS_FILENAME),
            r#"["Kompulsje różne:Trichotillomania","Kompulsje różne:Stary objaw","Kompulsje różne:INNE:liczenie kroków","Nieznana grupa:coś"]"#,
        )
        .unwrap();

        let store = SymptomStore::new(temp.path());
        assert_eq!(
            store.get(&login("jkowal")),
            keys(&[
                "Kompulsje różne:Trichotillomania",
                "Kompulsje różne:INNE:liczenie kroków",
            ])
        );
    }

    #[test]
    fn test_list_patients_sorted_and_skips_invalid_dirs() {
        let temp = TempDir::new().unwrap();
        let store = SymptomStore::new(temp.path());
        store
            .replace(&login("bbb"), &keys(&["Kompulsje różne:Trichotillomania"]))
            .unwrap();
        fs::create_dir_all(temp.path().join("aaa")).unwrap();
        fs::create_dir_all(temp.path().join("bad name")).unwrap();
        fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let patients = store.list_patients().unwrap();
        let names: Vec<&str> = patients.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(names, vec!["aaa", "bbb"]);
        assert!(patients[0].1.is_empty());
        assert_eq!(patients[1].1.len(), 1);
    }
}

//! Credential store.
//!
//! Accounts live in a single YAML document, loaded and saved as a whole:
//!
//! ```yaml
//! credentials:
//!   usernames:
//!     jkowal:
//!       email: jkowal@example.com
//!       name: Jan KOW
//!       password: $argon2id$v=19$...
//!       role: user
//!       force_password_reset: true
//! ```
//!
//! Top-level keys other than `credentials` (for example cookie settings written by
//! other tools) are carried through unchanged on every save. Writers in this process
//! are serialised by a mutex; each save replaces the file via temp-file + rename.

use crate::constants::DEFAULT_EMAIL_DOMAIN;
use crate::error::{YbocsError, YbocsResult};
use crate::password::{hash_password, needs_rehash, verify_password};
use crate::repositories::shared::{lock, write_atomic};
use crate::validation::validate_initial_password;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ybocs_types::{Login, NonEmptyText};

/// Account role.
///
/// Missing roles in the credential document deserialise as [`Role::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = YbocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(YbocsError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// An account as held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub login: Login,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub force_password_reset: bool,
}

/// Input for [`CredentialStore::create`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login: Login,
    pub display_name: NonEmptyText,
    /// Defaults to `<login>@example.com` when absent.
    pub email: Option<String>,
    pub initial_password: String,
    pub role: Role,
    pub force_password_reset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    email: String,
    name: String,
    password: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    force_password_reset: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsSection {
    #[serde(default)]
    usernames: BTreeMap<String, StoredAccount>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsDocument {
    #[serde(default)]
    credentials: CredentialsSection,
    #[serde(flatten)]
    other: BTreeMap<String, serde_yaml::Value>,
}

/// Persistent mapping of login to [`Account`].
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every account.
    ///
    /// A missing or empty document yields an empty mapping. Entries whose key is not
    /// a valid login are skipped with a warning.
    pub fn load(&self) -> YbocsResult<BTreeMap<Login, Account>> {
        let document = self.read_document()?;
        Ok(accounts_from_document(&document))
    }

    /// Replaces the whole account mapping.
    pub fn save(&self, accounts: &BTreeMap<Login, Account>) -> YbocsResult<()> {
        let _guard = lock(&self.write_lock);
        self.save_unlocked(accounts)
    }

    pub fn get(&self, login: &Login) -> YbocsResult<Option<Account>> {
        Ok(self.load()?.remove(login))
    }

    /// All accounts ordered by login.
    pub fn list(&self) -> YbocsResult<Vec<Account>> {
        Ok(self.load()?.into_values().collect())
    }

    /// Provisions a new account.
    ///
    /// # Errors
    ///
    /// - [`YbocsError::DuplicateLogin`] if the login exists; the document is not rewritten
    /// - [`YbocsError::EmptyPassword`] if the initial password is blank
    pub fn create(&self, new: NewAccount) -> YbocsResult<Account> {
        validate_initial_password(&new.initial_password)?;

        let _guard = lock(&self.write_lock);
        let mut accounts = self.load()?;

        if accounts.contains_key(&new.login) {
            tracing::warn!(login = %new.login, "account creation rejected: duplicate login");
            return Err(YbocsError::DuplicateLogin(new.login.to_string()));
        }

        let email = new
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("{}@{}", new.login, DEFAULT_EMAIL_DOMAIN));

        let account = Account {
            login: new.login.clone(),
            display_name: new.display_name.to_string(),
            email,
            password_hash: hash_password(&new.initial_password)?,
            role: new.role,
            force_password_reset: new.force_password_reset,
        };

        accounts.insert(new.login, account.clone());
        self.save_unlocked(&accounts)?;

        tracing::info!(
            login = %account.login,
            role = %account.role,
            force_password_reset = account.force_password_reset,
            "account created"
        );
        Ok(account)
    }

    /// Checks a password for a login. Unknown logins verify as `false`.
    pub fn verify(&self, login: &Login, password: &str) -> YbocsResult<bool> {
        Ok(self
            .get(login)?
            .is_some_and(|account| verify_password(password, &account.password_hash)))
    }

    /// Returns the account when `password` matches it.
    ///
    /// Unknown login and wrong password are indistinguishable to the caller:
    /// both yield [`YbocsError::InvalidCredentials`].
    ///
    /// A matching legacy digest is replaced with an Argon2 hash; if that save
    /// fails the login still succeeds.
    pub fn authenticate(&self, login: &Login, password: &str) -> YbocsResult<Account> {
        let account = match self.get(login)? {
            Some(account) if verify_password(password, &account.password_hash) => account,
            _ => return Err(YbocsError::InvalidCredentials),
        };
        if !needs_rehash(&account.password_hash) {
            return Ok(account);
        }

        let upgraded = hash_password(password)
            .and_then(|hash| self.update(login, |stored| stored.password_hash = hash));
        match upgraded {
            Ok(account) => {
                tracing::info!(login = %login, "legacy password digest upgraded");
                Ok(account)
            }
            Err(e) => {
                tracing::warn!(login = %login, "could not upgrade legacy password digest: {}", e);
                Ok(account)
            }
        }
    }

    /// Rewrites the password hash and clears `force_password_reset`.
    pub fn set_password(&self, login: &Login, new_password: &str) -> YbocsResult<Account> {
        validate_initial_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        let account = self.update(login, |account| {
            account.password_hash = password_hash;
            account.force_password_reset = false;
        })?;

        tracing::info!(login = %login, "password changed");
        Ok(account)
    }

    /// Rewrites the password hash and sets `force_password_reset` in one save.
    pub fn set_temporary_password(
        &self,
        login: &Login,
        temporary_password: &str,
    ) -> YbocsResult<Account> {
        validate_initial_password(temporary_password)?;
        let password_hash = hash_password(temporary_password)?;

        let account = self.update(login, |account| {
            account.password_hash = password_hash;
            account.force_password_reset = true;
        })?;

        tracing::info!(login = %login, "temporary password assigned");
        Ok(account)
    }

    pub fn set_role(&self, login: &Login, role: Role) -> YbocsResult<Account> {
        let account = self.update(login, |account| account.role = role)?;
        tracing::info!(login = %login, role = %role, "role changed");
        Ok(account)
    }

    /// Forces the account to choose a new password at its next login.
    pub fn require_reset(&self, login: &Login) -> YbocsResult<Account> {
        let account = self.update(login, |account| account.force_password_reset = true)?;
        tracing::info!(login = %login, "password reset required");
        Ok(account)
    }

    fn update(&self, login: &Login, mutate: impl FnOnce(&mut Account)) -> YbocsResult<Account> {
        let _guard = lock(&self.write_lock);
        let mut accounts = self.load()?;

        let account = accounts
            .get_mut(login)
            .ok_or_else(|| YbocsError::UnknownAccount(login.to_string()))?;
        mutate(account);
        let updated = account.clone();

        self.save_unlocked(&accounts)?;
        Ok(updated)
    }

    fn save_unlocked(&self, accounts: &BTreeMap<Login, Account>) -> YbocsResult<()> {
        // Re-read so keys owned by other tools survive the rewrite.
        let mut document = self.read_document()?;
        document
            .credentials
            .usernames
            .retain(|key, _| Login::parse(key).is_err());
        document
            .credentials
            .usernames
            .extend(accounts.iter().map(|(login, account)| {
                (
                    login.to_string(),
                    StoredAccount {
                        email: account.email.clone(),
                        name: account.display_name.clone(),
                        password: account.password_hash.clone(),
                        role: account.role,
                        force_password_reset: account.force_password_reset,
                    },
                )
            }));

        let yaml = serde_yaml::to_string(&document).map_err(YbocsError::YamlSerialization)?;
        write_atomic(&self.path, yaml.as_bytes())
    }

    fn read_document(&self) -> YbocsResult<CredentialsDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CredentialsDocument::default()),
            Err(e) => return Err(YbocsError::FileRead(e)),
        };

        if contents.trim().is_empty() {
            return Ok(CredentialsDocument::default());
        }

        serde_yaml::from_str(&contents).map_err(YbocsError::YamlDeserialization)
    }
}

fn accounts_from_document(document: &CredentialsDocument) -> BTreeMap<Login, Account> {
    let mut accounts = BTreeMap::new();

    for (key, stored) in &document.credentials.usernames {
        let login = match Login::parse(key) {
            Ok(login) => login,
            Err(e) => {
                tracing::warn!("skipping credential entry '{}': {}", key, e);
                continue;
            }
        };

        accounts.insert(
            login.clone(),
            Account {
                login,
                display_name: stored.name.clone(),
                email: stored.email.clone(),
                password_hash: stored.password.clone(),
                role: stored.role,
                force_password_reset: stored.force_password_reset,
            },
        );
    }

    accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn login(s: &str) -> Login {
        Login::parse(s).unwrap()
    }

    fn new_account(l: &str, password: &str, role: Role, force: bool) -> NewAccount {
        NewAccount {
            login: login(l),
            display_name: NonEmptyText::new("Jan KOW").unwrap(),
            email: None,
            initial_password: password.to_string(),
            role,
            force_password_reset: force,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_verify() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));

        let account = store
            .create(new_account("jkowal", "Start123", Role::User, true))
            .unwrap();

        assert_eq!(account.email, "jkowal@example.com");
        assert!(account.force_password_reset);
        assert!(store.verify(&login("jkowal"), "Start123").unwrap());
        assert!(!store.verify(&login("jkowal"), "wrong").unwrap());
        assert!(!store.verify(&login("nobody"), "Start123").unwrap());
    }

    #[test]
    fn test_create_duplicate_login_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.yaml");
        let store = CredentialStore::new(&path);

        store
            .create(new_account("jkowal", "first", Role::User, false))
            .unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result = store.create(new_account("jkowal", "second", Role::Admin, false));

        assert!(matches!(result, Err(YbocsError::DuplicateLogin(ref l)) if l == "jkowal"));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(store.verify(&login("jkowal"), "first").unwrap());
    }

    #[test]
    fn test_set_password_clears_force_reset() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store
            .create(new_account("jkowal", "Start123", Role::User, true))
            .unwrap();

        let updated = store.set_password(&login("jkowal"), "NewPass1").unwrap();

        assert!(!updated.force_password_reset);
        assert!(store.verify(&login("jkowal"), "NewPass1").unwrap());
        assert!(!store.verify(&login("jkowal"), "Start123").unwrap());
    }

    #[test]
    fn test_set_password_unknown_account() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        assert!(matches!(
            store.set_password(&login("ghost"), "x"),
            Err(YbocsError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_authenticate_does_not_reveal_unknown_login() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store
            .create(new_account("jkowal", "Start123", Role::User, false))
            .unwrap();

        assert!(matches!(
            store.authenticate(&login("ghost"), "Start123"),
            Err(YbocsError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate(&login("jkowal"), "bad"),
            Err(YbocsError::InvalidCredentials)
        ));
        assert!(store.authenticate(&login("jkowal"), "Start123").is_ok());
    }

    #[test]
    fn test_document_defaults_and_extra_keys_preserved() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.yaml");
        let digest = hash_password("pw").unwrap();
        fs::write(
            &path,
            format!(
                "cookie:\n  name: ocd_app_cookie\n  expiry_days: 7\ncredentials:\n  usernames:\n    anna:\n      email: anna@clinic.pl\n      name: Anna NOW\n      password: '{digest}'\n"
            ),
        )
        .unwrap();
        let store = CredentialStore::new(&path);

        let anna = store.get(&login("anna")).unwrap().unwrap();
        assert_eq!(anna.role, Role::User);
        assert!(!anna.force_password_reset);

        store.set_role(&login("anna"), Role::Admin).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("ocd_app_cookie"));
        assert!(raw.contains("role: admin"));
    }

    #[test]
    fn test_list_is_sorted_by_login() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store.create(new_account("zofia", "a", Role::User, false)).unwrap();
        store.create(new_account("adam", "a", Role::Admin, false)).unwrap();

        let logins: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|a| a.login.to_string())
            .collect();
        assert_eq!(logins, vec!["adam", "zofia"]);
    }

    #[test]
    fn test_require_reset_sets_flag() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store.create(new_account("jkowal", "a", Role::User, false)).unwrap();

        let account = store.require_reset(&login("jkowal")).unwrap();
        assert!(account.force_password_reset);
    }

    #[test]
    fn test_set_temporary_password_forces_reset_in_one_save() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store.create(new_account("jkowal", "a", Role::User, false)).unwrap();

        let account = store
            .set_temporary_password(&login("jkowal"), "Temp999")
            .unwrap();
        assert!(account.force_password_reset);

        let stored = store.get(&login("jkowal")).unwrap().unwrap();
        assert!(stored.force_password_reset);
        assert!(store.verify(&login("jkowal"), "Temp999").unwrap());
        assert!(matches!(
            store.set_temporary_password(&login("ghost"), "Temp999"),
            Err(YbocsError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_bcrypt_account_logs_in_and_is_upgraded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.yaml");
        let digest = bcrypt::hash("Start123", 4).unwrap();
        fs::write(
            &path,
            format!(
                "cookie:\n  name: ocd_app_cookie\ncredentials:\n  usernames:\n    jkowal:\n      email: jkowal@clinic.pl\n      name: Jan KOW\n      password: '{digest}'\n      role: user\n      force_password_reset: true\n"
            ),
        )
        .unwrap();
        let store = CredentialStore::new(&path);

        assert!(matches!(
            store.authenticate(&login("jkowal"), "wrong"),
            Err(YbocsError::InvalidCredentials)
        ));
        let account = store.authenticate(&login("jkowal"), "Start123").unwrap();
        assert!(account.password_hash.starts_with("$argon2id$"));
        assert!(account.force_password_reset);

        let stored = store.get(&login("jkowal")).unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));
        assert!(store.verify(&login("jkowal"), "Start123").unwrap());
        assert!(fs::read_to_string(&path).unwrap().contains("ocd_app_cookie"));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("doctor".parse::<Role>().is_err());
    }
}

//! Session state and role gating.
//!
//! A [`Session`] moves through:
//!
//! ```text
//! Unauthenticated --login--> Authenticated { force_password_reset }
//!                                 |  complete_reset (clears the flag)
//!                                 v
//!                              LoggedOut
//! ```
//!
//! While `force_password_reset` is set, every [`Capability`] is refused with
//! [`YbocsError::PasswordResetRequired`]; only [`Session::complete_reset`] and
//! [`Session::logout`] are accepted.

use crate::repositories::credentials::{CredentialStore, Role};
use crate::validation::validate_new_password;
use crate::{YbocsError, YbocsResult};
use serde::Serialize;
use uuid::Uuid;
use ybocs_types::Login;

/// An action a session may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read or replace a patient's symptom checklist.
    ManageSymptoms,
    /// Record a questionnaire. Patients only.
    SubmitAssessment,
    /// Read ledger rows.
    ViewResults,
    /// Provision accounts and change roles. Administrators only.
    ManageAccounts,
    /// Download the full ledger. Administrators only.
    ExportResults,
}

impl Capability {
    pub fn allowed_for(self, role: Role) -> bool {
        match self {
            Capability::ManageSymptoms | Capability::ViewResults => true,
            Capability::SubmitAssessment => role == Role::User,
            Capability::ManageAccounts | Capability::ExportResults => role == Role::Admin,
        }
    }
}

/// The authenticated identity behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub session_id: Uuid,
    pub login: Login,
    pub display_name: String,
    pub role: Role,
    pub force_password_reset: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unauthenticated,
    Authenticated(Principal),
    LoggedOut,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticates against the credential store.
    ///
    /// On failure the session is left unauthenticated and
    /// [`YbocsError::InvalidCredentials`] is returned, whether the login was
    /// unknown, malformed, or the password wrong.
    pub fn login(
        &mut self,
        store: &CredentialStore,
        login: &str,
        password: &str,
    ) -> YbocsResult<&Principal> {
        *self = Session::Unauthenticated;

        let Ok(login) = Login::parse(login) else {
            tracing::warn!("login rejected: malformed login");
            return Err(YbocsError::InvalidCredentials);
        };

        let account = match store.authenticate(&login, password) {
            Ok(account) => account,
            Err(YbocsError::InvalidCredentials) => {
                tracing::warn!(login = %login, "login failed");
                return Err(YbocsError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let principal = Principal {
            session_id: Uuid::new_v4(),
            login: account.login,
            display_name: account.display_name,
            role: account.role,
            force_password_reset: account.force_password_reset,
        };
        tracing::info!(
            login = %principal.login,
            role = %principal.role,
            force_password_reset = principal.force_password_reset,
            "login succeeded"
        );

        *self = Session::Authenticated(principal);
        self.principal()
    }

    /// Sets a new password for the signed-in account and lifts the reset restriction.
    ///
    /// # Errors
    ///
    /// - [`YbocsError::NotAuthenticated`] outside an authenticated session
    /// - [`YbocsError::EmptyPassword`] / [`YbocsError::PasswordMismatch`] from form validation;
    ///   the session is unchanged
    pub fn complete_reset(
        &mut self,
        store: &CredentialStore,
        new_password: &str,
        confirm: &str,
    ) -> YbocsResult<()> {
        let Session::Authenticated(principal) = self else {
            return Err(YbocsError::NotAuthenticated);
        };

        validate_new_password(new_password, confirm)?;
        store.set_password(&principal.login, new_password)?;
        principal.force_password_reset = false;

        tracing::info!(login = %principal.login, "password reset completed");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Session::Authenticated(principal) = self {
            tracing::info!(login = %principal.login, "logged out");
        }
        *self = Session::LoggedOut;
    }

    /// The signed-in principal, ignoring any pending reset.
    pub fn principal(&self) -> YbocsResult<&Principal> {
        match self {
            Session::Authenticated(principal) => Ok(principal),
            Session::Unauthenticated | Session::LoggedOut => Err(YbocsError::NotAuthenticated),
        }
    }

    /// A copy of this session carrying the account's current role and reset flag.
    ///
    /// Role changes and forced resets made after login take effect on open
    /// sessions. An account that no longer exists yields
    /// [`YbocsError::NotAuthenticated`].
    pub fn refreshed(&self, store: &CredentialStore) -> YbocsResult<Session> {
        let principal = self.principal()?;
        let Some(account) = store.get(&principal.login)? else {
            tracing::warn!(login = %principal.login, "session account no longer exists");
            return Err(YbocsError::NotAuthenticated);
        };

        Ok(Session::Authenticated(Principal {
            display_name: account.display_name,
            role: account.role,
            force_password_reset: account.force_password_reset,
            ..principal.clone()
        }))
    }

    /// Checks that the session may use `capability` at all.
    pub fn require(&self, capability: Capability) -> YbocsResult<&Principal> {
        let principal = self.principal()?;
        if principal.force_password_reset {
            return Err(YbocsError::PasswordResetRequired);
        }
        if !capability.allowed_for(principal.role) {
            return Err(YbocsError::Forbidden(format!(
                "{:?} is not available to role {}",
                capability, principal.role
            )));
        }
        Ok(principal)
    }

    /// Checks `capability` for data belonging to `patient`.
    ///
    /// Administrators may act on any patient; other roles only on themselves.
    pub fn authorize_patient(
        &self,
        capability: Capability,
        patient: &Login,
    ) -> YbocsResult<&Principal> {
        let principal = self.require(capability)?;
        if principal.role != Role::Admin && principal.login != *patient {
            tracing::warn!(
                login = %principal.login,
                patient = %patient,
                "cross-patient access refused"
            );
            return Err(YbocsError::Forbidden(format!(
                "{} may not access data of {}",
                principal.login, patient
            )));
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::credentials::NewAccount;
    use tempfile::TempDir;
    use ybocs_types::NonEmptyText;

    fn store_with(temp: &TempDir, login: &str, role: Role, force_reset: bool) -> CredentialStore {
        let store = CredentialStore::new(temp.path().join("users.yaml"));
        store
            .create(NewAccount {
                login: Login::parse(login).unwrap(),
                display_name: NonEmptyText::new("Jan KOW").unwrap(),
                email: None,
                initial_password: "Start123".into(),
                role,
                force_password_reset: force_reset,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new();
        assert!(matches!(
            session.require(Capability::ViewResults),
            Err(YbocsError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_failed_login_stays_unauthenticated() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "jkowal", Role::User, false);
        let mut session = Session::new();

        assert!(matches!(
            session.login(&store, "jkowal", "wrong"),
            Err(YbocsError::InvalidCredentials)
        ));
        assert!(matches!(
            session.login(&store, "nobody", "Start123"),
            Err(YbocsError::InvalidCredentials)
        ));
        assert!(matches!(
            session.login(&store, "../etc", "Start123"),
            Err(YbocsError::InvalidCredentials)
        ));
        assert_eq!(session, Session::Unauthenticated);
    }

    #[test]
    fn test_forced_reset_blocks_everything_until_completed() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "jkowal", Role::User, true);
        let mut session = Session::new();

        let principal = session.login(&store, "jkowal", "Start123").unwrap();
        assert!(principal.force_password_reset);

        for capability in [
            Capability::ManageSymptoms,
            Capability::SubmitAssessment,
            Capability::ViewResults,
        ] {
            assert!(matches!(
                session.require(capability),
                Err(YbocsError::PasswordResetRequired)
            ));
        }

        assert!(matches!(
            session.complete_reset(&store, "NewPass1", "NewPass2"),
            Err(YbocsError::PasswordMismatch)
        ));
        assert!(matches!(
            session.complete_reset(&store, "", ""),
            Err(YbocsError::EmptyPassword)
        ));
        assert!(session.principal().unwrap().force_password_reset);

        session.complete_reset(&store, "NewPass1", "NewPass1").unwrap();
        assert!(session.require(Capability::ViewResults).is_ok());

        let mut again = Session::new();
        let principal = again.login(&store, "jkowal", "NewPass1").unwrap();
        assert!(!principal.force_password_reset);
    }

    #[test]
    fn test_role_gating() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "admin", Role::Admin, false);
        let mut session = Session::new();
        session.login(&store, "admin", "Start123").unwrap();

        assert!(session.require(Capability::ManageAccounts).is_ok());
        assert!(session.require(Capability::ExportResults).is_ok());
        assert!(matches!(
            session.require(Capability::SubmitAssessment),
            Err(YbocsError::Forbidden(_))
        ));
        let other = Login::parse("jkowal").unwrap();
        assert!(session
            .authorize_patient(Capability::ManageSymptoms, &other)
            .is_ok());
    }

    #[test]
    fn test_user_cannot_touch_other_patients() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "jkowal", Role::User, false);
        let mut session = Session::new();
        session.login(&store, "jkowal", "Start123").unwrap();

        let own = Login::parse("jkowal").unwrap();
        let other = Login::parse("anowak").unwrap();
        assert!(session.authorize_patient(Capability::ViewResults, &own).is_ok());
        assert!(matches!(
            session.authorize_patient(Capability::ViewResults, &other),
            Err(YbocsError::Forbidden(_))
        ));
        assert!(matches!(
            session.require(Capability::ManageAccounts),
            Err(YbocsError::Forbidden(_))
        ));
    }

    #[test]
    fn test_refreshed_follows_stored_account() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "admin", Role::Admin, false);
        let mut session = Session::new();
        session.login(&store, "admin", "Start123").unwrap();
        let session_id = session.principal().unwrap().session_id;

        store.set_role(&Login::parse("admin").unwrap(), Role::User).unwrap();
        let current = session.refreshed(&store).unwrap();
        assert_eq!(current.principal().unwrap().session_id, session_id);
        assert!(matches!(
            current.require(Capability::ManageAccounts),
            Err(YbocsError::Forbidden(_))
        ));

        store.require_reset(&Login::parse("admin").unwrap()).unwrap();
        assert!(matches!(
            session.refreshed(&store).unwrap().require(Capability::ViewResults),
            Err(YbocsError::PasswordResetRequired)
        ));
    }

    #[test]
    fn test_refreshed_without_account_is_unauthenticated() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "jkowal", Role::User, false);
        let mut session = Session::new();
        session.login(&store, "jkowal", "Start123").unwrap();

        let empty = CredentialStore::new(temp.path().join("other.yaml"));
        assert!(matches!(
            session.refreshed(&empty),
            Err(YbocsError::NotAuthenticated)
        ));
        assert!(matches!(
            Session::new().refreshed(&store),
            Err(YbocsError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_logout_discards_identity() {
        let temp = TempDir::new().unwrap();
        let store = store_with(&temp, "jkowal", Role::User, false);
        let mut session = Session::new();
        session.login(&store, "jkowal", "Start123").unwrap();

        session.logout();
        assert_eq!(session, Session::LoggedOut);
        assert!(matches!(
            session.principal(),
            Err(YbocsError::NotAuthenticated)
        ));
        assert!(matches!(
            session.complete_reset(&store, "a", "a"),
            Err(YbocsError::NotAuthenticated)
        ));
    }
}

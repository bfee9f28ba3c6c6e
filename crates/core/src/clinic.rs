//! Role-gated operations over the three stores.
//!
//! [`ClinicService`] is what the REST layer calls: every method takes the caller's
//! [`Session`], checks it, and only then touches storage. A refused call has no
//! side effects.

use crate::catalog::SymptomKey;
use crate::config::CoreConfig;
use crate::repositories::credentials::{Account, CredentialStore, NewAccount, Role};
use crate::repositories::results::{NewResult, ResultFilter, ResultRow, ResultsLedger};
use crate::repositories::symptoms::SymptomStore;
use crate::session::{Capability, Principal, Session};
use crate::{YbocsError, YbocsResult};
use std::collections::BTreeSet;
use ybocs_types::Login;

/// One patient's checklist, as shown in the administrator overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientSymptoms {
    pub login: Login,
    pub symptoms: BTreeSet<SymptomKey>,
}

#[derive(Debug)]
pub struct ClinicService {
    credentials: CredentialStore,
    symptoms: SymptomStore,
    ledger: ResultsLedger,
}

impl ClinicService {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            credentials: CredentialStore::new(cfg.credentials_file()),
            symptoms: SymptomStore::new(cfg.users_dir()),
            ledger: ResultsLedger::new(cfg.results_file()),
        }
    }

    /// Direct store access for operator tooling that runs without a session.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn symptom_store(&self) -> &SymptomStore {
        &self.symptoms
    }

    pub fn ledger(&self) -> &ResultsLedger {
        &self.ledger
    }

    pub fn login<'s>(
        &self,
        session: &'s mut Session,
        login: &str,
        password: &str,
    ) -> YbocsResult<&'s Principal> {
        session.login(&self.credentials, login, password)
    }

    /// The signed-in principal with its current role and reset flag.
    ///
    /// Unlike the gated operations this succeeds while a reset is pending.
    pub fn principal(&self, session: &Session) -> YbocsResult<Principal> {
        Ok(self.current(session)?.principal()?.clone())
    }

    pub fn complete_reset(
        &self,
        session: &mut Session,
        new_password: &str,
        confirm: &str,
    ) -> YbocsResult<()> {
        session.complete_reset(&self.credentials, new_password, confirm)
    }

    pub fn symptoms(&self, session: &Session, patient: &Login) -> YbocsResult<BTreeSet<SymptomKey>> {
        self.current(session)?
            .authorize_patient(Capability::ManageSymptoms, patient)?;
        Ok(self.symptoms.get(patient))
    }

    /// Replaces a patient's checklist.
    ///
    /// The patient must be an existing account with the `user` role.
    pub fn replace_symptoms(
        &self,
        session: &Session,
        patient: &Login,
        keys: &BTreeSet<SymptomKey>,
    ) -> YbocsResult<()> {
        let session = self.current(session)?;
        let principal = session.authorize_patient(Capability::ManageSymptoms, patient)?;
        self.require_patient_account(patient)?;

        self.symptoms.replace(patient, keys)?;
        tracing::info!(actor = %principal.login, patient = %patient, "symptoms saved");
        Ok(())
    }

    /// Records a questionnaire for the signed-in patient.
    ///
    /// # Errors
    ///
    /// - [`YbocsError::Forbidden`] for administrator sessions
    /// - [`YbocsError::Validation`] if `symptom` is not on the patient's checklist,
    ///   or the scores are invalid
    pub fn submit_assessment(
        &self,
        session: &Session,
        symptom: &SymptomKey,
        scores: &[u8],
        total: Option<u8>,
    ) -> YbocsResult<ResultRow> {
        let session = self.current(session)?;
        let principal = session.require(Capability::SubmitAssessment)?;

        if !self.symptoms.get(&principal.login).contains(symptom) {
            return Err(YbocsError::Validation(format!(
                "symptom '{}' is not on the checklist of {}",
                symptom, principal.login
            )));
        }

        self.ledger.append(NewResult {
            login: principal.login.clone(),
            role: principal.role,
            symptom: symptom.clone(),
            scores: scores.to_vec(),
            total,
            recorded_at: None,
        })
    }

    /// Ledger rows visible to the session.
    ///
    /// A patient session without a login filter sees its own rows; naming another
    /// login is refused.
    pub fn query_results(
        &self,
        session: &Session,
        mut filter: ResultFilter,
    ) -> YbocsResult<Vec<ResultRow>> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ViewResults)?;

        if let Some(patient) = &filter.login {
            session.authorize_patient(Capability::ViewResults, patient)?;
        } else if principal.role != Role::Admin {
            filter.login = Some(principal.login.clone());
        }

        self.ledger.query(&filter)
    }

    /// Logins selectable in the results view.
    pub fn result_patients(&self, session: &Session) -> YbocsResult<Vec<Login>> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ViewResults)?;
        if principal.role == Role::Admin {
            self.ledger.patients()
        } else {
            Ok(vec![principal.login.clone()])
        }
    }

    /// Symptom keys present in `patient`'s ledger rows.
    pub fn result_symptoms(&self, session: &Session, patient: &Login) -> YbocsResult<Vec<String>> {
        self.current(session)?
            .authorize_patient(Capability::ViewResults, patient)?;
        self.ledger.symptoms_for(patient)
    }

    pub fn export_results(&self, session: &Session) -> YbocsResult<Vec<u8>> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ExportResults)?;
        let bytes = self.ledger.export_csv()?;
        tracing::info!(actor = %principal.login, bytes = bytes.len(), "ledger exported");
        Ok(bytes)
    }

    pub fn create_account(&self, session: &Session, new: NewAccount) -> YbocsResult<Account> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ManageAccounts)?;
        tracing::debug!(actor = %principal.login, login = %new.login, "creating account");
        self.credentials.create(new)
    }

    pub fn list_accounts(&self, session: &Session) -> YbocsResult<Vec<Account>> {
        self.current(session)?.require(Capability::ManageAccounts)?;
        self.credentials.list()
    }

    pub fn set_role(&self, session: &Session, login: &Login, role: Role) -> YbocsResult<Account> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ManageAccounts)?;
        tracing::debug!(actor = %principal.login, login = %login, "changing role");
        self.credentials.set_role(login, role)
    }

    /// Assigns a temporary password and forces a reset at next login.
    pub fn reset_password(
        &self,
        session: &Session,
        login: &Login,
        temporary_password: &str,
    ) -> YbocsResult<Account> {
        let session = self.current(session)?;
        let principal = session.require(Capability::ManageAccounts)?;
        tracing::debug!(actor = %principal.login, login = %login, "assigning temporary password");
        self.credentials.set_temporary_password(login, temporary_password)
    }

    /// Every patient account with its current checklist, sorted by login.
    ///
    /// Patients without a checklist file are included with an empty set.
    pub fn patient_symptoms_overview(&self, session: &Session) -> YbocsResult<Vec<PatientSymptoms>> {
        self.current(session)?.require(Capability::ManageAccounts)?;

        let mut patients: BTreeSet<Login> = self
            .credentials
            .list()?
            .into_iter()
            .filter(|account| account.role == Role::User)
            .map(|account| account.login)
            .collect();
        patients.extend(
            self.symptoms
                .list_patients()?
                .into_iter()
                .map(|(login, _)| login),
        );

        Ok(patients
            .into_iter()
            .map(|login| PatientSymptoms {
                symptoms: self.symptoms.get(&login),
                login,
            })
            .collect())
    }

    /// The session re-read against the credential store.
    fn current(&self, session: &Session) -> YbocsResult<Session> {
        session.refreshed(&self.credentials)
    }

    fn require_patient_account(&self, patient: &Login) -> YbocsResult<()> {
        match self.credentials.get(patient)? {
            Some(account) if account.role == Role::User => Ok(()),
            Some(_) => Err(YbocsError::Validation(format!(
                "{patient} is not a patient account"
            ))),
            None => Err(YbocsError::UnknownAccount(patient.to_string())),
        }
    }
}

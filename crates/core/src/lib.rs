//! # Y-BOCS Core
//!
//! Core business logic for the Y-BOCS clinic record system.
//!
//! This crate contains the data operations and flat-file storage:
//! - Accounts in a YAML credential document, with Argon2 password hashes
//! - Sessions with role gating and forced password reset
//! - Per-patient symptom checklists under `<data_dir>/users/<login>/objawy.json`
//! - The append-only results ledger `<data_dir>/wyniki.csv`
//! - Static symptom catalog and Y-BOCS questionnaire text
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and `cli`.

pub mod catalog;
pub mod clinic;
pub mod config;
pub mod constants;
pub mod error;
pub mod password;
pub mod questionnaire;
pub mod repositories;
pub mod session;
pub mod validation;

pub use catalog::{SymptomEntry, SymptomGroup, SymptomKey, SYMPTOM_GROUPS};
pub use clinic::{ClinicService, PatientSymptoms};
pub use config::CoreConfig;
pub use error::{YbocsError, YbocsResult};
pub use questionnaire::{SeverityBand, YbocsItem, YbocsScores, YBOCS_ITEMS};
pub use repositories::credentials::{Account, CredentialStore, NewAccount, Role};
pub use repositories::results::{
    severity_series, DateFilter, NewResult, ResultFilter, ResultRow, ResultsLedger, SeverityPoint,
};
pub use repositories::symptoms::SymptomStore;
pub use session::{Capability, Principal, Session};
pub use ybocs_types::{Login, NonEmptyText, TextError};

//! Constants used throughout the Y-BOCS core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default location of the credential document.
pub const DEFAULT_CREDENTIALS_FILE: &str = "users.yaml";

/// Directory (under the data dir) holding one sub-directory per patient login.
pub const USERS_DIR_NAME: &str = "users";

/// Filename of a patient's symptom checklist.
pub const SYMPTOMS_FILENAME: &str = "objawy.json";

/// Filename of the results ledger.
pub const RESULTS_FILENAME: &str = "wyniki.csv";

/// Filename offered for the administrative ledger export.
pub const EXPORT_FILENAME: &str = "wyniki_ocd.csv";

/// Number of Y-BOCS items in one questionnaire.
pub const YBOCS_ITEM_COUNT: usize = 10;

/// Highest score a single Y-BOCS item can take.
pub const YBOCS_MAX_ITEM_SCORE: u8 = 4;

/// Highest possible Y-BOCS total.
pub const YBOCS_MAX_TOTAL: u8 = 40;

/// Marker that separates a group from free text in a custom symptom key.
pub const CUSTOM_SYMPTOM_MARKER: &str = "INNE";

/// Email domain used when an account is provisioned without an address.
pub const DEFAULT_EMAIL_DOMAIN: &str = "example.com";

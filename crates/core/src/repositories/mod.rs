//! Storage modules.
//!
//! One store per persisted artifact: the credential document, the per-patient
//! symptom files, and the results ledger.

pub mod credentials;
pub mod results;
pub(crate) mod shared;
pub mod symptoms;

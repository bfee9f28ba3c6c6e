//! Request and response bodies.
//!
//! Core types are converted at the boundary so that the OpenAPI schema does not
//! depend on core internals.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use ybocs_core::{
    Account, PatientSymptoms, Principal, ResultRow, SeverityPoint, SymptomGroup, SymptomKey,
    YbocsItem,
};

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    pub login: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct SessionRes {
    /// Bearer token for subsequent requests.
    pub token: String,
    pub login: String,
    pub display_name: String,
    pub role: String,
    /// When true, only `POST /auth/reset` and `POST /auth/logout` are accepted.
    pub force_password_reset: bool,
}

impl From<&Principal> for SessionRes {
    fn from(p: &Principal) -> Self {
        Self {
            token: p.session_id.to_string(),
            login: p.login.to_string(),
            display_name: p.display_name.clone(),
            role: p.role.to_string(),
            force_password_reset: p.force_password_reset,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordReq {
    pub new_password: String,
    pub confirm: String,
}

#[derive(Serialize, ToSchema)]
pub struct SymptomGroupRes {
    pub name: String,
    pub items: Vec<String>,
}

impl From<&SymptomGroup> for SymptomGroupRes {
    fn from(g: &SymptomGroup) -> Self {
        Self {
            name: g.name.to_string(),
            items: g.items.iter().map(|i| i.to_string()).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuestionRes {
    /// 1-based item number (q1..q10).
    pub number: usize,
    pub title: String,
    /// Anchor descriptions for scores 0 to 4.
    pub anchors: Vec<String>,
}

impl QuestionRes {
    pub fn new(number: usize, item: &YbocsItem) -> Self {
        Self {
            number,
            title: item.title.to_string(),
            anchors: item.anchors.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SymptomRes {
    pub key: String,
    pub group: String,
    pub label: String,
}

impl From<&SymptomKey> for SymptomRes {
    fn from(k: &SymptomKey) -> Self {
        Self {
            key: k.to_string(),
            group: k.group().to_string(),
            label: k.label(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PatientSymptomsRes {
    pub login: String,
    pub symptoms: Vec<SymptomRes>,
}

impl From<&PatientSymptoms> for PatientSymptomsRes {
    fn from(p: &PatientSymptoms) -> Self {
        Self {
            login: p.login.to_string(),
            symptoms: p.symptoms.iter().map(SymptomRes::from).collect(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ReplaceSymptomsReq {
    /// Symptom keys: `<group>:<item>` or `<group>:INNE:<text>`.
    pub symptoms: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAssessmentReq {
    pub symptom: String,
    /// Scores q1..q10, each 0 to 4.
    pub scores: Vec<u8>,
    /// Optional client-side total; rejected if it disagrees with the scores.
    pub total: Option<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct ResultRowRes {
    pub timestamp: String,
    pub date: String,
    pub login: String,
    pub role: String,
    pub symptom: String,
    pub symptom_label: String,
    pub scores: Vec<u8>,
    pub total: u8,
    pub band: String,
}

impl From<&ResultRow> for ResultRowRes {
    fn from(r: &ResultRow) -> Self {
        // Rows written under an older catalog keep their raw key as label.
        let symptom_label = SymptomKey::parse(&r.symptom)
            .map(|k| k.label())
            .unwrap_or_else(|_| r.symptom.clone());

        Self {
            timestamp: r.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            date: r.date.to_string(),
            login: r.login.to_string(),
            role: r.role.to_string(),
            symptom: r.symptom.clone(),
            symptom_label,
            scores: r.scores.items().to_vec(),
            total: r.total,
            band: r.band().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SeverityPointRes {
    pub date: String,
    pub total: u8,
    pub band: String,
}

impl From<&SeverityPoint> for SeverityPointRes {
    fn from(p: &SeverityPoint) -> Self {
        Self {
            date: p.date.to_string(),
            total: p.total,
            band: p.band.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ResultsRes {
    pub rows: Vec<ResultRowRes>,
    /// Totals in chronological order, for plotting.
    pub series: Vec<SeverityPointRes>,
}

/// Filters for `GET /results`. `date` and `start`/`end` are mutually exclusive.
#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ResultsQuery {
    /// Patient login; patients may only name themselves.
    pub login: Option<String>,
    /// Single day, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Inclusive range start, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// Inclusive range end, `YYYY-MM-DD`.
    pub end: Option<String>,
    /// Exact symptom key.
    pub symptom: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountRes {
    pub login: String,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub force_password_reset: bool,
}

impl From<&Account> for AccountRes {
    fn from(a: &Account) -> Self {
        Self {
            login: a.login.to_string(),
            display_name: a.display_name.clone(),
            email: a.email.clone(),
            role: a.role.to_string(),
            force_password_reset: a.force_password_reset,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAccountReq {
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
    pub initial_password: String,
    /// `admin` or `user`; defaults to `user`.
    pub role: Option<String>,
    /// Defaults to true.
    pub force_password_reset: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetRoleReq {
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminResetPasswordReq {
    pub temporary_password: String,
}

//! # API REST
//!
//! REST API implementation for the Y-BOCS clinic service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Bearer session tokens mapped onto core [`Session`]s
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! All rules live in `ybocs-core`; handlers only translate.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;
use ybocs_core::{
    constants::EXPORT_FILENAME, severity_series, ClinicService, DateFilter, Login, NewAccount,
    NonEmptyText, ResultFilter, Role, Session, SymptomKey, SYMPTOM_GROUPS, YBOCS_ITEMS,
};

use dto::*;
use error::{ApiError, ErrorBody};

/// Application state for the REST API server
///
/// Holds the clinic service and the live sessions, keyed by bearer token.
#[derive(Clone)]
pub struct AppState {
    service: Arc<ClinicService>,
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl AppState {
    pub fn new(service: ClinicService) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolves the bearer token to a copy of its session.
    async fn session(&self, headers: &HeaderMap) -> Result<Session, ApiError> {
        let token = bearer_token(headers)?;
        let sessions = self.sessions.lock().await;
        sessions
            .get(&token)
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("unknown or expired session".into()))
    }
}

/// Extracts the `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    Uuid::parse_str(token.trim())
        .map_err(|_| ApiError::Unauthorized("malformed bearer token".into()))
}

fn parse_login(raw: &str) -> Result<Login, ApiError> {
    Ok(Login::parse(raw)?)
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} must be YYYY-MM-DD, got '{raw}'")))
}

impl ResultsQuery {
    fn into_filter(self) -> Result<ResultFilter, ApiError> {
        let dates = match (self.date, self.start, self.end) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ApiError::BadRequest(
                    "use either date or start/end, not both".into(),
                ))
            }
            (Some(day), None, None) => Some(DateFilter::Day(parse_date("date", &day)?)),
            (None, None, None) => None,
            (None, start, end) => Some(DateFilter::Range {
                start: start
                    .map(|s| parse_date("start", &s))
                    .transpose()?
                    .unwrap_or(NaiveDate::MIN),
                end: end
                    .map(|e| parse_date("end", &e))
                    .transpose()?
                    .unwrap_or(NaiveDate::MAX),
            }),
        };

        Ok(ResultFilter {
            login: self.login.as_deref().map(parse_login).transpose()?,
            dates,
            symptom: self.symptom.filter(|s| !s.is_empty()),
        })
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        login,
        reset_password,
        logout,
        whoami,
        symptom_catalog,
        questionnaire,
        get_symptoms,
        replace_symptoms,
        submit_assessment,
        query_results,
        result_patients,
        result_symptoms,
        export_results,
        list_accounts,
        create_account,
        set_role,
        admin_reset_password,
        symptoms_overview,
    ),
    components(schemas(
        HealthRes,
        ErrorBody,
        LoginReq,
        SessionRes,
        ResetPasswordReq,
        SymptomGroupRes,
        QuestionRes,
        SymptomRes,
        PatientSymptomsRes,
        ReplaceSymptomsReq,
        SubmitAssessmentReq,
        ResultRowRes,
        SeverityPointRes,
        ResultsRes,
        AccountRes,
        CreateAccountReq,
        SetRoleReq,
        AdminResetPasswordReq,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/reset", post(reset_password))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(whoami))
        .route("/catalog/symptoms", get(symptom_catalog))
        .route("/catalog/questionnaire", get(questionnaire))
        .route(
            "/patients/:login/symptoms",
            get(get_symptoms).put(replace_symptoms),
        )
        .route("/assessments", post(submit_assessment))
        .route("/results", get(query_results))
        .route("/results/patients", get(result_patients))
        .route("/results/patients/:login/symptoms", get(result_symptoms))
        .route("/results/export", get(export_results))
        .route("/admin/accounts", get(list_accounts).post(create_account))
        .route("/admin/accounts/:login/role", put(set_role))
        .route("/admin/accounts/:login/reset", post(admin_reset_password))
        .route("/admin/symptoms", get(symptoms_overview))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Y-BOCS REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Session opened", body = SessionRes),
        (status = 401, description = "Invalid login or password", body = ErrorBody)
    )
)]
/// Open a session
///
/// Returns a bearer token. If the account must change its password first,
/// `force_password_reset` is true and every other endpoint answers 428 until
/// `POST /auth/reset` succeeds.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<SessionRes>, ApiError> {
    let mut session = Session::new();
    let res = {
        let principal = state.service.login(&mut session, &req.login, &req.password)?;
        SessionRes::from(principal)
    };

    let token = session.principal()?.session_id;
    state.sessions.lock().await.insert(token, session);
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/auth/reset",
    request_body = ResetPasswordReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = SessionRes),
        (status = 400, description = "Empty or mismatched password", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Set a new password for the current session's account
#[axum::debug_handler]
async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordReq>,
) -> Result<Json<SessionRes>, ApiError> {
    let token = bearer_token(&headers)?;
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&token)
        .ok_or_else(|| ApiError::Unauthorized("unknown or expired session".into()))?;

    state
        .service
        .complete_reset(session, &req.new_password, &req.confirm)?;
    let principal = state.service.principal(session)?;
    Ok(Json(SessionRes::from(&principal)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Close the current session
#[axum::debug_handler]
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;
    match state.sessions.lock().await.remove(&token) {
        Some(mut session) => {
            session.logout();
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::Unauthorized("unknown or expired session".into())),
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current session", body = SessionRes),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Describe the current session
///
/// Available while a password reset is pending.
#[axum::debug_handler]
async fn whoami(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionRes>, ApiError> {
    let session = state.session(&headers).await?;
    let principal = state.service.principal(&session)?;
    Ok(Json(SessionRes::from(&principal)))
}

#[utoipa::path(
    get,
    path = "/catalog/symptoms",
    responses(
        (status = 200, description = "Symptom checklist groups", body = [SymptomGroupRes])
    )
)]
/// Symptom checklist catalog
#[axum::debug_handler]
async fn symptom_catalog(State(_state): State<AppState>) -> Json<Vec<SymptomGroupRes>> {
    Json(SYMPTOM_GROUPS.iter().map(SymptomGroupRes::from).collect())
}

#[utoipa::path(
    get,
    path = "/catalog/questionnaire",
    responses(
        (status = 200, description = "Y-BOCS items with anchors", body = [QuestionRes])
    )
)]
/// Y-BOCS questionnaire items
#[axum::debug_handler]
async fn questionnaire(State(_state): State<AppState>) -> Json<Vec<QuestionRes>> {
    Json(
        YBOCS_ITEMS
            .iter()
            .enumerate()
            .map(|(idx, item)| QuestionRes::new(idx + 1, item))
            .collect(),
    )
}

#[utoipa::path(
    get,
    path = "/patients/{login}/symptoms",
    params(("login" = String, Path, description = "Patient login")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Assigned symptoms", body = PatientSymptomsRes),
        (status = 403, description = "Not allowed for this patient", body = ErrorBody),
        (status = 428, description = "Password reset required", body = ErrorBody)
    )
)]
/// Read a patient's symptom checklist
#[axum::debug_handler]
async fn get_symptoms(
    State(state): State<AppState>,
    AxumPath(login): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<PatientSymptomsRes>, ApiError> {
    let session = state.session(&headers).await?;
    let patient = parse_login(&login)?;
    let symptoms = state.service.symptoms(&session, &patient)?;

    Ok(Json(PatientSymptomsRes {
        login: patient.to_string(),
        symptoms: symptoms.iter().map(SymptomRes::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/patients/{login}/symptoms",
    params(("login" = String, Path, description = "Patient login")),
    request_body = ReplaceSymptomsReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Checklist replaced", body = PatientSymptomsRes),
        (status = 400, description = "Malformed symptom key", body = ErrorBody),
        (status = 403, description = "Not allowed for this patient", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Replace a patient's whole symptom checklist
#[axum::debug_handler]
async fn replace_symptoms(
    State(state): State<AppState>,
    AxumPath(login): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<ReplaceSymptomsReq>,
) -> Result<Json<PatientSymptomsRes>, ApiError> {
    let session = state.session(&headers).await?;
    let patient = parse_login(&login)?;
    let keys = req
        .symptoms
        .iter()
        .map(|raw| SymptomKey::parse(raw))
        .collect::<Result<BTreeSet<_>, _>>()?;

    state.service.replace_symptoms(&session, &patient, &keys)?;

    Ok(Json(PatientSymptomsRes {
        login: patient.to_string(),
        symptoms: keys.iter().map(SymptomRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/assessments",
    request_body = SubmitAssessmentReq,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Assessment recorded", body = ResultRowRes),
        (status = 400, description = "Invalid scores or unassigned symptom", body = ErrorBody),
        (status = 403, description = "Administrators cannot submit", body = ErrorBody)
    )
)]
/// Record a Y-BOCS assessment for the signed-in patient
#[axum::debug_handler]
async fn submit_assessment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitAssessmentReq>,
) -> Result<(StatusCode, Json<ResultRowRes>), ApiError> {
    let session = state.session(&headers).await?;
    let symptom = SymptomKey::parse(&req.symptom)?;
    let row = state
        .service
        .submit_assessment(&session, &symptom, &req.scores, req.total)?;

    Ok((StatusCode::CREATED, Json(ResultRowRes::from(&row))))
}

#[utoipa::path(
    get,
    path = "/results",
    params(ResultsQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Matching ledger rows", body = ResultsRes),
        (status = 400, description = "Malformed filter", body = ErrorBody),
        (status = 403, description = "Not allowed for this patient", body = ErrorBody)
    )
)]
/// Query the results ledger
///
/// Patients see only their own rows.
#[axum::debug_handler]
async fn query_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ResultsRes>, ApiError> {
    let session = state.session(&headers).await?;
    let rows = state
        .service
        .query_results(&session, query.into_filter()?)?;

    Ok(Json(ResultsRes {
        series: severity_series(&rows)
            .iter()
            .map(SeverityPointRes::from)
            .collect(),
        rows: rows.iter().map(ResultRowRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/results/patients",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logins with ledger rows", body = [String])
    )
)]
/// Patients selectable in the results view
#[axum::debug_handler]
async fn result_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    let session = state.session(&headers).await?;
    let logins = state.service.result_patients(&session)?;
    Ok(Json(logins.iter().map(|l| l.to_string()).collect()))
}

#[utoipa::path(
    get,
    path = "/results/patients/{login}/symptoms",
    params(("login" = String, Path, description = "Patient login")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Symptom keys present in the patient's rows", body = [String]),
        (status = 403, description = "Not allowed for this patient", body = ErrorBody)
    )
)]
/// Symptoms a patient has been scored on
#[axum::debug_handler]
async fn result_symptoms(
    State(state): State<AppState>,
    AxumPath(login): AxumPath<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    let session = state.session(&headers).await?;
    let patient = parse_login(&login)?;
    Ok(Json(state.service.result_symptoms(&session, &patient)?))
}

#[utoipa::path(
    get,
    path = "/results/export",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Full ledger as CSV", body = String, content_type = "text/csv"),
        (status = 403, description = "Administrators only", body = ErrorBody)
    )
)]
/// Download the full results ledger
#[axum::debug_handler]
async fn export_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.session(&headers).await?;
    let bytes = state.service.export_results(&session)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts", body = [AccountRes]),
        (status = 403, description = "Administrators only", body = ErrorBody)
    )
)]
/// List accounts
#[axum::debug_handler]
async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AccountRes>>, ApiError> {
    let session = state.session(&headers).await?;
    let accounts = state.service.list_accounts(&session)?;
    Ok(Json(accounts.iter().map(AccountRes::from).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/accounts",
    request_body = CreateAccountReq,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Account created", body = AccountRes),
        (status = 400, description = "Invalid login, name or password", body = ErrorBody),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 409, description = "Login already exists", body = ErrorBody)
    )
)]
/// Provision an account
///
/// New accounts must change their password at first login unless
/// `force_password_reset` is explicitly false.
#[axum::debug_handler]
async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountReq>,
) -> Result<(StatusCode, Json<AccountRes>), ApiError> {
    let session = state.session(&headers).await?;

    let role = match req.role.as_deref() {
        Some(raw) => raw.parse::<Role>()?,
        None => Role::User,
    };
    let new = NewAccount {
        login: parse_login(&req.login)?,
        display_name: NonEmptyText::new(&req.display_name)?,
        email: req.email,
        initial_password: req.initial_password,
        role,
        force_password_reset: req.force_password_reset.unwrap_or(true),
    };

    let account = state.service.create_account(&session, new)?;
    Ok((StatusCode::CREATED, Json(AccountRes::from(&account))))
}

#[utoipa::path(
    put,
    path = "/admin/accounts/{login}/role",
    params(("login" = String, Path, description = "Account login")),
    request_body = SetRoleReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Role changed", body = AccountRes),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody)
    )
)]
/// Change an account's role
#[axum::debug_handler]
async fn set_role(
    State(state): State<AppState>,
    AxumPath(login): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<SetRoleReq>,
) -> Result<Json<AccountRes>, ApiError> {
    let session = state.session(&headers).await?;
    let role: Role = req.role.parse()?;
    let account = state
        .service
        .set_role(&session, &parse_login(&login)?, role)?;
    Ok(Json(AccountRes::from(&account)))
}

#[utoipa::path(
    post,
    path = "/admin/accounts/{login}/reset",
    params(("login" = String, Path, description = "Account login")),
    request_body = AdminResetPasswordReq,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Temporary password set", body = AccountRes),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody)
    )
)]
/// Assign a temporary password and force a reset at next login
#[axum::debug_handler]
async fn admin_reset_password(
    State(state): State<AppState>,
    AxumPath(login): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<AdminResetPasswordReq>,
) -> Result<Json<AccountRes>, ApiError> {
    let session = state.session(&headers).await?;
    let account = state.service.reset_password(
        &session,
        &parse_login(&login)?,
        &req.temporary_password,
    )?;
    Ok(Json(AccountRes::from(&account)))
}

#[utoipa::path(
    get,
    path = "/admin/symptoms",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Every patient's checklist", body = [PatientSymptomsRes]),
        (status = 403, description = "Administrators only", body = ErrorBody)
    )
)]
/// Symptom checklists of all patients
#[axum::debug_handler]
async fn symptoms_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PatientSymptomsRes>>, ApiError> {
    let session = state.session(&headers).await?;
    let overview = state.service.patient_symptoms_overview(&session)?;
    Ok(Json(overview.iter().map(PatientSymptomsRes::from).collect()))
}

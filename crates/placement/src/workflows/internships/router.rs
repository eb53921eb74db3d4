use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, PostingDraft, PostingId, PostingLevel, PostingStatus, RepId, Role, StudentId,
};
use super::error::PlacementError;
use super::filter::{FilterConfig, NonNegotiables};
use super::ranking::RankingWeights;
use super::repository::{NotificationSink, PlacementStore};
use super::service::{ListingRequest, PlacementService};

/// Header carrying the caller's account id. Authentication happens upstream.
pub const ACTOR_HEADER: &str = "x-actor-id";

type SharedService<S, N> = Arc<PlacementService<S, N>>;

/// Router builder exposing posting and application endpoints.
pub fn placement_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/postings",
            get(list_handler::<S, N>).post(create_posting_handler::<S, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/visibility",
            post(visibility_handler::<S, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/review",
            post(review_handler::<S, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/waitlist",
            post(waitlist_handler::<S, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/applications",
            get(posting_applications_handler::<S, N>),
        )
        .route(
            "/api/v1/postings/:posting_id/explain",
            get(explain_handler::<S, N>),
        )
        .route("/api/v1/bulk-approvals", post(bulk_approve_handler::<S, N>))
        .route(
            "/api/v1/bulk-approvals/undo",
            post(undo_bulk_approval_handler::<S, N>),
        )
        .route(
            "/api/v1/representatives/pending",
            get(pending_representatives_handler::<S, N>),
        )
        .route(
            "/api/v1/representatives/approvals",
            post(approve_representative_handler::<S, N>),
        )
        .route("/api/v1/withdrawals", get(withdrawals_handler::<S, N>))
        .route("/api/v1/applications", post(apply_handler::<S, N>))
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/confirm",
            post(confirm_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal",
            post(withdrawal_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal/resolve",
            post(resolve_withdrawal_handler::<S, N>),
        )
        .with_state(service)
}

/// Query string accepted by the listing endpoint. List values are comma separated.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListingQuery {
    status: Option<PostingStatus>,
    level: Option<PostingLevel>,
    major: Option<String>,
    company: Option<String>,
    keyword: Option<String>,
    levels: Option<String>,
    recommend: Option<bool>,
    ranking_keyword: Option<String>,
    ranking_levels: Option<String>,
    w_major: Option<u32>,
    w_closing_soon: Option<u32>,
    w_level_fit: Option<u32>,
    w_keyword: Option<u32>,
    must_match_major: Option<bool>,
    title_keywords: Option<String>,
}

fn parse_levels(raw: Option<&str>) -> Result<BTreeSet<PostingLevel>, String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| match value.to_ascii_uppercase().as_str() {
            "BASIC" => Ok(PostingLevel::Basic),
            "INTERMEDIATE" => Ok(PostingLevel::Intermediate),
            "ADVANCED" => Ok(PostingLevel::Advanced),
            _ => Err(format!("unknown posting level '{value}'")),
        })
        .collect()
}

impl ListingQuery {
    fn into_request(self) -> Result<ListingRequest, String> {
        let filter = FilterConfig {
            status: self.status,
            level: self.level,
            major: self.major,
            company: self.company,
            keyword: self.keyword,
            levels: parse_levels(self.levels.as_deref())?,
        };

        let defaults = RankingWeights::default();
        let mut weights = RankingWeights {
            major: self.w_major.unwrap_or(defaults.major),
            closing_soon: self.w_closing_soon.unwrap_or(defaults.closing_soon),
            level_fit: self.w_level_fit.unwrap_or(defaults.level_fit),
            keyword: self.w_keyword.unwrap_or(defaults.keyword),
            ..defaults
        }
        .with_levels(parse_levels(self.ranking_levels.as_deref())?);
        weights.ranking_keyword = self.ranking_keyword;

        let non_negotiables = if self.must_match_major.is_some() || self.title_keywords.is_some() {
            let mut rules = NonNegotiables {
                must_match_major: self.must_match_major.unwrap_or(false),
                ..NonNegotiables::default()
            };
            for keyword in self.title_keywords.unwrap_or_default().split(',') {
                rules.add_keyword(keyword);
            }
            Some(rules)
        } else {
            None
        };

        Ok(ListingRequest {
            filter,
            weights,
            non_negotiables,
            recommendations: self.recommend.unwrap_or(true),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) posting_id: PostingId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub(crate) approve: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BulkApprovalRequest {
    #[serde(default)]
    pub(crate) except: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepresentativeApprovalRequest {
    pub(crate) rep_id: RepId,
}

pub(crate) fn status_for(error: &PlacementError) -> StatusCode {
    match error {
        PlacementError::Validation(_) | PlacementError::NotEligible { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlacementError::DuplicateApplication { .. }
        | PlacementError::ApplicationLimitExceeded { .. }
        | PlacementError::CapacityExceeded { .. }
        | PlacementError::InvalidStateTransition { .. }
        | PlacementError::PostingStateTransition { .. }
        | PlacementError::PlacementAlreadyConfirmed { .. } => StatusCode::CONFLICT,
        PlacementError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        PlacementError::NotFound { .. } => StatusCode::NOT_FOUND,
        PlacementError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: PlacementError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    (status_for(&error), Json(payload)).into_response()
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "error": text.into() }))).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, outcome: Result<T, PlacementError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Resolve the caller once per request.
fn actor<S, N>(service: &PlacementService<S, N>, headers: &HeaderMap) -> Result<Role, Response>
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let actor_id = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "missing x-actor-id header"))?;

    match service.resolve_role(actor_id) {
        Ok(role) => Ok(role),
        Err(PlacementError::NotFound { .. }) => Err(message(
            StatusCode::UNAUTHORIZED,
            format!("unknown actor '{actor_id}'"),
        )),
        Err(other) => Err(error_response(other)),
    }
}

fn wrong_role(role: &Role, action: &str) -> Response {
    message(
        StatusCode::FORBIDDEN,
        format!("a {} cannot {action}", role.label()),
    )
}

fn as_student(role: Role, action: &str) -> Result<StudentId, Response> {
    match role {
        Role::Student(profile) => Ok(profile.id),
        other => Err(wrong_role(&other, action)),
    }
}

fn as_representative(role: Role, action: &str) -> Result<RepId, Response> {
    match role {
        Role::Representative(profile) => Ok(profile.id),
        other => Err(wrong_role(&other, action)),
    }
}

fn as_staff(role: Role, action: &str) -> Result<(), Response> {
    match role {
        Role::Staff { .. } => Ok(()),
        other => Err(wrong_role(&other, action)),
    }
}

pub(crate) async fn list_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "browse postings")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    let request = match query.into_request() {
        Ok(request) => request,
        Err(reason) => return message(StatusCode::BAD_REQUEST, reason),
    };
    respond(StatusCode::OK, service.list_ranked(&student, &request))
}

pub(crate) async fn create_posting_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(draft): Json<PostingDraft>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let rep = match actor(&service, &headers).and_then(|role| as_representative(role, "create postings")) {
        Ok(rep) => rep,
        Err(response) => return response,
    };
    respond(StatusCode::CREATED, service.create_posting(&rep, draft))
}

pub(crate) async fn visibility_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(posting_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let rep = match actor(&service, &headers).and_then(|role| as_representative(role, "toggle visibility")) {
        Ok(rep) => rep,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.toggle_visibility(&rep, &PostingId(posting_id)),
    )
}

pub(crate) async fn review_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(posting_id): Path<String>,
    Json(decision): Json<DecisionRequest>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "review postings")) {
        return response;
    }
    respond(
        StatusCode::OK,
        service.review_posting(&PostingId(posting_id), decision.approve),
    )
}

pub(crate) async fn waitlist_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(posting_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "join a waitlist")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    let posting_id = PostingId(posting_id);
    match service.join_waitlist(&student, &posting_id) {
        Ok(joined) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "posting_id": posting_id,
                "student_id": student,
                "joined": joined,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn apply_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "apply")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        service.apply(&student, &request.posting_id),
    )
}

pub(crate) async fn application_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let role = match actor(&service, &headers) {
        Ok(role) => role,
        Err(response) => return response,
    };
    let application = match service.application(&ApplicationId(application_id)) {
        Ok(application) => application,
        Err(error) => return error_response(error),
    };

    let allowed = match &role {
        Role::Student(profile) => profile.id == application.student_id,
        Role::Representative(profile) => match service.posting(&application.posting_id) {
            Ok(posting) => posting.owner_rep_id == profile.id,
            Err(error) => return error_response(error),
        },
        Role::Staff { .. } => true,
    };

    if allowed {
        (StatusCode::OK, Json(application)).into_response()
    } else {
        error_response(PlacementError::Unauthorized {
            actor: role.label().to_string(),
            resource: format!("application {}", application.id),
        })
    }
}

pub(crate) async fn approve_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let rep = match actor(&service, &headers).and_then(|role| as_representative(role, "approve applications")) {
        Ok(rep) => rep,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.approve(&rep, &ApplicationId(application_id)),
    )
}

pub(crate) async fn reject_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let rep = match actor(&service, &headers).and_then(|role| as_representative(role, "reject applications")) {
        Ok(rep) => rep,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.reject(&rep, &ApplicationId(application_id)),
    )
}

pub(crate) async fn confirm_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "confirm placements")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.confirm(&student, &ApplicationId(application_id)),
    )
}

pub(crate) async fn withdrawal_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "request withdrawals")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    respond(
        StatusCode::ACCEPTED,
        service.request_withdrawal(&student, &ApplicationId(application_id)),
    )
}

pub(crate) async fn resolve_withdrawal_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(decision): Json<DecisionRequest>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "resolve withdrawals")) {
        return response;
    }
    respond(
        StatusCode::OK,
        service.resolve_withdrawal(&ApplicationId(application_id), decision.approve),
    )
}

pub(crate) async fn posting_applications_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(posting_id): Path<String>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let rep = match actor(&service, &headers).and_then(|role| as_representative(role, "review applicants")) {
        Ok(rep) => rep,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.applications_for_posting(&rep, &PostingId(posting_id)),
    )
}

/// Score breakdown for one posting, using the same weight parameters as the listing.
pub(crate) async fn explain_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Path(posting_id): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    let student = match actor(&service, &headers).and_then(|role| as_student(role, "explain rankings")) {
        Ok(student) => student,
        Err(response) => return response,
    };
    let request = match query.into_request() {
        Ok(request) => request,
        Err(reason) => return message(StatusCode::BAD_REQUEST, reason),
    };
    respond(
        StatusCode::OK,
        service.explain(&student, &PostingId(posting_id), &request.weights),
    )
}

pub(crate) async fn bulk_approve_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(request): Json<BulkApprovalRequest>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "bulk approve postings")) {
        return response;
    }
    match service.bulk_approve_postings(&request.except) {
        Ok(approved) => (StatusCode::OK, Json(json!({ "approved": approved }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn undo_bulk_approval_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "undo bulk approvals")) {
        return response;
    }
    match service.undo_bulk_approval() {
        Ok(restored) => (StatusCode::OK, Json(json!({ "restored": restored }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pending_representatives_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "list pending representatives")) {
        return response;
    }
    respond(StatusCode::OK, service.pending_representatives())
}

pub(crate) async fn approve_representative_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
    Json(request): Json<RepresentativeApprovalRequest>,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "approve representatives")) {
        return response;
    }
    respond(StatusCode::OK, service.approve_representative(&request.rep_id))
}

pub(crate) async fn withdrawals_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    headers: HeaderMap,
) -> Response
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    if let Err(response) = actor(&service, &headers).and_then(|role| as_staff(role, "review withdrawal requests")) {
        return response;
    }
    respond(StatusCode::OK, service.withdrawal_requests())
}

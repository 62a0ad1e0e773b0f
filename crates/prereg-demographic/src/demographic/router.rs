use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::domain::PreRegistrationId;
use super::dto::{DemographicRequest, PreRegIdsFilter};
use super::envelope::{ids, ErrorInfo, MainRequest, MainResponse};
use super::remote::{BookingClient, DocumentClient};
use super::repository::DemographicRepository;
use super::service::{DemographicError, DemographicService};

/// Header carrying the authenticated user id.
pub const ACTOR_HEADER: &str = "x-user-id";
const MISSING_ACTOR_CODE: &str = "PRG_CORE_REQ_001";
const MALFORMED_REQUEST_CODE: &str = "PRG_PAM_APP_014";

type SharedService<R, B, D> = Arc<DemographicService<R, B, D>>;

/// Router exposing the demographic operations under `/preregistration/v1`.
pub fn demographic_router<R, B, D>(service: SharedService<R, B, D>) -> Router
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    Router::new()
        .route(
            "/preregistration/v1/applications",
            post(create_handler::<R, B, D>).get(list_handler::<R, B, D>),
        )
        .route(
            "/preregistration/v1/applications/updatedTime",
            post(updated_time_handler::<R, B, D>),
        )
        .route(
            "/preregistration/v1/applications/status/:pre_registration_id",
            put(update_status_handler::<R, B, D>),
        )
        .route(
            "/preregistration/v1/applications/:pre_registration_id",
            get(fetch_handler::<R, B, D>)
                .put(update_handler::<R, B, D>)
                .delete(delete_handler::<R, B, D>),
        )
        .route(
            "/preregistration/v1/applications/:pre_registration_id/status",
            get(status_handler::<R, B, D>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct FetchQuery {
    #[serde(default)]
    pub(crate) details: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(rename = "pageIndex", default)]
    page_index: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusQuery {
    #[serde(rename = "statusCode")]
    status_code: String,
}

fn status_for(error: &DemographicError) -> StatusCode {
    match error {
        DemographicError::InvalidRequest(_) | DemographicError::IllegalArgument(_) => {
            StatusCode::BAD_REQUEST
        }
        DemographicError::RecordNotFound(_) | DemographicError::RecordNotFoundForIds => {
            StatusCode::NOT_FOUND
        }
        DemographicError::DeletionNotPermitted { .. } => StatusCode::CONFLICT,
        DemographicError::BookingDeletionFailed { .. }
        | DemographicError::DocumentDeletionFailed { .. } => StatusCode::BAD_GATEWAY,
        DemographicError::Hashing(_)
        | DemographicError::RecordFailedToDelete(_)
        | DemographicError::Repository(_)
        | DemographicError::Crypto(_)
        | DemographicError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(
    status: StatusCode,
    operation: &str,
    version: &str,
    code: &str,
    message: String,
) -> Response {
    let body: MainResponse<()> =
        MainResponse::failure(operation, version, vec![ErrorInfo::new(code, message)]);
    (status, Json(body)).into_response()
}

fn respond<T, R, B, D>(
    service: &SharedService<R, B, D>,
    operation: &str,
    result: Result<MainResponse<T>, DemographicError>,
) -> Response
where
    T: Serialize,
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    match result {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(error) => failure(
            status_for(&error),
            operation,
            &service.settings().version,
            error.error_code(),
            error.to_string(),
        ),
    }
}

/// Unwrap an extractor result, turning axum's plain-text rejection into an envelope.
fn extracted<T, E, R, B, D>(
    service: &SharedService<R, B, D>,
    operation: &str,
    result: Result<T, E>,
) -> Result<T, Response>
where
    E: std::fmt::Display,
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    result.map_err(|rejection| {
        failure(
            StatusCode::BAD_REQUEST,
            operation,
            &service.settings().version,
            MALFORMED_REQUEST_CODE,
            rejection.to_string(),
        )
    })
}

fn actor<R, B, D>(
    service: &SharedService<R, B, D>,
    headers: &HeaderMap,
    operation: &str,
) -> Result<String, Response>
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            failure(
                StatusCode::BAD_REQUEST,
                operation,
                &service.settings().version,
                MISSING_ACTOR_CODE,
                format!("missing {ACTOR_HEADER} header"),
            )
        })
}

pub(crate) async fn create_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    headers: HeaderMap,
    payload: Result<Json<MainRequest<DemographicRequest>>, JsonRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let actor = match actor(&service, &headers, ids::CREATE) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(request) = match extracted(&service, ids::CREATE, payload) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let result = service.create(request, &actor);
    respond(&service, ids::CREATE, result)
}

pub(crate) async fn update_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<MainRequest<DemographicRequest>>, JsonRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Path(pre_registration_id) = match extracted(&service, ids::UPDATE, path) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let actor = match actor(&service, &headers, ids::UPDATE) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(request) = match extracted(&service, ids::UPDATE, payload) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let id = PreRegistrationId(pre_registration_id);
    let result = service.update(&id, request, &actor);
    respond(&service, ids::UPDATE, result)
}

pub(crate) async fn fetch_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<FetchQuery>, QueryRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Path(pre_registration_id) = match extracted(&service, ids::RETRIEVE_DETAILS, path) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Query(query) = match extracted(&service, ids::RETRIEVE_DETAILS, query) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let include_details = query.details.unwrap_or(true);
    let operation = if include_details {
        ids::RETRIEVE_DETAILS
    } else {
        ids::RETRIEVE_BASIC
    };
    let id = PreRegistrationId(pre_registration_id);
    let result = service.fetch(&id, include_details);
    respond(&service, operation, result)
}

pub(crate) async fn status_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Path(pre_registration_id) = match extracted(&service, ids::RETRIEVE_STATUS, path) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let actor = match actor(&service, &headers, ids::RETRIEVE_STATUS) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = PreRegistrationId(pre_registration_id);
    let result = service.application_status(&id, &actor);
    respond(&service, ids::RETRIEVE_STATUS, result)
}

pub(crate) async fn list_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let actor = match actor(&service, &headers, ids::RETRIEVE_BASIC) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Query(query) = match extracted(&service, ids::RETRIEVE_BASIC, query) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let page_index = query.page_index.unwrap_or_else(|| "0".to_string());
    let result = service.list_by_creator(&actor, &page_index).await;
    respond(&service, ids::RETRIEVE_BASIC, result)
}

pub(crate) async fn update_status_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Path(pre_registration_id) = match extracted(&service, ids::UPDATE_STATUS, path) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let actor = match actor(&service, &headers, ids::UPDATE_STATUS) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Query(query) = match extracted(&service, ids::UPDATE_STATUS, query) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let id = PreRegistrationId(pre_registration_id);
    let result = service.update_status(&id, &query.status_code, &actor);
    respond(&service, ids::UPDATE_STATUS, result)
}

pub(crate) async fn updated_time_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    payload: Result<Json<MainRequest<PreRegIdsFilter>>, JsonRejection>,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Json(request) = match extracted(&service, ids::RETRIEVE_DATE, payload) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let result = service.batch_status_by_ids(&request.request);
    respond(&service, ids::RETRIEVE_DATE, result)
}

pub(crate) async fn delete_handler<R, B, D>(
    State(service): State<SharedService<R, B, D>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Response
where
    R: DemographicRepository + 'static,
    B: BookingClient + 'static,
    D: DocumentClient + 'static,
{
    let Path(pre_registration_id) = match extracted(&service, ids::DELETE, path) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let actor = match actor(&service, &headers, ids::DELETE) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let id = PreRegistrationId(pre_registration_id);
    let result = service.delete_individual(&id, &actor).await;
    respond(&service, ids::DELETE, result)
}

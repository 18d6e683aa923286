//! Privacy consent and data-request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use hub_core::error::AppError;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::{
        AdvanceDataRequest, ConsentResponse, DataRequestResponse, DataRequestState,
        GrantConsentRequest, OpenDataRequest,
    },
    AppState,
};

/// Grant a consent for the caller.
pub async fn grant_consent(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<GrantConsentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let consent = state
        .consents
        .grant(&ctx, req.consent_type, req.version)
        .await?;
    Ok((StatusCode::CREATED, Json(ConsentResponse::from(consent))))
}

/// Revoke one of the caller's consents. Idempotent.
pub async fn revoke_consent(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(consent_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.consents.revoke(&ctx, consent_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's consents.
pub async fn list_consents(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<Vec<ConsentResponse>>, AppError> {
    let consents = state.consents.list(ctx.person_id).await?;
    Ok(Json(consents.into_iter().map(ConsentResponse::from).collect()))
}

/// Open an export/delete data request for the caller.
pub async fn open_data_request(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<OpenDataRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.consents.open_request(&ctx, req.request_type).await?;
    Ok((StatusCode::CREATED, Json(DataRequestResponse::from(request))))
}

/// List the caller's data requests.
pub async fn list_my_data_requests(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<Vec<DataRequestResponse>>, AppError> {
    let requests = state
        .consents
        .list_requests_for_person(ctx.person_id)
        .await?;
    Ok(Json(
        requests.into_iter().map(DataRequestResponse::from).collect(),
    ))
}

/// Filters for the admin data-request listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct DataRequestQuery {
    pub state: Option<DataRequestState>,
}

/// List data requests by state (admin).
pub async fn list_data_requests(
    State(state): State<AppState>,
    Query(query): Query<DataRequestQuery>,
) -> Result<Json<Vec<DataRequestResponse>>, AppError> {
    let requests = state.consents.list_requests(query.state).await?;
    Ok(Json(
        requests.into_iter().map(DataRequestResponse::from).collect(),
    ))
}

/// Advance a data request's lifecycle (admin).
pub async fn advance_data_request(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(req): Json<AdvanceDataRequest>,
) -> Result<Json<DataRequestResponse>, AppError> {
    let request = state
        .consents
        .advance_request(&ctx, request_id, req.state, req.failure_reason)
        .await?;
    Ok(Json(DataRequestResponse::from(request)))
}

//! Session authentication middleware.
//!
//! Resolves the bearer session token to a CallerContext and stores it in
//! the request extensions. Every protected data access goes through this
//! layer; client-side checks are a UX nicety, never the boundary.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};
use hub_core::error::AppError;
use std::net::SocketAddr;

use crate::{services::CallerContext, AppState};

/// Middleware to require an authenticated session.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::AuthenticationRequired(anyhow::anyhow!(
                "Missing or invalid Authorization header"
            ))
        })?
        .to_string();

    let session = state.sessions.authenticate(&token).await?;

    let person = state
        .db
        .find_person_by_id(session.person_id)
        .await?
        .filter(|p| p.is_active())
        .ok_or_else(|| {
            AppError::AuthenticationRequired(anyhow::anyhow!("No active person for session"))
        })?;

    let role = person.church_role().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!(
            "Person {} carries unknown role code {}",
            person.person_id,
            person.role_code
        ))
    })?;

    let ip_address = client_ip(&req);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let ctx = CallerContext {
        person_id: person.person_id,
        church_id: person.church_id,
        congregation_id: person.congregation_id,
        role,
        session_id: Some(session.session_id),
        ip_address,
        user_agent,
    };

    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// Best-effort client IP: x-forwarded-for first, then the socket address.
fn client_ip(req: &Request) -> Option<String> {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// Extractor for the resolved caller context in handlers.
pub struct CurrentUser(pub CallerContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<CallerContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Caller context missing from request extensions"
            ))
        })?;

        Ok(CurrentUser(ctx.clone()))
    }
}

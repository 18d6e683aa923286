pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use hub_core::axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use hub_core::error::AppError;
use hub_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServiceConfig;
use crate::services::{
    AuditService, AuthService, AuthorizationService, ConsentService, CredentialService, Database,
    PlatformFunctions, SessionService, SuspiciousLoginService,
};
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::login,
        handlers::auth::login_passkey,
        handlers::auth::logout,
        handlers::auth::list_sessions,
        handlers::authz::check,
        handlers::authz::evaluate,
        handlers::authz::context,
        handlers::person::get_me,
        handlers::profile::create_profile,
        handlers::profile::set_grant,
        handlers::profile::create_assignment,
        handlers::audit::list_audit_logs,
        handlers::internal::cleanup_sessions,
    ),
    components(
        schemas(
            handlers::auth::LoginRequest,
            handlers::auth::PasskeyLoginRequest,
            handlers::auth::BackupCodeRequest,
            handlers::auth::LoginResponse,
            handlers::auth::BackupCodesResponse,
            handlers::authz::AuthCheckResponse,
            handlers::authz::EvaluateRequest,
            handlers::authz::EvaluateResponse,
            handlers::authz::AuthContextResponse,
            handlers::audit::AuditLogPage,
            handlers::internal::CleanupResponse,
            models::PersonResponse,
            models::SessionInfo,
            models::PasskeyResponse,
            models::RegisterPasskeyRequest,
            models::CreateProfileRequest,
            models::UpdateProfileRequest,
            models::SetGrantRequest,
            models::ProfileResponse,
            models::ProfileWithGrants,
            models::GrantDetail,
            models::PermissionResponse,
            models::CreatePermissionRequest,
            models::PermissionModule,
            models::PermissionAction,
            models::AssignProfileRequest,
            models::AssignmentResponse,
            models::AssignmentDetail,
            models::AuditLogResponse,
            models::SecurityEventResponse,
            models::ConsentResponse,
            models::GrantConsentRequest,
            models::OpenDataRequest,
            models::AdvanceDataRequest,
            models::DataRequestResponse,
            models::DataRequestState,
            models::DataRequestType,
            services::AccessRequest,
            services::AccessDecision,
            services::DecisionSource,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, sessions, and credentials"),
        (name = "Authorization", description = "Permission resolution"),
        (name = "People", description = "People records"),
        (name = "Administration", description = "Profiles, grants, audit, maintenance"),
        (name = "Observability", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("opaque")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub db: Database,
    pub audit: AuditService,
    pub authz: AuthorizationService,
    pub sessions: SessionService,
    pub credentials: CredentialService,
    pub auth: AuthService,
    pub suspicious: SuspiciousLoginService,
    pub consents: ConsentService,
    pub platform: Arc<dyn PlatformFunctions>,
    pub login_rate_limiter: hub_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: hub_core::middleware::rate_limit::IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Administrative routes: session + seguranca:administrar
    let admin_routes = Router::new()
        .route(
            "/admin/profiles",
            post(handlers::profile::create_profile).get(handlers::profile::list_profiles),
        )
        .route(
            "/admin/profiles/:profile_id",
            get(handlers::profile::get_profile)
                .patch(handlers::profile::update_profile)
                .delete(handlers::profile::deactivate_profile),
        )
        .route(
            "/admin/profiles/:profile_id/grants",
            put(handlers::profile::set_grant),
        )
        .route(
            "/admin/profiles/:profile_id/grants/:permission_id",
            delete(handlers::profile::remove_grant),
        )
        .route(
            "/admin/permissions",
            post(handlers::profile::create_permission).get(handlers::profile::list_permissions),
        )
        .route(
            "/admin/assignments",
            post(handlers::profile::create_assignment),
        )
        .route(
            "/admin/assignments/:assignment_id",
            delete(handlers::profile::end_assignment),
        )
        .route(
            "/admin/people/:person_id/assignments",
            get(handlers::profile::list_person_assignments),
        )
        .route("/admin/audit-logs", get(handlers::audit::list_audit_logs))
        .route(
            "/admin/security-events",
            get(handlers::audit::list_security_events),
        )
        .route(
            "/admin/data-requests",
            get(handlers::consent::list_data_requests),
        )
        .route(
            "/admin/data-requests/:request_id/advance",
            post(handlers::consent::advance_data_request),
        )
        .route(
            "/admin/demo-users",
            post(handlers::functions::provision_demo_user),
        )
        .route(
            "/internal/sessions/cleanup",
            post(handlers::internal::cleanup_sessions),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_guard_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    // Authenticated user routes
    let user_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/backup-code/verify",
            post(handlers::auth::verify_backup_code),
        )
        .route(
            "/auth/backup-codes/regenerate",
            post(handlers::auth::regenerate_backup_codes),
        )
        .route(
            "/auth/passkeys",
            post(handlers::auth::register_passkey).get(handlers::auth::list_passkeys),
        )
        .route("/auth/sessions", get(handlers::auth::list_sessions))
        .route(
            "/auth/sessions/:session_id",
            delete(handlers::auth::revoke_session),
        )
        .route(
            "/auth/sessions/revoke-all",
            post(handlers::auth::revoke_all_sessions),
        )
        .route("/authz/check", get(handlers::authz::check))
        .route("/authz/evaluate", post(handlers::authz::evaluate))
        .route("/authz/context", get(handlers::authz::context))
        .route(
            "/people/me",
            get(handlers::person::get_me).patch(handlers::person::update_me),
        )
        .route("/people", get(handlers::person::list_people))
        .route("/people/:person_id", get(handlers::person::get_person))
        .route(
            "/consents",
            post(handlers::consent::grant_consent).get(handlers::consent::list_consents),
        )
        .route(
            "/consents/:consent_id",
            delete(handlers::consent::revoke_consent),
        )
        .route(
            "/data-requests",
            post(handlers::consent::open_data_request)
                .get(handlers::consent::list_my_data_requests),
        )
        .route(
            "/finance/payment-intents",
            post(handlers::functions::create_payment_intent),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    // Login and reset routes carry their own tighter rate limit
    let login_limiter = state.login_rate_limiter.clone();
    let login_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/login/passkey", post(handlers::auth::login_passkey))
        .route(
            "/auth/password-reset/request",
            post(handlers::functions::request_password_reset),
        )
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => match state.config.swagger.enabled {
            config::SwaggerMode::Public | config::SwaggerMode::Authenticated => true,
            config::SwaggerMode::Disabled => false,
        },
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { hub_core::axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(login_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &hub_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<hub_core::axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                hub_core::axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<hub_core::axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    hub_core::axum::http::Method::GET,
                    hub_core::axum::http::Method::POST,
                    hub_core::axum::http::Method::PATCH,
                    hub_core::axum::http::Method::PUT,
                    hub_core::axum::http::Method::DELETE,
                    hub_core::axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    hub_core::axum::http::header::AUTHORIZATION,
                    hub_core::axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    hub_core::axum::extract::State(state): hub_core::axum::extract::State<AppState>,
) -> Result<hub_core::axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    Ok(hub_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up"
        }
    })))
}

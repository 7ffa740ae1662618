//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases. Protected
//! routes resolve the portal identity in middleware and reject with `401`;
//! the broker callback is browser-facing, so it resolves identity itself
//! and answers with a redirect instead.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Query, Request, State},
    http::{HeaderMap, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::application::ports::{BrokerPort, CredentialStore, IdentityPort, PortalUser};
use crate::application::use_cases::{
    CompleteAuthorization, ConfigureCredentials, DisconnectBroker, RequestLogin, SyncPositions,
    VerifyConnection,
};
use crate::error::ServiceError;
use crate::observability::metrics;

use super::request::{CallbackParams, ConfigureRequest};
use super::response::{
    ConfigureResponse, DisconnectResponse, ErrorBody, HealthResponse, PositionBookDto,
    PositionsResponse, ProfileDto, QuickRefreshResponse, TestConnectionResponse,
};

/// Absolute URLs in the hosting portal that the authorization flow uses.
#[derive(Debug, Clone)]
pub struct PortalLinks {
    /// Redirect URI registered with the broker; points at the callback route.
    pub redirect_uri: String,
    /// Page the user lands on after a successful authorization.
    pub success_url: String,
    /// Page the user lands on when the flow fails, with `?error=<code>`.
    pub error_url: String,
}

/// Application state shared across handlers.
pub struct AppState<S, B, I>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    /// Credential store, used directly for identity enrollment.
    pub store: Arc<S>,
    /// Use case storing API key pairs.
    pub configure_credentials: Arc<ConfigureCredentials<S>>,
    /// Use case issuing the broker login URL.
    pub request_login: Arc<RequestLogin<S, B>>,
    /// Use case completing the authorization redirect.
    pub complete_authorization: Arc<CompleteAuthorization<S, B>>,
    /// Use case validating a stored session.
    pub verify_connection: Arc<VerifyConnection<S, B>>,
    /// Use case listing positions.
    pub sync_positions: Arc<SyncPositions<S, B>>,
    /// Use case tearing down the link.
    pub disconnect_broker: Arc<DisconnectBroker<S>>,
    /// Portal identity resolver.
    pub identity: Arc<I>,
    /// Portal pages and the registered redirect URI.
    pub links: PortalLinks,
    /// Application version reported by `/health`.
    pub version: String,
}

impl<S, B, I> AppState<S, B, I>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    /// Wire all use cases over shared adapters.
    pub fn new(store: Arc<S>, broker: Arc<B>, identity: Arc<I>, links: PortalLinks) -> Self {
        Self {
            configure_credentials: Arc::new(ConfigureCredentials::new(Arc::clone(&store))),
            request_login: Arc::new(RequestLogin::new(
                Arc::clone(&store),
                Arc::clone(&broker),
                links.redirect_uri.clone(),
            )),
            complete_authorization: Arc::new(CompleteAuthorization::new(
                Arc::clone(&store),
                Arc::clone(&broker),
            )),
            verify_connection: Arc::new(VerifyConnection::new(
                Arc::clone(&store),
                Arc::clone(&broker),
            )),
            sync_positions: Arc::new(SyncPositions::new(Arc::clone(&store), Arc::clone(&broker))),
            disconnect_broker: Arc::new(DisconnectBroker::new(Arc::clone(&store))),
            store,
            identity,
            links,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl<S, B, I> Clone for AppState<S, B, I>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            configure_credentials: Arc::clone(&self.configure_credentials),
            request_login: Arc::clone(&self.request_login),
            complete_authorization: Arc::clone(&self.complete_authorization),
            verify_connection: Arc::clone(&self.verify_connection),
            sync_positions: Arc::clone(&self.sync_positions),
            disconnect_broker: Arc::clone(&self.disconnect_broker),
            identity: Arc::clone(&self.identity),
            links: self.links.clone(),
            version: self.version.clone(),
        }
    }
}

/// JSON error wrapper turning a [`ServiceError`] into a structured body.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        metrics::record_route_error(code.as_str());

        let body = ErrorBody {
            success: false,
            error: code.as_str().to_string(),
            message: self.0.message().to_string(),
            needs_credentials: code.needs_credentials().then_some(true),
            needs_auth: code.needs_auth().then_some(true),
        };

        (code.http_status(), Json(body)).into_response()
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S, B, I>(state: AppState<S, B, I>) -> Router
where
    S: CredentialStore + 'static,
    B: BrokerPort + 'static,
    I: IdentityPort + 'static,
{
    let protected = Router::new()
        .route("/api/broker/configure", post(configure))
        .route("/api/broker/quick-refresh", post(quick_refresh))
        .route("/api/broker/test-connection", post(test_connection))
        .route("/api/broker/positions", get(positions))
        .route("/api/broker/disconnect", post(disconnect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_portal_user::<S, B, I>,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/broker/callback", get(broker_callback))
        .merge(protected)
        .with_state(state)
}

/// Pull the portal token off the request. `Authorization: Bearer` wins;
/// the `portal_session` cookie covers the browser redirect path.
fn portal_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "portal_session" && !value.is_empty()).then_some(value)
    })
}

async fn portal_user<I>(identity: &I, headers: &HeaderMap) -> Option<PortalUser>
where
    I: IdentityPort,
{
    let token = portal_token(headers)?;
    identity.authenticate(token).await
}

/// Resolve the portal identity or reject the request with `401`.
///
/// On success the user lands in request extensions and their credential
/// row is enrolled, so downstream record loads cannot miss.
async fn require_portal_user<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: CredentialStore + 'static,
    B: BrokerPort + 'static,
    I: IdentityPort + 'static,
{
    let Some(user) = portal_user(state.identity.as_ref(), request.headers()).await else {
        return ApiError::from(ServiceError::unauthenticated()).into_response();
    };

    if let Err(e) = state.store.enroll(&user.user_id).await {
        return ApiError::from(ServiceError::from(e)).into_response();
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Health check endpoint.
async fn health_check<S, B, I>(State(state): State<AppState<S, B, I>>) -> Json<HealthResponse>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "broker-connect".to_string(),
        version: state.version.clone(),
    })
}

/// Store a broker API key pair.
async fn configure<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Extension(user): Extension<PortalUser>,
    Json(request): Json<ConfigureRequest>,
) -> Result<Json<ConfigureResponse>, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    let record = state
        .configure_credentials
        .execute(&user, &request.api_key, &request.api_secret)
        .await?;

    Ok(Json(ConfigureResponse {
        success: true,
        is_connected: record.is_connected,
    }))
}

/// Issue the hosted broker login URL.
async fn quick_refresh<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Extension(user): Extension<PortalUser>,
) -> Result<Json<QuickRefreshResponse>, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    let login_url = state.request_login.execute(&user).await?;

    Ok(Json(QuickRefreshResponse {
        success: true,
        login_url,
    }))
}

/// Complete the broker's authorization redirect.
///
/// Flow outcomes become redirects; only a storage failure after a
/// successful exchange surfaces as a JSON error, since that token is
/// already consumed and a retry page cannot help.
async fn broker_callback<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    let user = portal_user(state.identity.as_ref(), &headers).await;
    if let Some(user) = &user {
        state
            .store
            .enroll(&user.user_id)
            .await
            .map_err(ServiceError::from)?;
    }

    let outcome = state
        .complete_authorization
        .execute(
            user.as_ref(),
            params.request_token.as_deref(),
            params.status.as_deref(),
        )
        .await?;

    Ok(match outcome.error_code() {
        None => Redirect::to(&state.links.success_url),
        Some(code) => Redirect::to(&format!("{}?error={code}", state.links.error_url)),
    })
}

/// Validate the stored session against the live broker.
async fn test_connection<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Extension(user): Extension<PortalUser>,
) -> Result<Json<TestConnectionResponse>, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    let report = state.verify_connection.execute(&user).await?;

    Ok(Json(TestConnectionResponse {
        success: true,
        balance: report.balance,
        profile: ProfileDto::from(report.profile),
    }))
}

/// List open positions through the stored session.
async fn positions<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Extension(user): Extension<PortalUser>,
) -> Result<Json<PositionsResponse>, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    let report = state.sync_positions.execute(&user).await?;

    Ok(Json(PositionsResponse {
        success: true,
        positions: PositionBookDto::from(report.positions),
        total_net: report.total_net,
        total_day: report.total_day,
    }))
}

/// Tear the broker link down.
async fn disconnect<S, B, I>(
    State(state): State<AppState<S, B, I>>,
    Extension(user): Extension<PortalUser>,
) -> Result<Json<DisconnectResponse>, ApiError>
where
    S: CredentialStore,
    B: BrokerPort,
    I: IdentityPort,
{
    state.disconnect_broker.execute(&user).await?;

    Ok(Json(DisconnectResponse { success: true }))
}

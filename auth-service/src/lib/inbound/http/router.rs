use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::deactivate_account::deactivate_account;
use super::handlers::get_profile::get_profile;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh_token::refresh_token;
use super::handlers::register::register;
use super::handlers::update_profile::update_profile;
use super::middleware::authenticate as auth_middleware;
use crate::domain::user::ports::AuthServicePort;

pub const API_PREFIX: &str = "/api/v1/auth";

pub struct AppState<AS: AuthServicePort> {
    pub auth_service: Arc<AS>,
    pub authenticator: Arc<Authenticator>,
}

impl<AS: AuthServicePort> Clone for AppState<AS> {
    fn clone(&self) -> Self {
        Self {
            auth_service: Arc::clone(&self.auth_service),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

pub fn create_router<AS: AuthServicePort>(
    auth_service: Arc<AS>,
    authenticator: Arc<Authenticator>,
) -> Router {
    let state = AppState {
        auth_service,
        authenticator,
    };

    let public_routes = Router::new()
        .route("/register", post(register::<AS>))
        .route("/login", post(login::<AS>))
        .route("/refresh", post(refresh_token::<AS>));

    let protected_routes = Router::new()
        .route("/logout", post(logout::<AS>))
        .route(
            "/me",
            get(get_profile::<AS>)
                .put(update_profile::<AS>)
                .delete(deactivate_account::<AS>),
        )
        .route("/me/password", put(change_password::<AS>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<AS>,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .nest(API_PREFIX, public_routes.merge(protected_routes))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

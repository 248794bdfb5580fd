use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::background::BackgroundTasks;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccessGate, AuthService, AuthSettings, LettreMailer, Mailer, MovieService, SeaOrmAuthService,
    SeaOrmMovieService,
};

pub mod auth;
mod error;
mod movies;
mod observability;
mod ratings;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub clock: Arc<dyn Clock>,

    pub auth: Arc<dyn AuthService>,

    pub access: AccessGate,

    pub movies: Arc<dyn MovieService>,

    pub tasks: BackgroundTasks,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// Collaborators wired into the services. Tests swap the clock and mailer.
pub struct Dependencies {
    pub store: Store,
    pub clock: Arc<dyn Clock>,
    pub mailer: Arc<dyn Mailer>,
    pub tasks: BackgroundTasks,
}

#[must_use]
pub fn create_app_state(
    config: Config,
    deps: Dependencies,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let Dependencies {
        store,
        clock,
        mailer,
        tasks,
    } = deps;

    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        clock.clone(),
        mailer,
        tasks.clone(),
        AuthSettings::from(&config),
    ));

    let movies: Arc<dyn MovieService> = Arc::new(SeaOrmMovieService::new(
        store.clone(),
        clock.clone(),
        config.database.query_timeout(),
    ));

    Arc::new(AppState {
        config: Arc::new(config),
        store,
        clock,
        access: AccessGate::new(auth.clone()),
        auth,
        movies,
        tasks,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::from_config(&config.database).await?;
    let mailer = LettreMailer::new(&config.mail)?;

    let deps = Dependencies {
        store,
        clock: Arc::new(SystemClock),
        mailer: Arc::new(mailer),
        tasks: BackgroundTasks::new(),
    };

    Ok(create_app_state(config, deps, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let api_router = Router::new()
        .merge(public_routes())
        .merge(authenticated_routes(state.clone()))
        .merge(movie_write_routes(state.clone()))
        .route_layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state);

    api_router
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/healthcheck", get(observability::healthcheck))
        .route("/v1/movies", get(movies::list_movies))
        .route("/v1/movies/{id}", get(movies::get_movie))
        .route("/v1/movies/{id}/ratings", get(ratings::average_rating))
        .route("/v1/users", post(users::register))
        .route(
            "/v1/users/activate",
            post(users::activate).put(users::activate),
        )
        .route("/v1/users/authenticate", post(users::login))
        .route("/metrics", get(observability::get_metrics))
}

fn authenticated_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/v1/movies/{id}/ratings",
            post(ratings::submit_rating)
                .put(ratings::update_rating)
                .delete(ratings::delete_rating),
        )
        .route("/v1/movies/{id}/rating", get(ratings::get_own_rating))
        .route("/v1/users/sign-out", post(users::sign_out))
        .route_layer(middleware::from_fn_with_state(state, auth::authenticate))
}

fn movie_write_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/movies", post(movies::create_movie))
        .route(
            "/v1/movies/{id}",
            axum::routing::patch(movies::update_movie)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_movies_write,
        ))
}

//! Web application router and middleware setup.

use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer;
use crate::metrics::catalog;
use crate::web::handlers::{
    binaries, files, getters, gpio, health, power, services, AppState,
};

/// Create the axum application with all routes and middleware.
///
/// `/health` and `/version` are public; every other route requires the
/// bearer token.
pub fn create_app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/version", get(health::version));

    let mut authed_routes = Router::new()
        .route("/guardian/data", get(getters::guardian_data))
        .route("/power/reboot", post(power::reboot))
        .route("/gpiocontrol/:action", post(gpio::control))
        .route("/services/authorized", get(services::authorized))
        .route("/services/:name", get(services::status))
        .route(
            "/services/:name/:action",
            get(services::query).post(services::control),
        )
        .route("/binaries/version/:name", get(binaries::version))
        .route("/binaries/exists/:name", get(binaries::exists))
        .route("/binaries/install/:name", post(binaries::install))
        .route("/files/directory/*path", get(files::directory_exists))
        .route("/files/file/*path", get(files::file_exists));

    for domain in catalog::DOMAINS {
        authed_routes = authed_routes.route(
            &format!("/{}/:metric", domain.name),
            get(
                move |State(state): State<AppState>, Path(metric): Path<String>| {
                    getters::read_metric(state, domain, metric)
                },
            ),
        );
    }

    let authed_routes = authed_routes.layer(middleware::from_fn_with_state(
        Arc::clone(&state.config.credential),
        require_bearer,
    ));

    Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

use actix_web::{http::header, middleware::DefaultHeaders};

use crate::env_config::DeploymentTarget;

/// Headers the checkout UI may send on cross-origin calls.
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Wildcard CORS headers for the payment endpoints.
///
/// Applied to every response of the wrapped scope, preflight and errors
/// included, so a browser can always read the JSON error body.
pub fn default(target: DeploymentTarget) -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, target.allowed_methods()))
        .add((header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"))
}

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::error;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Render an askama template into an HTML response.
pub fn render_html<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(render_error) => {
            error!("Failed to render template: {}", render_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

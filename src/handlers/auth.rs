use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use model::entities::account::AccountRole;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::forms;
use crate::middleware::auth::{CurrentAccount, SESSION_COOKIE, SESSION_TTL_HOURS};
use crate::schemas::{render_html, AppState};

/// Form fields submitted by the login page.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
}

/// The dashboard an account lands on after login, by role.
pub fn dashboard_path(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Admin => "/dashboard/admin",
        AccountRole::Staff => "/dashboard/staff",
        AccountRole::Librarian => "/dashboard/librarian",
    }
}

pub async fn login_form() -> Response {
    render_html(&LoginTemplate { error: None })
}

/// Exchange a username/password pair for a session cookie.
///
/// All failure modes (unknown username, wrong password, inactive account)
/// re-render the login form with the same generic error and never open a
/// session.
#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let (username, password) = match (
        forms::require(&form.username, "username"),
        forms::require(&form.password, "password"),
    ) {
        (Ok(username), Ok(password)) => (username, password),
        _ => return invalid_login(),
    };

    let account = match model::accounts::find_by_username(&state.db, &username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!("Login failed: unknown username");
            return invalid_login();
        }
        Err(db_error) => {
            error!("Failed to look up account for login: {}", db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !account.is_active {
        warn!(username = %account.username, "Login rejected: account is inactive");
        return invalid_login();
    }
    if !model::accounts::verify_password(&account, &password) {
        debug!(username = %account.username, "Login failed: wrong password");
        return invalid_login();
    }

    let session =
        match model::sessions::create_session(&state.db, account.id, SESSION_TTL_HOURS).await {
            Ok(session) => session,
            Err(db_error) => {
                error!("Failed to open session: {}", db_error);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

    info!(username = %account.username, role = account.role.as_slug(), "Login successful");

    let cookie = Cookie::build((SESSION_COOKIE, session.token))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), Redirect::to(dashboard_path(account.role))).into_response()
}

fn invalid_login() -> Response {
    render_html(&LoginTemplate {
        error: Some("Invalid username or password".to_string()),
    })
}

/// Destroy the session and clear the cookie.
#[instrument(skip(state, jar, current))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    jar: CookieJar,
) -> Response {
    if let Err(db_error) = model::sessions::delete_session(&state.db, current.session_id).await {
        warn!("Failed to delete session: {}", db_error);
    }
    info!(username = %current.username, "Logged out");

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Redirect::to("/login")).into_response()
}

//! Session middleware.
//!
//! Validates the session cookie on every protected route, loads the session
//! and its account from the database, and injects the authenticated
//! [`CurrentAccount`] into request extensions. Requests without a live
//! session are redirected to the login form. Role guards layer on top and
//! reject accounts whose role does not match the subtree they are entering.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;
use model::entities::account::AccountRole;
use sea_orm::DatabaseConnection;
use tracing::{debug, error, warn};

use crate::schemas::AppState;

/// Cookie name for browser sessions.
pub const SESSION_COOKIE: &str = "schoolrust_session";

/// How long a login stays valid.
pub const SESSION_TTL_HOURS: i64 = 12;

/// The authenticated account for the current request.
#[derive(Clone, Debug)]
pub struct CurrentAccount {
    pub session_id: i32,
    pub account_id: i32,
    pub username: String,
    pub role: AccountRole,
}

impl CurrentAccount {
    /// Consume the pending flash message for this session, if any.
    /// A failed read degrades to no message rather than an error page.
    pub async fn take_flash(&self, db: &DatabaseConnection) -> Option<String> {
        match model::sessions::take_flash(db, self.session_id).await {
            Ok(flash) => flash,
            Err(db_error) => {
                warn!("Failed to read flash message: {}", db_error);
                None
            }
        }
    }

    /// Store a one-shot status message shown on the next rendered page.
    pub async fn set_flash(&self, db: &DatabaseConnection, message: &str) {
        if let Err(db_error) = model::sessions::set_flash(db, self.session_id, message).await {
            warn!("Failed to store flash message: {}", db_error);
        }
    }
}

/// Require a live session; otherwise redirect to the login form.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) else {
        debug!("No session cookie, redirecting to login");
        return Redirect::to("/login").into_response();
    };

    match model::sessions::find_valid(&state.db, &token).await {
        Ok(Some((session, account))) if account.is_active => {
            request.extensions_mut().insert(CurrentAccount {
                session_id: session.id,
                account_id: account.id,
                username: account.username,
                role: account.role,
            });
            next.run(request).await
        }
        Ok(_) => {
            debug!("Invalid or expired session, redirecting to login");
            Redirect::to("/login").into_response()
        }
        Err(db_error) => {
            error!("Failed to resolve session: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn require_admin(
    Extension(account): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Response {
    require_role(account, AccountRole::Admin, request, next).await
}

pub async fn require_staff(
    Extension(account): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Response {
    require_role(account, AccountRole::Staff, request, next).await
}

pub async fn require_librarian(
    Extension(account): Extension<CurrentAccount>,
    request: Request,
    next: Next,
) -> Response {
    require_role(account, AccountRole::Librarian, request, next).await
}

async fn require_role(
    account: CurrentAccount,
    required: AccountRole,
    request: Request,
    next: Next,
) -> Response {
    if account.role == required {
        next.run(request).await
    } else {
        warn!(
            username = %account.username,
            role = account.role.as_slug(),
            required = required.as_slug(),
            "Denying access: role mismatch"
        );
        StatusCode::FORBIDDEN.into_response()
    }
}

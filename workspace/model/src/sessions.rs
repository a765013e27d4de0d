//! Database-backed browser sessions.
//!
//! A session row holds a random token (the cookie value), the owning
//! account, an expiry timestamp, and the pending flash message. Expired
//! rows are deleted lazily when they are next presented.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::prelude::Session;
use crate::entities::{account, session};

/// Open a session for `account_id` valid for `ttl_hours`.
pub async fn create_session(
    db: &DatabaseConnection,
    account_id: i32,
    ttl_hours: i64,
) -> Result<session::Model, DbErr> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now().naive_utc() + Duration::hours(ttl_hours);
    debug!(account_id, "opening session");

    session::ActiveModel {
        token: Set(token),
        account_id: Set(account_id),
        expires_at: Set(expires_at),
        flash: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Resolve a cookie token to its session and account.
///
/// Returns `None` for unknown tokens; expired sessions are deleted and
/// treated as unknown.
pub async fn find_valid(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<(session::Model, account::Model)>, DbErr> {
    let Some((session, account)) = Session::find()
        .filter(session::Column::Token.eq(token))
        .find_also_related(account::Entity)
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if session.expires_at < Utc::now().naive_utc() {
        debug!(session_id = session.id, "session expired, deleting");
        Session::delete_by_id(session.id).exec(db).await?;
        return Ok(None);
    }

    // The FK guarantees the account exists; a missing join still reads as
    // an invalid session.
    Ok(account.map(|account| (session, account)))
}

pub async fn delete_session(db: &DatabaseConnection, session_id: i32) -> Result<(), DbErr> {
    Session::delete_by_id(session_id).exec(db).await?;
    Ok(())
}

/// Store a one-shot status message on the session.
pub async fn set_flash(
    db: &DatabaseConnection,
    session_id: i32,
    message: &str,
) -> Result<(), DbErr> {
    session::ActiveModel {
        id: Set(session_id),
        flash: Set(Some(message.to_string())),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Consume the pending flash message, clearing it.
pub async fn take_flash(
    db: &DatabaseConnection,
    session_id: i32,
) -> Result<Option<String>, DbErr> {
    let Some(session) = Session::find_by_id(session_id).one(db).await? else {
        return Ok(None);
    };
    let Some(message) = session.flash.clone() else {
        return Ok(None);
    };

    session::ActiveModel {
        id: Set(session_id),
        flash: Set(None),
        ..Default::default()
    }
    .update(db)
    .await?;

    Ok(Some(message))
}

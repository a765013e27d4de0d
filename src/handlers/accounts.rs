use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use model::accounts::{AccountError, NewAccount};
use model::entities::account::{self, AccountRole};
use model::entities::prelude::Account;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::forms;
use crate::middleware::auth::CurrentAccount;
use crate::schemas::{render_html, AppState};

/// Form fields for creating or editing an account. The password is only
/// read on creation; editing never touches the credential.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Template)]
#[template(path = "account_list.html")]
struct AccountListTemplate {
    accounts: Vec<account::Model>,
    role_name: String,
    role_slug: String,
    flash: Option<String>,
}

#[derive(Template)]
#[template(path = "account_form.html")]
struct AccountFormTemplate {
    error: Option<String>,
    action: String,
    role_name: String,
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    address: String,
    editing: bool,
}

/// Capitalized role word used in status messages ("Staff created successfully.").
fn role_label(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Admin => "Admin",
        AccountRole::Staff => "Staff",
        AccountRole::Librarian => "Librarian",
    }
}

fn form_template(
    form: &AccountForm,
    action: String,
    role_name: String,
    editing: bool,
    error: Option<String>,
) -> AccountFormTemplate {
    AccountFormTemplate {
        error,
        action,
        role_name,
        username: form.username.clone().unwrap_or_default(),
        first_name: form.first_name.clone().unwrap_or_default(),
        last_name: form.last_name.clone().unwrap_or_default(),
        email: form.email.clone().unwrap_or_default(),
        phone_number: form.phone_number.clone().unwrap_or_default(),
        address: form.address.clone().unwrap_or_default(),
        editing,
    }
}

/// List all accounts carrying the role named in the path.
#[instrument(skip(state, current))]
pub async fn list_accounts(
    Path(role): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    let Some(role) = AccountRole::from_slug(&role) else {
        warn!("Unknown role '{}' requested", role);
        return StatusCode::NOT_FOUND.into_response();
    };

    match Account::find()
        .filter(account::Column::Role.eq(role))
        .all(&state.db)
        .await
    {
        Ok(accounts) => {
            debug!("Retrieved {} {} accounts", accounts.len(), role.as_slug());
            let flash = current.take_flash(&state.db).await;
            render_html(&AccountListTemplate {
                accounts,
                role_name: role.display_name().to_string(),
                role_slug: role.as_slug().to_string(),
                flash,
            })
        }
        Err(db_error) => {
            error!("Failed to retrieve accounts: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn new_account(Path(role): Path<String>) -> Response {
    let Some(role) = AccountRole::from_slug(&role) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    render_html(&AccountFormTemplate {
        error: None,
        action: format!("/users/{}/new", role.as_slug()),
        role_name: role.display_name().to_string(),
        username: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        phone_number: String::new(),
        address: String::new(),
        editing: false,
    })
}

/// Create an account with the role named in the path. Duplicate username or
/// email re-renders the form; nothing is written in that case.
#[instrument(skip(state, current, form))]
pub async fn create_account(
    Path(role): Path<String>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<AccountForm>,
) -> Response {
    let Some(role) = AccountRole::from_slug(&role) else {
        warn!("Unknown role '{}' requested", role);
        return StatusCode::NOT_FOUND.into_response();
    };
    let action = format!("/users/{}/new", role.as_slug());
    let role_name = role.display_name().to_string();

    let new_account = match build_new_account(&form, role) {
        Ok(new_account) => new_account,
        Err(message) => {
            debug!("Account form rejected: {}", message);
            return render_html(&form_template(&form, action, role_name, false, Some(message)));
        }
    };

    match model::accounts::create_account(&state.db, new_account).await {
        Ok(created) => {
            info!(
                "Account created with ID: {}, username: {}, role: {}",
                created.id,
                created.username,
                created.role.as_slug()
            );
            current
                .set_flash(
                    &state.db,
                    &format!("{} created successfully.", role_label(role)),
                )
                .await;
            Redirect::to(&format!("/users/{}", role.as_slug())).into_response()
        }
        Err(account_error @ (AccountError::DuplicateUsername | AccountError::DuplicateEmail)) => {
            debug!("Account creation rejected: {}", account_error);
            render_html(&form_template(
                &form,
                action,
                role_name,
                false,
                Some(account_error.to_string()),
            ))
        }
        Err(account_error) => {
            error!("Failed to create account: {}", account_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn build_new_account(form: &AccountForm, role: AccountRole) -> Result<NewAccount, String> {
    let username = forms::require(&form.username, "username").map_err(|e| e.to_string())?;
    let first_name = forms::require(&form.first_name, "first_name").map_err(|e| e.to_string())?;
    let last_name = forms::require(&form.last_name, "last_name").map_err(|e| e.to_string())?;
    let email = forms::require(&form.email, "email").map_err(|e| e.to_string())?;
    let password = forms::require(&form.password, "password").map_err(|e| e.to_string())?;

    Ok(NewAccount {
        username,
        first_name,
        last_name,
        email,
        password,
        phone_number: forms::optional(&form.phone_number),
        address: forms::optional(&form.address),
        role,
    })
}

#[instrument(skip(state))]
pub async fn edit_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    match Account::find_by_id(account_id).one(&state.db).await {
        Ok(Some(existing)) => render_html(&AccountFormTemplate {
            error: None,
            action: format!("/users/edit/{}", existing.id),
            role_name: existing.role.display_name().to_string(),
            username: existing.username,
            first_name: existing.first_name,
            last_name: existing.last_name,
            email: existing.email,
            phone_number: existing.phone_number.unwrap_or_default(),
            address: existing.address.unwrap_or_default(),
            editing: true,
        }),
        Ok(None) => {
            warn!("Account with ID {} not found", account_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to load account {}: {}", account_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Overwrite an account's contact fields. The role and credential are left
/// as they are.
#[instrument(skip(state, current, form))]
pub async fn update_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<AccountForm>,
) -> Response {
    let existing = match Account::find_by_id(account_id).one(&state.db).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            warn!("Account with ID {} not found for update", account_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(db_error) => {
            error!("Failed to load account {}: {}", account_id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let action = format!("/users/edit/{}", account_id);
    let role = existing.role;
    let role_name = role.display_name().to_string();

    let required = (
        forms::require(&form.username, "username"),
        forms::require(&form.first_name, "first_name"),
        forms::require(&form.last_name, "last_name"),
        forms::require(&form.email, "email"),
    );
    let (username, first_name, last_name, email) = match required {
        (Ok(username), Ok(first_name), Ok(last_name), Ok(email)) => {
            (username, first_name, last_name, email)
        }
        (Err(e), ..) | (_, Err(e), ..) | (_, _, Err(e), _) | (.., Err(e)) => {
            debug!("Account form rejected: {}", e);
            return render_html(&form_template(&form, action, role_name, true, Some(e.to_string())));
        }
    };

    // Uniqueness checks, ignoring the row being edited
    match model::accounts::username_taken(&state.db, &username, Some(account_id)).await {
        Ok(true) => {
            return render_html(&form_template(
                &form,
                action,
                role_name,
                true,
                Some("Username already exists.".to_string()),
            ));
        }
        Ok(false) => {}
        Err(db_error) => {
            error!("Failed to check username uniqueness: {}", db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    match model::accounts::email_taken(&state.db, &email, Some(account_id)).await {
        Ok(true) => {
            return render_html(&form_template(
                &form,
                action,
                role_name,
                true,
                Some("Email already exists.".to_string()),
            ));
        }
        Ok(false) => {}
        Err(db_error) => {
            error!("Failed to check email uniqueness: {}", db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let mut active: account::ActiveModel = existing.into();
    active.username = Set(username);
    active.first_name = Set(first_name);
    active.last_name = Set(last_name);
    active.email = Set(email);
    active.phone_number = Set(forms::optional(&form.phone_number));
    active.address = Set(forms::optional(&form.address));

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Account with ID {} updated", updated.id);
            current
                .set_flash(&state.db, "User details updated successfully.")
                .await;
            Redirect::to(&format!("/users/{}", role.as_slug())).into_response()
        }
        Err(db_error) => {
            error!("Failed to update account {}: {}", account_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Delete an account and redirect back to its role listing.
#[instrument(skip(state, current))]
pub async fn delete_account(
    Path(account_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    let existing = match Account::find_by_id(account_id).one(&state.db).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            warn!("Account with ID {} not found for deletion", account_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(db_error) => {
            error!("Failed to load account {}: {}", account_id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let role = existing.role;
    match Account::delete_by_id(account_id).exec(&state.db).await {
        Ok(_) => {
            info!("Account with ID {} deleted", account_id);
            current
                .set_flash(&state.db, "User deleted successfully.")
                .await;
            Redirect::to(&format!("/users/{}", role.as_slug())).into_response()
        }
        Err(db_error) => {
            error!("Failed to delete account {}: {}", account_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use chrono::NaiveDate;
use model::entities::prelude::{LibraryLoan, Student};
use model::entities::{library_loan, student};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::forms::{self, FormError};
use crate::middleware::auth::CurrentAccount;
use crate::schemas::{render_html, AppState};

/// Form fields for creating or editing a library loan.
#[derive(Debug, Deserialize)]
pub struct LoanForm {
    pub student_id: Option<String>,
    pub book_title: Option<String>,
    pub issue_date: Option<String>,
    pub return_date: Option<String>,
}

/// A loan row joined with its student's name for listing.
struct LoanRow {
    id: i32,
    student_name: String,
    book_title: String,
    issue_date: NaiveDate,
    return_date: Option<NaiveDate>,
}

#[derive(Template)]
#[template(path = "loan_list.html")]
struct LoanListTemplate {
    loans: Vec<LoanRow>,
    flash: Option<String>,
    base: &'static str,
    can_edit: bool,
}

#[derive(Template)]
#[template(path = "loan_form.html")]
struct LoanFormTemplate {
    error: Option<String>,
    action: String,
    students: Vec<student::Model>,
    selected_student: i32,
    book_title: String,
    issue_date: String,
    return_date: String,
    editing: bool,
}

struct LoanFields {
    student_id: i32,
    book_title: String,
    issue_date: NaiveDate,
    return_date: Option<NaiveDate>,
}

fn validate(form: &LoanForm) -> Result<LoanFields, FormError> {
    let student_id = forms::require(&form.student_id, "student_id")?
        .parse::<i32>()
        .map_err(|_| FormError::Invalid("student_id"))?;
    let book_title = forms::require(&form.book_title, "book_title")?;
    let issue_date = forms::parse_date(&forms::require(&form.issue_date, "issue_date")?, "issue_date")?;
    // An empty return date means the book is still out
    let return_date = forms::parse_optional_date(&form.return_date, "return_date")?;
    Ok(LoanFields {
        student_id,
        book_title,
        issue_date,
        return_date,
    })
}

/// Build the form template, loading students for the dropdown.
async fn loan_form(
    state: &AppState,
    action: String,
    selected_student: i32,
    book_title: String,
    issue_date: String,
    return_date: String,
    editing: bool,
    error: Option<String>,
) -> Response {
    match Student::find().all(&state.db).await {
        Ok(students) => render_html(&LoanFormTemplate {
            error,
            action,
            students,
            selected_student,
            book_title,
            issue_date,
            return_date,
            editing,
        }),
        Err(db_error) => {
            error!("Failed to load students for loan form: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn rerender(state: &AppState, form: &LoanForm, action: String, editing: bool, error: FormError) -> Response {
    let selected = form
        .student_id
        .as_deref()
        .and_then(|id| id.parse::<i32>().ok())
        .unwrap_or(0);
    loan_form(
        state,
        action,
        selected,
        form.book_title.clone().unwrap_or_default(),
        form.issue_date.clone().unwrap_or_default(),
        form.return_date.clone().unwrap_or_default(),
        editing,
        Some(error.to_string()),
    )
    .await
}

async fn render_loan_list(
    state: &AppState,
    current: &CurrentAccount,
    base: &'static str,
    can_edit: bool,
) -> Response {
    match LibraryLoan::find()
        .find_also_related(Student)
        .all(&state.db)
        .await
    {
        Ok(rows) => {
            debug!("Retrieved {} loans", rows.len());
            let loans = rows
                .into_iter()
                .map(|(loan, loan_student)| LoanRow {
                    id: loan.id,
                    student_name: loan_student
                        .map(|s| s.name)
                        .unwrap_or_else(|| "unknown".to_string()),
                    book_title: loan.book_title,
                    issue_date: loan.issue_date,
                    return_date: loan.return_date,
                })
                .collect();
            let flash = current.take_flash(&state.db).await;
            render_html(&LoanListTemplate {
                loans,
                flash,
                base,
                can_edit,
            })
        }
        Err(db_error) => {
            error!("Failed to retrieve loans: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The referenced student must exist before a loan is written or moved.
async fn student_exists(state: &AppState, student_id: i32) -> Result<bool, Response> {
    match Student::find_by_id(student_id).one(&state.db).await {
        Ok(Some(_)) => Ok(true),
        Ok(None) => Ok(false),
        Err(db_error) => {
            error!("Failed to look up student {}: {}", student_id, db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

async fn handle_create(
    state: &AppState,
    current: &CurrentAccount,
    form: LoanForm,
    base: &'static str,
) -> Response {
    let action = format!("{}/new", base);
    let fields = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Loan form rejected: {}", form_error);
            return rerender(state, &form, action, false, form_error).await;
        }
    };

    match student_exists(state, fields.student_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Student with ID {} not found for loan", fields.student_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(response) => return response,
    }

    let new_loan = library_loan::ActiveModel {
        student_id: Set(fields.student_id),
        book_title: Set(fields.book_title),
        issue_date: Set(fields.issue_date),
        return_date: Set(fields.return_date),
        ..Default::default()
    };

    match new_loan.insert(&state.db).await {
        Ok(created) => {
            info!("Loan created with ID: {}", created.id);
            current
                .set_flash(&state.db, "Library history added successfully.")
                .await;
            Redirect::to(base).into_response()
        }
        Err(db_error) => {
            error!("Failed to create loan: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_edit_form(state: &AppState, loan_id: i32, base: &'static str) -> Response {
    match LibraryLoan::find_by_id(loan_id).one(&state.db).await {
        Ok(Some(existing)) => {
            loan_form(
                state,
                format!("{}/{}/edit", base, existing.id),
                existing.student_id,
                existing.book_title,
                existing.issue_date.to_string(),
                existing
                    .return_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                true,
                None,
            )
            .await
        }
        Ok(None) => {
            warn!("Loan with ID {} not found", loan_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to load loan {}: {}", loan_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_update(
    state: &AppState,
    current: &CurrentAccount,
    loan_id: i32,
    form: LoanForm,
    base: &'static str,
) -> Response {
    let existing = match LibraryLoan::find_by_id(loan_id).one(&state.db).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            warn!("Loan with ID {} not found for update", loan_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(db_error) => {
            error!("Failed to load loan {}: {}", loan_id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let action = format!("{}/{}/edit", base, loan_id);
    let fields = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Loan form rejected: {}", form_error);
            return rerender(state, &form, action, true, form_error).await;
        }
    };

    match student_exists(state, fields.student_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Student with ID {} not found for loan", fields.student_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(response) => return response,
    }

    let mut active: library_loan::ActiveModel = existing.into();
    active.student_id = Set(fields.student_id);
    active.book_title = Set(fields.book_title);
    active.issue_date = Set(fields.issue_date);
    active.return_date = Set(fields.return_date);

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Loan with ID {} updated", updated.id);
            current
                .set_flash(&state.db, "Library history updated successfully.")
                .await;
            Redirect::to(base).into_response()
        }
        Err(db_error) => {
            error!("Failed to update loan {}: {}", loan_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_delete(
    state: &AppState,
    current: &CurrentAccount,
    loan_id: i32,
    base: &'static str,
) -> Response {
    match LibraryLoan::delete_by_id(loan_id).exec(&state.db).await {
        Ok(result) if result.rows_affected > 0 => {
            info!("Loan with ID {} deleted", loan_id);
            current
                .set_flash(&state.db, "Library history deleted successfully.")
                .await;
            Redirect::to(base).into_response()
        }
        Ok(_) => {
            warn!("Loan with ID {} not found for deletion", loan_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to delete loan {}: {}", loan_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// Admin views

const ADMIN_BASE: &str = "/library";

#[instrument(skip(state, current))]
pub async fn list_loans(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_loan_list(&state, &current, ADMIN_BASE, true).await
}

pub async fn new_loan(State(state): State<AppState>) -> Response {
    loan_form(
        &state,
        format!("{}/new", ADMIN_BASE),
        0,
        String::new(),
        String::new(),
        String::new(),
        false,
        None,
    )
    .await
}

#[instrument(skip(state, current, form))]
pub async fn create_loan(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<LoanForm>,
) -> Response {
    handle_create(&state, &current, form, ADMIN_BASE).await
}

#[instrument(skip(state))]
pub async fn edit_loan(Path(loan_id): Path<i32>, State(state): State<AppState>) -> Response {
    handle_edit_form(&state, loan_id, ADMIN_BASE).await
}

#[instrument(skip(state, current, form))]
pub async fn update_loan(
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<LoanForm>,
) -> Response {
    handle_update(&state, &current, loan_id, form, ADMIN_BASE).await
}

#[instrument(skip(state, current))]
pub async fn delete_loan(
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    handle_delete(&state, &current, loan_id, ADMIN_BASE).await
}

// Staff views (read-only)

#[instrument(skip(state, current))]
pub async fn staff_list_loans(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_loan_list(&state, &current, "/staff/library", false).await
}

// Librarian views

const LIBRARIAN_BASE: &str = "/librarian/library";

#[instrument(skip(state, current))]
pub async fn librarian_list_loans(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_loan_list(&state, &current, LIBRARIAN_BASE, true).await
}

pub async fn librarian_new_loan(State(state): State<AppState>) -> Response {
    loan_form(
        &state,
        format!("{}/new", LIBRARIAN_BASE),
        0,
        String::new(),
        String::new(),
        String::new(),
        false,
        None,
    )
    .await
}

#[instrument(skip(state, current, form))]
pub async fn librarian_create_loan(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<LoanForm>,
) -> Response {
    handle_create(&state, &current, form, LIBRARIAN_BASE).await
}

#[instrument(skip(state))]
pub async fn librarian_edit_loan(
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    handle_edit_form(&state, loan_id, LIBRARIAN_BASE).await
}

#[instrument(skip(state, current, form))]
pub async fn librarian_update_loan(
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Form(form): Form<LoanForm>,
) -> Response {
    handle_update(&state, &current, loan_id, form, LIBRARIAN_BASE).await
}

#[instrument(skip(state, current))]
pub async fn librarian_delete_loan(
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    handle_delete(&state, &current, loan_id, LIBRARIAN_BASE).await
}

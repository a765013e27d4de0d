use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use chrono::NaiveDate;
use model::entities::prelude::{FeePayment, Student};
use model::entities::{fee_payment, student};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::forms::{self, FormError};
use crate::middleware::auth::CurrentAccount;
use crate::schemas::{render_html, AppState};

/// Form fields for creating or editing a fee payment.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub student_id: Option<String>,
    pub amount: Option<String>,
    pub payment_date: Option<String>,
}

/// A payment row joined with its student's name for listing.
struct PaymentRow {
    id: i32,
    student_name: String,
    amount: Decimal,
    payment_date: NaiveDate,
}

#[derive(Template)]
#[template(path = "payment_list.html")]
struct PaymentListTemplate {
    payments: Vec<PaymentRow>,
    flash: Option<String>,
    base: &'static str,
    can_edit: bool,
}

#[derive(Template)]
#[template(path = "payment_form.html")]
struct PaymentFormTemplate {
    error: Option<String>,
    action: String,
    students: Vec<student::Model>,
    selected_student: i32,
    amount: String,
    payment_date: String,
    editing: bool,
}

struct PaymentFields {
    student_id: i32,
    amount: Decimal,
    payment_date: NaiveDate,
}

fn validate(form: &PaymentForm) -> Result<PaymentFields, FormError> {
    let student_id = forms::require(&form.student_id, "student_id")?
        .parse::<i32>()
        .map_err(|_| FormError::Invalid("student_id"))?;
    let amount = forms::parse_amount(&forms::require(&form.amount, "amount")?, "amount")?;
    let payment_date = forms::parse_date(
        &forms::require(&form.payment_date, "payment_date")?,
        "payment_date",
    )?;
    Ok(PaymentFields {
        student_id,
        amount,
        payment_date,
    })
}

async fn payment_form(
    state: &AppState,
    action: String,
    selected_student: i32,
    amount: String,
    payment_date: String,
    editing: bool,
    error: Option<String>,
) -> Response {
    match Student::find().all(&state.db).await {
        Ok(students) => render_html(&PaymentFormTemplate {
            error,
            action,
            students,
            selected_student,
            amount,
            payment_date,
            editing,
        }),
        Err(db_error) => {
            error!("Failed to load students for payment form: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn rerender(
    state: &AppState,
    form: &PaymentForm,
    action: String,
    editing: bool,
    error: FormError,
) -> Response {
    let selected = form
        .student_id
        .as_deref()
        .and_then(|id| id.parse::<i32>().ok())
        .unwrap_or(0);
    payment_form(
        state,
        action,
        selected,
        form.amount.clone().unwrap_or_default(),
        form.payment_date.clone().unwrap_or_default(),
        editing,
        Some(error.to_string()),
    )
    .await
}

async fn render_payment_list(
    state: &AppState,
    current: &CurrentAccount,
    base: &'static str,
    can_edit: bool,
) -> Response {
    match FeePayment::find()
        .find_also_related(Student)
        .all(&state.db)
        .await
    {
        Ok(rows) => {
            debug!("Retrieved {} payments", rows.len());
            let payments = rows
                .into_iter()
                .map(|(payment, payment_student)| PaymentRow {
                    id: payment.id,
                    student_name: payment_student
                        .map(|s| s.name)
                        .unwrap_or_else(|| "unknown".to_string()),
                    amount: payment.amount,
                    payment_date: payment.payment_date,
                })
                .collect();
            let flash = current.take_flash(&state.db).await;
            render_html(&PaymentListTemplate {
                payments,
                flash,
                base,
                can_edit,
            })
        }
        Err(db_error) => {
            error!("Failed to retrieve payments: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The referenced student must exist before a payment is written or moved.
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

async fn handle_create(state: &AppState, form: PaymentForm, base: &'static str) -> Response {
    let action = format!("{}/new", base);
    let fields = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Payment form rejected: {}", form_error);
            return rerender(state, &form, action, false, form_error).await;
        }
    };

    match student_exists(state, fields.student_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Student with ID {} not found for payment", fields.student_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(response) => return response,
    }

    let new_payment = fee_payment::ActiveModel {
        student_id: Set(fields.student_id),
        amount: Set(fields.amount),
        payment_date: Set(fields.payment_date),
        ..Default::default()
    };

    match new_payment.insert(&state.db).await {
        Ok(created) => {
            info!("Payment created with ID: {}", created.id);
            Redirect::to(base).into_response()
        }
        Err(db_error) => {
            error!("Failed to create payment: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_edit_form(state: &AppState, payment_id: i32, base: &'static str) -> Response {
    match FeePayment::find_by_id(payment_id).one(&state.db).await {
        Ok(Some(existing)) => {
            payment_form(
                state,
                format!("{}/{}/edit", base, existing.id),
                existing.student_id,
                existing.amount.to_string(),
                existing.payment_date.to_string(),
                true,
                None,
            )
            .await
        }
        Ok(None) => {
            warn!("Payment with ID {} not found", payment_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to load payment {}: {}", payment_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_update(
    state: &AppState,
    payment_id: i32,
    form: PaymentForm,
    base: &'static str,
) -> Response {
    let existing = match FeePayment::find_by_id(payment_id).one(&state.db).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            warn!("Payment with ID {} not found for update", payment_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(db_error) => {
            error!("Failed to load payment {}: {}", payment_id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let action = format!("{}/{}/edit", base, payment_id);
    let fields = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Payment form rejected: {}", form_error);
            return rerender(state, &form, action, true, form_error).await;
        }
    };

    match student_exists(state, fields.student_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Student with ID {} not found for payment", fields.student_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(response) => return response,
    }

    let mut active: fee_payment::ActiveModel = existing.into();
    active.student_id = Set(fields.student_id);
    active.amount = Set(fields.amount);
    active.payment_date = Set(fields.payment_date);

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Payment with ID {} updated", updated.id);
            Redirect::to(base).into_response()
        }
        Err(db_error) => {
            error!("Failed to update payment {}: {}", payment_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_delete(state: &AppState, payment_id: i32, base: &'static str) -> Response {
    match FeePayment::delete_by_id(payment_id).exec(&state.db).await {
        Ok(result) if result.rows_affected > 0 => {
            info!("Payment with ID {} deleted", payment_id);
            Redirect::to(base).into_response()
        }
        Ok(_) => {
            warn!("Payment with ID {} not found for deletion", payment_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to delete payment {}: {}", payment_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// Admin views

const ADMIN_BASE: &str = "/fees";

#[instrument(skip(state, current))]
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_payment_list(&state, &current, ADMIN_BASE, true).await
}

pub async fn new_payment(State(state): State<AppState>) -> Response {
    payment_form(
        &state,
        format!("{}/new", ADMIN_BASE),
        0,
        String::new(),
        String::new(),
        false,
        None,
    )
    .await
}

#[instrument(skip(state, form))]
pub async fn create_payment(
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Response {
    handle_create(&state, form, ADMIN_BASE).await
}

#[instrument(skip(state))]
pub async fn edit_payment(Path(payment_id): Path<i32>, State(state): State<AppState>) -> Response {
    handle_edit_form(&state, payment_id, ADMIN_BASE).await
}

#[instrument(skip(state, form))]
pub async fn update_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Response {
    handle_update(&state, payment_id, form, ADMIN_BASE).await
}

#[instrument(skip(state))]
pub async fn delete_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    handle_delete(&state, payment_id, ADMIN_BASE).await
}

// Staff views

const STAFF_BASE: &str = "/staff/fees";

#[instrument(skip(state, current))]
pub async fn staff_list_payments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_payment_list(&state, &current, STAFF_BASE, true).await
}

pub async fn staff_new_payment(State(state): State<AppState>) -> Response {
    payment_form(
        &state,
        format!("{}/new", STAFF_BASE),
        0,
        String::new(),
        String::new(),
        false,
        None,
    )
    .await
}

#[instrument(skip(state, form))]
pub async fn staff_create_payment(
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Response {
    handle_create(&state, form, STAFF_BASE).await
}

#[instrument(skip(state))]
pub async fn staff_edit_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    handle_edit_form(&state, payment_id, STAFF_BASE).await
}

#[instrument(skip(state, form))]
pub async fn staff_update_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
    Form(form): Form<PaymentForm>,
) -> Response {
    handle_update(&state, payment_id, form, STAFF_BASE).await
}

#[instrument(skip(state))]
pub async fn staff_delete_payment(
    Path(payment_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    handle_delete(&state, payment_id, STAFF_BASE).await
}

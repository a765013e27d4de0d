use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use model::entities::account::{self, AccountRole};
use model::entities::prelude::{Account, FeePayment, LibraryLoan, Student};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{error, instrument};

use crate::middleware::auth::CurrentAccount;
use crate::schemas::{render_html, AppState};

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    username: String,
    staff_count: u64,
    librarian_count: u64,
    student_count: u64,
    loan_count: u64,
    payment_count: u64,
    flash: Option<String>,
}

#[derive(Template)]
#[template(path = "staff_dashboard.html")]
struct StaffDashboardTemplate {
    username: String,
    flash: Option<String>,
}

#[derive(Template)]
#[template(path = "librarian_dashboard.html")]
struct LibrarianDashboardTemplate {
    username: String,
    flash: Option<String>,
}

async fn load_counts(db: &DatabaseConnection) -> Result<(u64, u64, u64, u64, u64), DbErr> {
    let staff_count = Account::find()
        .filter(account::Column::Role.eq(AccountRole::Staff))
        .count(db)
        .await?;
    let librarian_count = Account::find()
        .filter(account::Column::Role.eq(AccountRole::Librarian))
        .count(db)
        .await?;
    let student_count = Student::find().count(db).await?;
    let loan_count = LibraryLoan::find().count(db).await?;
    let payment_count = FeePayment::find().count(db).await?;
    Ok((
        staff_count,
        librarian_count,
        student_count,
        loan_count,
        payment_count,
    ))
}

/// Entity counts and management links for the administrator.
#[instrument(skip(state, current))]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    match load_counts(&state.db).await {
        Ok((staff_count, librarian_count, student_count, loan_count, payment_count)) => {
            let flash = current.take_flash(&state.db).await;
            render_html(&AdminDashboardTemplate {
                username: current.username.clone(),
                staff_count,
                librarian_count,
                student_count,
                loan_count,
                payment_count,
                flash,
            })
        }
        Err(db_error) => {
            error!("Failed to load dashboard counts: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[instrument(skip(state, current))]
pub async fn staff_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    let flash = current.take_flash(&state.db).await;
    render_html(&StaffDashboardTemplate {
        username: current.username.clone(),
        flash,
    })
}

#[instrument(skip(state, current))]
pub async fn librarian_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    let flash = current.take_flash(&state.db).await;
    render_html(&LibrarianDashboardTemplate {
        username: current.username.clone(),
        flash,
    })
}

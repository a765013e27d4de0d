use crate::handlers::{
    accounts::{
        create_account, delete_account, edit_account, list_accounts, new_account, update_account,
    },
    auth::{login, login_form, logout},
    dashboard::{admin_dashboard, librarian_dashboard, staff_dashboard},
    fees::{
        create_payment, delete_payment, edit_payment, list_payments, new_payment,
        staff_create_payment, staff_delete_payment, staff_edit_payment, staff_list_payments,
        staff_new_payment, staff_update_payment, update_payment,
    },
    health::health_check,
    library::{
        create_loan, delete_loan, edit_loan, librarian_create_loan, librarian_delete_loan,
        librarian_edit_loan, librarian_list_loans, librarian_new_loan, librarian_update_loan,
        list_loans, new_loan, staff_list_loans, update_loan,
    },
    students::{
        create_student, delete_student, edit_student, librarian_list_students, list_students,
        new_student, staff_list_students, update_student,
    },
};
use crate::middleware::auth::{require_admin, require_librarian, require_session, require_staff};
use crate::schemas::AppState;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Administrator routes: account management plus full CRUD over every
    // entity.
    let admin_routes = Router::new()
        .route("/dashboard/admin", get(admin_dashboard))
        // Students
        .route("/students", get(list_students))
        .route("/students/new", get(new_student).post(create_student))
        .route(
            "/students/:student_id/edit",
            get(edit_student).post(update_student),
        )
        .route("/students/:student_id/delete", post(delete_student))
        // Accounts, scoped by role in the path; edit/delete are keyed by id
        .route("/users/:role", get(list_accounts))
        .route("/users/:role/new", get(new_account).post(create_account))
        .route(
            "/users/edit/:account_id",
            get(edit_account).post(update_account),
        )
        .route("/users/delete/:account_id", post(delete_account))
        // Library loans
        .route("/library", get(list_loans))
        .route("/library/new", get(new_loan).post(create_loan))
        .route("/library/:loan_id/edit", get(edit_loan).post(update_loan))
        .route("/library/:loan_id/delete", post(delete_loan))
        // Fee payments
        .route("/fees", get(list_payments))
        .route("/fees/new", get(new_payment).post(create_payment))
        .route("/fees/:payment_id/edit", get(edit_payment).post(update_payment))
        .route("/fees/:payment_id/delete", post(delete_payment))
        .route_layer(from_fn(require_admin));

    // Office staff routes: read-only students and loans, fee payment CRUD.
    let staff_routes = Router::new()
        .route("/dashboard/staff", get(staff_dashboard))
        .route("/staff/students", get(staff_list_students))
        .route("/staff/library", get(staff_list_loans))
        .route("/staff/fees", get(staff_list_payments))
        .route(
            "/staff/fees/new",
            get(staff_new_payment).post(staff_create_payment),
        )
        .route(
            "/staff/fees/:payment_id/edit",
            get(staff_edit_payment).post(staff_update_payment),
        )
        .route("/staff/fees/:payment_id/delete", post(staff_delete_payment))
        .route_layer(from_fn(require_staff));

    // Librarian routes: read-only students, loan CRUD.
    let librarian_routes = Router::new()
        .route("/dashboard/librarian", get(librarian_dashboard))
        .route("/librarian/students", get(librarian_list_students))
        .route("/librarian/library", get(librarian_list_loans))
        .route(
            "/librarian/library/new",
            get(librarian_new_loan).post(librarian_create_loan),
        )
        .route(
            "/librarian/library/:loan_id/edit",
            get(librarian_edit_loan).post(librarian_update_loan),
        )
        .route(
            "/librarian/library/:loan_id/delete",
            post(librarian_delete_loan),
        )
        .route_layer(from_fn(require_librarian));

    // Everything behind a session; the session middleware runs before the
    // role guards above.
    let protected_routes = Router::new()
        .route("/logout", get(logout))
        .merge(admin_routes)
        .merge(staff_routes)
        .merge(librarian_routes)
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        // Public routes
        .route("/login", get(login_form).post(login))
        .route("/health", get(health_check))
        .merge(protected_routes)
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(state)
}

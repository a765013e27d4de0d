use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use model::entities::prelude::Student;
use model::entities::student;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::forms::{self, FormError};
use crate::middleware::auth::CurrentAccount;
use crate::schemas::{render_html, AppState};

/// Form fields for creating or editing a student.
#[derive(Debug, Deserialize)]
pub struct StudentForm {
    pub name: Option<String>,
    pub age: Option<String>,
    pub grade: Option<String>,
}

#[derive(Template)]
#[template(path = "student_list.html")]
struct StudentListTemplate {
    students: Vec<student::Model>,
    flash: Option<String>,
    can_edit: bool,
}

#[derive(Template)]
#[template(path = "student_form.html")]
struct StudentFormTemplate {
    error: Option<String>,
    action: String,
    name: String,
    age: String,
    grade: String,
    editing: bool,
}

fn validate(form: &StudentForm) -> Result<(String, i32, String), FormError> {
    let name = forms::require(&form.name, "name")?;
    let age = forms::parse_age(&forms::require(&form.age, "age")?, "age")?;
    let grade = forms::require(&form.grade, "grade")?;
    Ok((name, age, grade))
}

/// Re-render the form with the submitted values and an error message.
fn rerender(form: &StudentForm, action: String, editing: bool, error: FormError) -> Response {
    render_html(&StudentFormTemplate {
        error: Some(error.to_string()),
        action,
        name: form.name.clone().unwrap_or_default(),
        age: form.age.clone().unwrap_or_default(),
        grade: form.grade.clone().unwrap_or_default(),
        editing,
    })
}

async fn render_student_list(state: &AppState, current: &CurrentAccount, can_edit: bool) -> Response {
    match Student::find().all(&state.db).await {
        Ok(students) => {
            debug!("Retrieved {} students", students.len());
            let flash = current.take_flash(&state.db).await;
            render_html(&StudentListTemplate {
                students,
                flash,
                can_edit,
            })
        }
        Err(db_error) => {
            error!("Failed to retrieve students: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// List all students for the administrator.
#[instrument(skip(state, current))]
pub async fn list_students(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_student_list(&state, &current, true).await
}

/// Read-only student listing for office staff.
#[instrument(skip(state, current))]
pub async fn staff_list_students(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_student_list(&state, &current, false).await
}

/// Read-only student listing for the librarian.
#[instrument(skip(state, current))]
pub async fn librarian_list_students(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Response {
    render_student_list(&state, &current, false).await
}

pub async fn new_student() -> Response {
    render_html(&StudentFormTemplate {
        error: None,
        action: "/students/new".to_string(),
        name: String::new(),
        age: String::new(),
        grade: String::new(),
        editing: false,
    })
}

#[instrument(skip(state, form))]
pub async fn create_student(
    State(state): State<AppState>,
    Form(form): Form<StudentForm>,
) -> Response {
    let (name, age, grade) = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Student form rejected: {}", form_error);
            return rerender(&form, "/students/new".to_string(), false, form_error);
        }
    };

    let new_student = student::ActiveModel {
        name: Set(name),
        age: Set(age),
        grade: Set(grade),
        ..Default::default()
    };

    match new_student.insert(&state.db).await {
        Ok(created) => {
            info!("Student created with ID: {}", created.id);
            Redirect::to("/students").into_response()
        }
        Err(db_error) => {
            error!("Failed to create student: {}", db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn edit_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    match Student::find_by_id(student_id).one(&state.db).await {
        Ok(Some(existing)) => render_html(&StudentFormTemplate {
            error: None,
            action: format!("/students/{}/edit", existing.id),
            name: existing.name,
            age: existing.age.to_string(),
            grade: existing.grade,
            editing: true,
        }),
        Ok(None) => {
            warn!("Student with ID {} not found", student_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to load student {}: {}", student_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[instrument(skip(state, form))]
pub async fn update_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    Form(form): Form<StudentForm>,
) -> Response {
    let existing = match Student::find_by_id(student_id).one(&state.db).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            warn!("Student with ID {} not found for update", student_id);
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(db_error) => {
            error!("Failed to load student {}: {}", student_id, db_error);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let action = format!("/students/{}/edit", student_id);
    let (name, age, grade) = match validate(&form) {
        Ok(fields) => fields,
        Err(form_error) => {
            debug!("Student form rejected: {}", form_error);
            return rerender(&form, action, true, form_error);
        }
    };

    let mut active: student::ActiveModel = existing.into();
    active.name = Set(name);
    active.age = Set(age);
    active.grade = Set(grade);

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Student with ID {} updated", updated.id);
            Redirect::to("/students").into_response()
        }
        Err(db_error) => {
            error!("Failed to update student {}: {}", student_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Delete a student. Loans and payments referencing it go with it.
#[instrument(skip(state))]
pub async fn delete_student(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
) -> Response {
    match Student::delete_by_id(student_id).exec(&state.db).await {
        Ok(result) if result.rows_affected > 0 => {
            info!("Student with ID {} deleted", student_id);
            Redirect::to("/dashboard/admin").into_response()
        }
        Ok(_) => {
            warn!("Student with ID {} not found for deletion", student_id);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(db_error) => {
            error!("Failed to delete student {}: {}", student_id, db_error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

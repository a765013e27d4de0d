#[cfg(test)]
mod integration_tests {
    use crate::router::create_router;
    use crate::schemas::AppState;
    use crate::test_utils::test_utils::{setup_test_app_state, TEST_PASSWORD};
    use axum::http::StatusCode;
    use axum_test::{TestServer, TestServerConfig};
    use model::entities::prelude::{Account, FeePayment, LibraryLoan, Session, Student};
    use model::entities::{account, fee_payment, library_loan, student};
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    /// Build a cookie-persisting test server plus the state backing it.
    async fn setup() -> (TestServer, AppState) {
        let state = setup_test_app_state().await;
        let app = create_router(state.clone());
        let mut config = TestServerConfig::default();
        config.save_cookies = true;
        let server = TestServer::new_with_config(app, config).unwrap();
        (server, state)
    }

    /// Log in through the form, carrying the session cookie in the server.
    async fn login_as(server: &TestServer, username: &str) {
        let response = server
            .post("/login")
            .form(&[("username", username), ("password", TEST_PASSWORD)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    async fn insert_student(state: &AppState, name: &str) -> student::Model {
        student::ActiveModel {
            name: Set(name.to_string()),
            age: Set(12),
            grade: Set("7A".to_string()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .expect("Failed to insert student")
    }

    #[tokio::test]
    async fn test_health_check() {
        let (server, _state) = setup().await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_login_redirects_to_role_dashboard() {
        for (username, destination) in [
            ("admin", "/dashboard/admin"),
            ("staff", "/dashboard/staff"),
            ("librarian", "/dashboard/librarian"),
        ] {
            let (server, _state) = setup().await;

            let response = server
                .post("/login")
                .form(&[("username", username), ("password", TEST_PASSWORD)])
                .await;

            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header("location").to_str().unwrap(), destination);

            // The session cookie now grants access to the dashboard
            let dashboard = server.get(destination).await;
            dashboard.assert_status(StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_login_with_bad_password_never_opens_a_session() {
        let (server, state) = setup().await;

        let response = server
            .post("/login")
            .form(&[("username", "admin"), ("password", "not the password")])
            .await;

        // The form re-renders with a generic error
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Invalid username or password"));

        let session_count = Session::find().count(&state.db).await.unwrap();
        assert_eq!(session_count, 0);

        // And no protected page is reachable
        let dashboard = server.get("/dashboard/admin").await;
        dashboard.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(dashboard.header("location").to_str().unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_login_with_unknown_username_rerenders_form() {
        let (server, state) = setup().await;

        let response = server
            .post("/login")
            .form(&[("username", "nobody"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Invalid username or password"));
        assert_eq!(Session::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_login() {
        let (server, state) = setup().await;

        let staff = model::accounts::find_by_username(&state.db, "staff")
            .await
            .unwrap()
            .unwrap();
        let mut active: account::ActiveModel = staff.into();
        active.is_active = Set(false);
        active.update(&state.db).await.unwrap();

        let response = server
            .post("/login")
            .form(&[("username", "staff"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Invalid username or password"));
        assert_eq!(Session::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_protected_route_without_session_redirects_to_login() {
        let (server, _state) = setup().await;

        for path in ["/students", "/dashboard/admin", "/staff/fees", "/logout"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header("location").to_str().unwrap(), "/login");
        }
    }

    #[tokio::test]
    async fn test_logout_invalidates_the_session() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        assert_eq!(Session::find().count(&state.db).await.unwrap(), 1);

        let response = server.get("/logout").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/login");
        assert_eq!(Session::find().count(&state.db).await.unwrap(), 0);

        let dashboard = server.get("/dashboard/admin").await;
        dashboard.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_role_mismatch_is_forbidden() {
        let (server, _state) = setup().await;
        login_as(&server, "staff").await;

        // Staff can reach their own pages
        server.get("/staff/fees").await.assert_status(StatusCode::OK);
        server
            .get("/staff/students")
            .await
            .assert_status(StatusCode::OK);

        // But not admin or librarian subtrees
        for path in ["/students", "/users/staff", "/library", "/librarian/library"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_student_create_edit_delete_flow() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        // Create
        let response = server
            .post("/students/new")
            .form(&[("name", "Asha Rao"), ("age", "12"), ("grade", "7A")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/students");

        let students = Student::find().all(&state.db).await.unwrap();
        assert_eq!(students.len(), 1);
        let student_id = students[0].id;

        // The list shows the new row
        let list = server.get("/students").await;
        list.assert_status(StatusCode::OK);
        assert!(list.text().contains("Asha Rao"));

        // Edit
        let response = server
            .post(&format!("/students/{}/edit", student_id))
            .form(&[("name", "Asha Rao"), ("age", "13"), ("grade", "8A")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let updated = Student::find_by_id(student_id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.age, 13);
        assert_eq!(updated.grade, "8A");

        // Delete redirects back to the dashboard
        let response = server
            .post(&format!("/students/{}/delete", student_id))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location").to_str().unwrap(),
            "/dashboard/admin"
        );
        assert_eq!(Student::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_student_form_with_missing_field_writes_nothing() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let response = server
            .post("/students/new")
            .form(&[("name", "Asha Rao"), ("age", "12")])
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Missing field: &#x27;grade&#x27;")
            || response.text().contains("Missing field: 'grade'"));
        assert_eq!(Student::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_student_age_must_be_non_negative() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let response = server
            .post("/students/new")
            .form(&[("name", "Asha Rao"), ("age", "-3"), ("grade", "7A")])
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(Student::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_editing_a_missing_student_is_not_found() {
        let (server, _state) = setup().await;
        login_as(&server, "admin").await;

        let response = server.get("/students/9999/edit").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .post("/students/9999/edit")
            .form(&[("name", "X"), ("age", "10"), ("grade", "5")])
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_username_writes_no_account() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        let before = Account::find().count(&state.db).await.unwrap();

        // "staff" is already seeded
        let response = server
            .post("/users/staff/new")
            .form(&[
                ("username", "staff"),
                ("first_name", "Dup"),
                ("last_name", "User"),
                ("email", "fresh@school.test"),
                ("password", "irrelevant"),
            ])
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Username already exists."));
        assert_eq!(Account::find().count(&state.db).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_duplicate_email_writes_no_account() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        let before = Account::find().count(&state.db).await.unwrap();

        let response = server
            .post("/users/staff/new")
            .form(&[
                ("username", "freshname"),
                ("first_name", "Dup"),
                ("last_name", "User"),
                ("email", "staff@school.test"),
                ("password", "irrelevant"),
            ])
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Email already exists."));
        assert_eq!(Account::find().count(&state.db).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_account_create_flow_stores_a_hash_and_flashes_once() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let response = server
            .post("/users/librarian/new")
            .form(&[
                ("username", "newlib"),
                ("first_name", "Lee"),
                ("last_name", "Ortega"),
                ("email", "newlib@school.test"),
                ("password", "stacks and stacks"),
                ("phone_number", "555-0100"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location").to_str().unwrap(),
            "/users/librarian"
        );

        let created = model::accounts::find_by_username(&state.db, "newlib")
            .await
            .unwrap()
            .expect("account should exist");
        assert_ne!(created.password_hash, "stacks and stacks");
        assert!(created.password_hash.starts_with("$2"));

        // The flash message shows on the next page only
        let list = server.get("/users/librarian").await;
        list.assert_status(StatusCode::OK);
        assert!(list.text().contains("Librarian created successfully."));

        let again = server.get("/users/librarian").await;
        assert!(!again.text().contains("Librarian created successfully."));
    }

    #[tokio::test]
    async fn test_account_edit_preserves_role_and_checks_uniqueness() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let staff = model::accounts::find_by_username(&state.db, "staff")
            .await
            .unwrap()
            .unwrap();

        // Renaming to an existing username re-renders the form
        let response = server
            .post(&format!("/users/edit/{}", staff.id))
            .form(&[
                ("username", "librarian"),
                ("first_name", "Test"),
                ("last_name", "Account"),
                ("email", "staff@school.test"),
            ])
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Username already exists."));

        // A clean edit goes through and redirects to the role listing
        let response = server
            .post(&format!("/users/edit/{}", staff.id))
            .form(&[
                ("username", "staff"),
                ("first_name", "Renamed"),
                ("last_name", "Account"),
                ("email", "staff@school.test"),
                ("phone_number", "555-0199"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/users/staff");

        let updated = Account::find_by_id(staff.id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Renamed");
        assert_eq!(updated.phone_number.as_deref(), Some("555-0199"));
        assert_eq!(updated.role, staff.role);
        assert_eq!(updated.password_hash, staff.password_hash);
    }

    #[tokio::test]
    async fn test_account_delete_redirects_to_role_listing() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let librarian = model::accounts::find_by_username(&state.db, "librarian")
            .await
            .unwrap()
            .unwrap();

        let response = server
            .post(&format!("/users/delete/{}", librarian.id))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location").to_str().unwrap(),
            "/users/librarian"
        );
        assert!(Account::find_by_id(librarian.id)
            .one(&state.db)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_role_listing_is_not_found() {
        let (server, _state) = setup().await;
        login_as(&server, "admin").await;

        let response = server.get("/users/janitor").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_loan_requires_an_existing_student() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let response = server
            .post("/library/new")
            .form(&[
                ("student_id", "9999"),
                ("book_title", "The Giver"),
                ("issue_date", "2024-02-10"),
            ])
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(LibraryLoan::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_payment_requires_an_existing_student() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;

        let response = server
            .post("/fees/new")
            .form(&[
                ("student_id", "9999"),
                ("amount", "250.50"),
                ("payment_date", "2024-03-05"),
            ])
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(FeePayment::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loan_flow_with_empty_return_date() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        let student = insert_student(&state, "Asha Rao").await;

        let response = server
            .post("/library/new")
            .form(&[
                ("student_id", &student.id.to_string()[..]),
                ("book_title", "A Wrinkle in Time"),
                ("issue_date", "2024-03-01"),
                ("return_date", ""),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/library");

        let loans = LibraryLoan::find().all(&state.db).await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].return_date, None);

        // Marking the book returned through the edit form
        let response = server
            .post(&format!("/library/{}/edit", loans[0].id))
            .form(&[
                ("student_id", &student.id.to_string()[..]),
                ("book_title", "A Wrinkle in Time"),
                ("issue_date", "2024-03-01"),
                ("return_date", "2024-03-15"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let updated = LibraryLoan::find_by_id(loans[0].id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.return_date.map(|d| d.to_string()),
            Some("2024-03-15".to_string())
        );

        // The admin listing shows the student's name
        let list = server.get("/library").await;
        assert!(list.text().contains("Asha Rao"));
        assert!(list.text().contains("A Wrinkle in Time"));
    }

    #[tokio::test]
    async fn test_staff_fee_flow() {
        let (server, state) = setup().await;
        login_as(&server, "staff").await;
        let student = insert_student(&state, "Ben Carter").await;

        let response = server
            .post("/staff/fees/new")
            .form(&[
                ("student_id", &student.id.to_string()[..]),
                ("amount", "120.00"),
                ("payment_date", "2024-04-01"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location").to_str().unwrap(), "/staff/fees");

        let payments = FeePayment::find().all(&state.db).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, Decimal::new(12000, 2));

        let response = server
            .post(&format!("/staff/fees/{}/delete", payments[0].id))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(FeePayment::find().count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleting_a_student_cascades_to_loans_and_payments() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        let student = insert_student(&state, "Asha Rao").await;
        let other = insert_student(&state, "Ben Carter").await;

        library_loan::ActiveModel {
            student_id: Set(student.id),
            book_title: Set("The Giver".to_string()),
            issue_date: Set(chrono::NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()),
            return_date: Set(None),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .unwrap();

        fee_payment::ActiveModel {
            student_id: Set(student.id),
            amount: Set(Decimal::new(25050, 2)),
            payment_date: Set(chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .unwrap();

        fee_payment::ActiveModel {
            student_id: Set(other.id),
            amount: Set(Decimal::new(10000, 2)),
            payment_date: Set(chrono::NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()),
            ..Default::default()
        }
        .insert(&state.db)
        .await
        .unwrap();

        let response = server
            .post(&format!("/students/{}/delete", student.id))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        assert_eq!(LibraryLoan::find().count(&state.db).await.unwrap(), 0);
        let remaining = FeePayment::find().all(&state.db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].student_id, other.id);
    }

    #[tokio::test]
    async fn test_librarian_manages_loans_from_their_own_pages() {
        let (server, state) = setup().await;
        login_as(&server, "librarian").await;
        let student = insert_student(&state, "Asha Rao").await;

        let response = server
            .post("/librarian/library/new")
            .form(&[
                ("student_id", &student.id.to_string()[..]),
                ("book_title", "Hatchet"),
                ("issue_date", "2024-05-02"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location").to_str().unwrap(),
            "/librarian/library"
        );

        // Flash message renders on the librarian listing
        let list = server.get("/librarian/library").await;
        assert!(list.text().contains("Library history added successfully."));
        assert!(list.text().contains("Hatchet"));

        // The librarian's student listing is read-only
        let students = server.get("/librarian/students").await;
        students.assert_status(StatusCode::OK);
        assert!(!students.text().contains("/students/new"));
    }

    #[tokio::test]
    async fn test_admin_dashboard_counts() {
        let (server, state) = setup().await;
        login_as(&server, "admin").await;
        insert_student(&state, "Asha Rao").await;
        insert_student(&state, "Ben Carter").await;

        let response = server.get("/dashboard/admin").await;
        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains("Office staff: 1"));
        assert!(body.contains("Librarians: 1"));
        assert!(body.contains("Students: 2"));
    }
}

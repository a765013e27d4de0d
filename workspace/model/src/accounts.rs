//! Account creation and credential checks.
//!
//! Accounts are only ever created through [`create_account`] (or
//! [`create_superuser`]), which bcrypt-hashes the credential before the row
//! is written.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use thiserror::Error;
use tracing::debug;

use crate::entities::account::{self, AccountRole};
use crate::entities::prelude::Account;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("The {0} field must be set.")]
    MissingField(&'static str),
    #[error("Username already exists.")]
    DuplicateUsername,
    #[error("Email already exists.")]
    DuplicateEmail,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Fields required to open a new account. The password arrives in plaintext
/// and leaves this module only as a bcrypt hash.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub role: AccountRole,
}

/// Create an account with a hashed credential.
///
/// Rejects empty username/email and duplicates of either unique field
/// before anything is written.
pub async fn create_account(
    db: &DatabaseConnection,
    new: NewAccount,
) -> Result<account::Model, AccountError> {
    if new.username.is_empty() {
        return Err(AccountError::MissingField("Username"));
    }
    if new.email.is_empty() {
        return Err(AccountError::MissingField("Email"));
    }

    if username_taken(db, &new.username, None).await? {
        return Err(AccountError::DuplicateUsername);
    }
    if email_taken(db, &new.email, None).await? {
        return Err(AccountError::DuplicateEmail);
    }

    insert_account(db, new, false, false).await
}

/// Create an administrator account with the staff and superuser flags set.
/// Backs the `create-admin` CLI subcommand.
pub async fn create_superuser(
    db: &DatabaseConnection,
    username: String,
    email: String,
    password: String,
) -> Result<account::Model, AccountError> {
    if username.is_empty() {
        return Err(AccountError::MissingField("Username"));
    }
    if email.is_empty() {
        return Err(AccountError::MissingField("Email"));
    }
    if username_taken(db, &username, None).await? {
        return Err(AccountError::DuplicateUsername);
    }
    if email_taken(db, &email, None).await? {
        return Err(AccountError::DuplicateEmail);
    }

    let new = NewAccount {
        username,
        first_name: String::new(),
        last_name: String::new(),
        email,
        password,
        phone_number: None,
        address: None,
        role: AccountRole::Admin,
    };
    insert_account(db, new, true, true).await
}

async fn insert_account(
    db: &DatabaseConnection,
    new: NewAccount,
    is_staff: bool,
    is_superuser: bool,
) -> Result<account::Model, AccountError> {
    let password_hash = bcrypt::hash(&new.password, bcrypt::DEFAULT_COST)?;
    debug!(username = %new.username, role = new.role.as_slug(), "inserting account");

    let model = account::ActiveModel {
        username: Set(new.username),
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        email: Set(new.email),
        phone_number: Set(new.phone_number),
        address: Set(new.address),
        password_hash: Set(password_hash),
        role: Set(new.role),
        is_active: Set(true),
        is_staff: Set(is_staff),
        is_superuser: Set(is_superuser),
        date_joined: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(model)
}

/// Check the submitted password against the stored bcrypt hash.
pub fn verify_password(account: &account::Model, password: &str) -> bool {
    bcrypt::verify(password, &account.password_hash).unwrap_or(false)
}

pub async fn find_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<account::Model>, DbErr> {
    Account::find()
        .filter(account::Column::Username.eq(username))
        .one(db)
        .await
}

/// Is `username` already used by an account other than `exclude_id`?
pub async fn username_taken(
    db: &DatabaseConnection,
    username: &str,
    exclude_id: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = Account::find().filter(account::Column::Username.eq(username));
    if let Some(id) = exclude_id {
        query = query.filter(account::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

/// Is `email` already used by an account other than `exclude_id`?
pub async fn email_taken(
    db: &DatabaseConnection,
    email: &str,
    exclude_id: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = Account::find().filter(account::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        query = query.filter(account::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

#[cfg(test)]
mod test {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait};

    use super::*;
    use crate::entities::prelude::Account;

    async fn setup_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = Database::connect(options)
            .await
            .expect("Failed to connect to in-memory database");
        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");
        Migrator::up(&db, None).await.expect("Migrations failed.");
        db
    }

    fn staff_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            first_name: "Sam".to_string(),
            last_name: "Iyer".to_string(),
            email: email.to_string(),
            password: "open sesame".to_string(),
            phone_number: None,
            address: None,
            role: AccountRole::Staff,
        }
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let db = setup_db().await;
        let account = create_account(&db, staff_account("sam", "sam@school.test"))
            .await
            .unwrap();

        assert_ne!(account.password_hash, "open sesame");
        assert!(account.password_hash.starts_with("$2"));
        assert!(verify_password(&account, "open sesame"));
        assert!(!verify_password(&account, "wrong"));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let db = setup_db().await;
        create_account(&db, staff_account("sam", "sam@school.test"))
            .await
            .unwrap();

        let err = create_account(&db, staff_account("sam", "other@school.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateUsername));

        // No second row was written
        let count = Account::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = setup_db().await;
        create_account(&db, staff_account("sam", "sam@school.test"))
            .await
            .unwrap();

        let err = create_account(&db, staff_account("alex", "sam@school.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));

        let count = Account::find().count(&db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn superuser_gets_admin_role_and_flags() {
        let db = setup_db().await;
        let admin = create_superuser(
            &db,
            "root".to_string(),
            "root@school.test".to_string(),
            "hunter2".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(admin.role, AccountRole::Admin);
        assert!(admin.is_staff);
        assert!(admin.is_superuser);
        assert!(admin.is_active);
    }

    #[tokio::test]
    async fn empty_username_is_rejected() {
        let db = setup_db().await;
        let err = create_account(&db, staff_account("", "sam@school.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::MissingField("Username")));
    }
}

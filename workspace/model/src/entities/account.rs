use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

/// The role assigned to an account, governing which dashboard it lands on
/// after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum AccountRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "staff")]
    Staff,
    #[sea_orm(string_value = "librarian")]
    Librarian,
}

impl AccountRole {
    /// Parse the role segment used in URLs ("admin", "staff", "librarian").
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "admin" => Some(Self::Admin),
            "staff" => Some(Self::Staff),
            "librarian" => Some(Self::Librarian),
            _ => None,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Librarian => "librarian",
        }
    }

    /// Human-readable label shown in page headings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Admin => "School Admin",
            Self::Staff => "Office Staff",
            Self::Librarian => "Librarian",
        }
    }
}

/// A login-capable identity with an assigned role.
///
/// Rows are only created through [`crate::accounts::create_account`], which
/// hashes the credential; `password_hash` never holds a plaintext password.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub password_hash: String,
    pub role: AccountRole,
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Browser sessions opened by this account.
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

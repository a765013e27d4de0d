use sea_orm::entity::prelude::*;

/// A student record. Age is validated as non-negative at the form boundary.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub grade: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::library_loan::Entity")]
    LibraryLoan,
    #[sea_orm(has_many = "super::fee_payment::Entity")]
    FeePayment,
}

impl Related<super::library_loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LibraryLoan.def()
    }
}

impl Related<super::fee_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeePayment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

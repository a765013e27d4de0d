//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the school administration application here.

pub mod account;
pub mod fee_payment;
pub mod library_loan;
pub mod session;
pub mod student;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::fee_payment::Entity as FeePayment;
    pub use super::library_loan::Entity as LibraryLoan;
    pub use super::session::Entity as Session;
    pub use super::student::Entity as Student;
}

pub mod accounts;
pub mod auth;
pub mod dashboard;
pub mod fees;
pub mod health;
pub mod library;
pub mod students;

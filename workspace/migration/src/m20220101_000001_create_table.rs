use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(string(Accounts::Username).unique_key())
                    .col(string(Accounts::FirstName))
                    .col(string(Accounts::LastName))
                    .col(string(Accounts::Email).unique_key())
                    .col(string_null(Accounts::PhoneNumber))
                    .col(text_null(Accounts::Address))
                    .col(string(Accounts::PasswordHash))
                    .col(string_len(Accounts::Role, 20))
                    .col(boolean(Accounts::IsActive).default(true))
                    .col(boolean(Accounts::IsStaff).default(false))
                    .col(boolean(Accounts::IsSuperuser).default(false))
                    .col(date_time(Accounts::DateJoined))
                    .to_owned(),
            )
            .await?;

        // Create students table
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(pk_auto(Students::Id))
                    .col(string(Students::Name))
                    .col(integer(Students::Age))
                    .col(string_len(Students::Grade, 50))
                    .to_owned(),
            )
            .await?;

        // Create library_loans table
        manager
            .create_table(
                Table::create()
                    .table(LibraryLoans::Table)
                    .if_not_exists()
                    .col(pk_auto(LibraryLoans::Id))
                    .col(integer(LibraryLoans::StudentId))
                    .col(string(LibraryLoans::BookTitle))
                    .col(date(LibraryLoans::IssueDate))
                    .col(date_null(LibraryLoans::ReturnDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_library_loan_student")
                            .from(LibraryLoans::Table, LibraryLoans::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create fee_payments table
        manager
            .create_table(
                Table::create()
                    .table(FeePayments::Table)
                    .if_not_exists()
                    .col(pk_auto(FeePayments::Id))
                    .col(integer(FeePayments::StudentId))
                    .col(decimal(FeePayments::Amount).decimal_len(10, 2))
                    .col(date(FeePayments::PaymentDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fee_payment_student")
                            .from(FeePayments::Table, FeePayments::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create sessions table
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(pk_auto(Sessions::Id))
                    .col(string(Sessions::Token).unique_key())
                    .col(integer(Sessions::AccountId))
                    .col(date_time(Sessions::ExpiresAt))
                    .col(text_null(Sessions::Flash))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_account")
                            .from(Sessions::Table, Sessions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LibraryLoans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Username,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Address,
    PasswordHash,
    Role,
    IsActive,
    IsStaff,
    IsSuperuser,
    DateJoined,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    Name,
    Age,
    Grade,
}

#[derive(DeriveIden)]
enum LibraryLoans {
    Table,
    Id,
    StudentId,
    BookTitle,
    IssueDate,
    ReturnDate,
}

#[derive(DeriveIden)]
enum FeePayments {
    Table,
    Id,
    StudentId,
    Amount,
    PaymentDate,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    Token,
    AccountId,
    ExpiresAt,
    Flash,
}

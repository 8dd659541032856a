//! Initial schema migration.
//!
//! - `users`: authentication
//! - `reminders`: payment reminders a lender attaches to a debt
//! - `debts`: money owed by a borrower to a lender
//! - `debt_transactions`: change requests on a debt and their approvals

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Reminders {
    Table,
    Id,
    LenderId,
    BorrowerId,
    Message,
    Deadline,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Debts {
    Table,
    Id,
    LenderId,
    BorrowerId,
    AmountMinor,
    Description,
    Status,
    GroupId,
    ReminderId,
    CreatedAt,
}

#[derive(Iden)]
enum DebtTransactions {
    Table,
    Id,
    DebtId,
    Kind,
    RequesterId,
    LenderApproved,
    BorrowerApproved,
    ProposedAmountMinor,
    ProposedDescription,
    Reason,
    Status,
    CreatedAt,
    ResolvedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Reminders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reminders::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reminders::LenderId).string().not_null())
                    .col(ColumnDef::new(Reminders::BorrowerId).string().not_null())
                    .col(ColumnDef::new(Reminders::Message).string())
                    .col(ColumnDef::new(Reminders::Deadline).timestamp())
                    .col(
                        ColumnDef::new(Reminders::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Reminders::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reminders-lender_id")
                            .from(Reminders::Table, Reminders::LenderId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reminders-borrower_id")
                            .from(Reminders::Table, Reminders::BorrowerId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Debts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Debts::LenderId).string().not_null())
                    .col(ColumnDef::new(Debts::BorrowerId).string().not_null())
                    .col(ColumnDef::new(Debts::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Debts::Description).string())
                    .col(
                        ColumnDef::new(Debts::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Debts::GroupId).string())
                    .col(ColumnDef::new(Debts::ReminderId).string())
                    .col(ColumnDef::new(Debts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-lender_id")
                            .from(Debts::Table, Debts::LenderId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-borrower_id")
                            .from(Debts::Table, Debts::BorrowerId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-reminder_id")
                            .from(Debts::Table, Debts::ReminderId)
                            .to(Reminders::Table, Reminders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debts-lender_id")
                    .table(Debts::Table)
                    .col(Debts::LenderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debts-borrower_id")
                    .table(Debts::Table)
                    .col(Debts::BorrowerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Debt transactions
        // ───────────────────────────────────────────────────────────────────
        // `debt_id` has no FK: requests outlive a dropped debt.
        manager
            .create_table(
                Table::create()
                    .table(DebtTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtTransactions::DebtId).string().not_null())
                    .col(ColumnDef::new(DebtTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(DebtTransactions::RequesterId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DebtTransactions::LenderApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DebtTransactions::BorrowerApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DebtTransactions::ProposedAmountMinor).big_integer())
                    .col(ColumnDef::new(DebtTransactions::ProposedDescription).string())
                    .col(ColumnDef::new(DebtTransactions::Reason).string())
                    .col(
                        ColumnDef::new(DebtTransactions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(DebtTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtTransactions::ResolvedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_transactions-requester_id")
                            .from(DebtTransactions::Table, DebtTransactions::RequesterId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debt_transactions-debt_id-created_at")
                    .table(DebtTransactions::Table)
                    .col(DebtTransactions::DebtId)
                    .col(DebtTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // At most one pending request per debt.
        manager
            .get_connection()
            .execute_unprepared(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx-debt_transactions-debt_id-pending"
                   ON debt_transactions (debt_id) WHERE status = 'pending'"#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(DebtTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

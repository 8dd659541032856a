use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};

use crate::{
    ChangeKind, ChangeRequest, ChangeStatus, DebtRecord, DebtStatus, EngineError, ResultEngine,
    debts, reminders,
};

use super::resolve::finalize;

/// Apply an approved request to its debt.
///
/// Runs inside the caller's database transaction. The request is finalized
/// first, conditionally on still being pending, so a request is applied at
/// most once even under concurrent approvals.
pub(super) async fn apply_approved(
    db: &DatabaseTransaction,
    request: &ChangeRequest,
    debt: &DebtRecord,
    resolved_at: DateTime<Utc>,
) -> ResultEngine<()> {
    finalize(db, request.id, ChangeStatus::Approved, resolved_at).await?;

    match request.kind {
        ChangeKind::Drop => {
            deactivate_reminder(db, debt).await?;
            let res = debts::Entity::delete_by_id(debt.id.to_string())
                .exec(db)
                .await?;
            ensure_debt_touched(res.rows_affected)?;
        }
        ChangeKind::Modify => {
            let mut update =
                debts::Entity::update_many().filter(debts::Column::Id.eq(debt.id.to_string()));
            if let Some(amount) = request.proposal.amount {
                update = update.col_expr(debts::Column::AmountMinor, Expr::value(amount.cents()));
            }
            if let Some(description) = &request.proposal.description {
                let description = (!description.is_empty()).then(|| description.clone());
                update = update.col_expr(debts::Column::Description, Expr::value(description));
            }
            let res = update.exec(db).await?;
            ensure_debt_touched(res.rows_affected)?;
        }
        ChangeKind::ConfirmPaid => {
            let res = debts::Entity::update_many()
                .col_expr(debts::Column::Status, Expr::value(DebtStatus::Paid.as_str()))
                .filter(debts::Column::Id.eq(debt.id.to_string()))
                .exec(db)
                .await?;
            ensure_debt_touched(res.rows_affected)?;
            deactivate_reminder(db, debt).await?;
        }
    }
    Ok(())
}

/// A settled or dropped debt stops nagging the borrower.
async fn deactivate_reminder(db: &DatabaseTransaction, debt: &DebtRecord) -> ResultEngine<()> {
    if let Some(reminder_id) = debt.reminder_id {
        reminders::Entity::update_many()
            .col_expr(reminders::Column::IsActive, Expr::value(false))
            .filter(reminders::Column::Id.eq(reminder_id.to_string()))
            .exec(db)
            .await?;
    }
    Ok(())
}

fn ensure_debt_touched(rows_affected: u64) -> ResultEngine<()> {
    if rows_affected == 0 {
        return Err(EngineError::KeyNotFound("debt not exists".to_string()));
    }
    Ok(())
}

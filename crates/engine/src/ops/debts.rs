use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DebtRecord, DebtStatus, EngineError, NewDebtCmd, Reminder, ResultEngine, debts, reminders,
    util::normalize_optional_text,
};

use super::{
    Engine, Party,
    access::{require_party, require_role},
    with_tx,
};

impl Engine {
    /// Record a new debt. Both users must exist.
    pub async fn new_debt(&self, cmd: NewDebtCmd) -> ResultEngine<DebtRecord> {
        let debt = DebtRecord::new(
            cmd.lender_id,
            cmd.borrower_id,
            cmd.amount,
            normalize_optional_text(cmd.description.as_deref()),
            normalize_optional_text(cmd.group_id.as_deref()),
            Utc::now(),
        )?;

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &debt.lender_id).await?;
            self.require_user_exists(&db_tx, &debt.borrower_id).await?;
            debts::ActiveModel::from(&debt).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::info!(
            debt_id = %debt.id,
            lender = %debt.lender_id,
            borrower = %debt.borrower_id,
            amount = %debt.amount,
            "debt recorded"
        );
        Ok(debt)
    }

    /// Attach a payment reminder to an outstanding debt. Lender only, one
    /// reminder per debt.
    pub async fn attach_reminder(
        &self,
        debt_id: Uuid,
        user_id: &str,
        message: Option<&str>,
        deadline: Option<DateTime<Utc>>,
    ) -> ResultEngine<Reminder> {
        with_tx!(self, |db_tx| {
            let debt = self.require_debt(&db_tx, debt_id).await?;
            require_role(user_id, &debt, Party::Lender)?;
            if debt.status == DebtStatus::Paid {
                return Err(EngineError::InvalidRequest(
                    "debt is already paid".to_string(),
                ));
            }
            if debt.reminder_id.is_some() {
                return Err(EngineError::Conflict(
                    "debt already has a reminder".to_string(),
                ));
            }

            let reminder = Reminder {
                id: Uuid::new_v4(),
                lender_id: debt.lender_id.clone(),
                borrower_id: debt.borrower_id.clone(),
                message: normalize_optional_text(message),
                deadline,
                is_active: true,
                created_at: Utc::now(),
            };
            reminders::ActiveModel::from(&reminder).insert(&db_tx).await?;
            debts::ActiveModel {
                id: ActiveValue::Set(debt.id.to_string()),
                reminder_id: ActiveValue::Set(Some(reminder.id.to_string())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok(reminder)
        })
    }

    /// Return a [`Reminder`] visible to its lender or borrower.
    pub async fn reminder(&self, reminder_id: Uuid, user_id: &str) -> ResultEngine<Reminder> {
        with_tx!(self, |db_tx| {
            let model = self.require_reminder(&db_tx, reminder_id).await?;
            let reminder = Reminder::try_from(model)?;
            if Party::of(user_id, &reminder.lender_id, &reminder.borrower_id).is_none() {
                return Err(EngineError::Forbidden(
                    "user is not a party of this reminder".to_string(),
                ));
            }
            Ok(reminder)
        })
    }

    /// The reminder attached to a debt, if any.
    pub async fn debt_reminder(
        &self,
        debt_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Option<Reminder>> {
        with_tx!(self, |db_tx| {
            let debt = self.require_debt(&db_tx, debt_id).await?;
            require_party(user_id, &debt)?;
            let reminder = match debt.reminder_id {
                Some(id) => Some(Reminder::try_from(self.require_reminder(&db_tx, id).await?)?),
                None => None,
            };
            Ok(reminder)
        })
    }
}

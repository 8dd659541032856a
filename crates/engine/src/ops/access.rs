use sea_orm::{DatabaseTransaction, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    ChangeRequest, DebtRecord, EngineError, ResultEngine, debt_transactions, debts, reminders,
    users,
};

use super::Engine;

/// Role of a user on a debt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Lender,
    Borrower,
}

impl Party {
    /// Resolve the role of `user_id`. Fails closed: a record whose lender
    /// equals its borrower grants no role to anyone.
    pub fn of(user_id: &str, lender_id: &str, borrower_id: &str) -> Option<Party> {
        if lender_id == borrower_id {
            return None;
        }
        if user_id == lender_id {
            Some(Self::Lender)
        } else if user_id == borrower_id {
            Some(Self::Borrower)
        } else {
            None
        }
    }

    pub fn counterpart(self) -> Party {
        match self {
            Self::Lender => Self::Borrower,
            Self::Borrower => Self::Lender,
        }
    }
}

/// The caller must be the lender or the borrower of `debt`.
pub(super) fn require_party(user_id: &str, debt: &DebtRecord) -> ResultEngine<Party> {
    debt.party_of(user_id).ok_or_else(|| {
        EngineError::Forbidden("user is not a party of this debt".to_string())
    })
}

/// The caller must hold exactly `party` on `debt`.
pub(super) fn require_role(user_id: &str, debt: &DebtRecord, party: Party) -> ResultEngine<()> {
    if debt.party_of(user_id) != Some(party) {
        let role = match party {
            Party::Lender => "lender",
            Party::Borrower => "borrower",
        };
        return Err(EngineError::Forbidden(format!(
            "only the {role} can do this"
        )));
    }
    Ok(())
}

/// The caller must be the user who opened `request`.
pub(super) fn require_requester(user_id: &str, request: &ChangeRequest) -> ResultEngine<()> {
    if request.requester_id != user_id {
        return Err(EngineError::Forbidden(
            "only the requester can cancel this transaction".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    pub(super) async fn find_debt(
        &self,
        db: &DatabaseTransaction,
        debt_id: Uuid,
    ) -> ResultEngine<Option<DebtRecord>> {
        debts::Entity::find_by_id(debt_id.to_string())
            .one(db)
            .await?
            .map(DebtRecord::try_from)
            .transpose()
    }

    pub(super) async fn require_debt(
        &self,
        db: &DatabaseTransaction,
        debt_id: Uuid,
    ) -> ResultEngine<DebtRecord> {
        self.find_debt(db, debt_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("debt not exists".to_string()))
    }

    pub(super) async fn require_request(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<ChangeRequest> {
        let model = debt_transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        ChangeRequest::try_from(model)
    }

    pub(super) async fn require_reminder(
        &self,
        db: &DatabaseTransaction,
        reminder_id: Uuid,
    ) -> ResultEngine<reminders::Model> {
        reminders::Entity::find_by_id(reminder_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("reminder not exists".to_string()))
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }
}

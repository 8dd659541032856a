use sea_orm::{
    Condition, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    ChangeRequest, ChangeStatus, DebtRecord, EngineError, ResultEngine, debt_transactions, debts,
};

use super::{
    Engine,
    access::{require_party, require_requester},
    with_tx,
};

impl Engine {
    /// Pending requests on debts where `user_id` is lender or borrower,
    /// newest first.
    pub async fn list_pending(&self, user_id: &str) -> ResultEngine<Vec<ChangeRequest>> {
        with_tx!(self, |db_tx| {
            let models = debt_transactions::Entity::find()
                .join(JoinType::InnerJoin, debt_transactions::Relation::Debts.def())
                .filter(debt_transactions::Column::Status.eq(ChangeStatus::Pending.as_str()))
                .filter(
                    Condition::any()
                        .add(debts::Column::LenderId.eq(user_id))
                        .add(debts::Column::BorrowerId.eq(user_id)),
                )
                .order_by_desc(debt_transactions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(ChangeRequest::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Number of pending requests still waiting for `user_id` to approve.
    pub async fn pending_count_for_user(&self, user_id: &str) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let count = debt_transactions::Entity::find()
                .join(JoinType::InnerJoin, debt_transactions::Relation::Debts.def())
                .filter(debt_transactions::Column::Status.eq(ChangeStatus::Pending.as_str()))
                .filter(
                    Condition::any()
                        .add(
                            Condition::all()
                                .add(debts::Column::LenderId.eq(user_id))
                                .add(debt_transactions::Column::LenderApproved.eq(false)),
                        )
                        .add(
                            Condition::all()
                                .add(debts::Column::BorrowerId.eq(user_id))
                                .add(debt_transactions::Column::BorrowerApproved.eq(false)),
                        ),
                )
                .count(&db_tx)
                .await?;
            Ok(count)
        })
    }

    /// Return a [`ChangeRequest`] visible to `user_id`.
    ///
    /// Once its debt has been dropped, a request is only visible to its
    /// requester.
    pub async fn request(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<ChangeRequest> {
        with_tx!(self, |db_tx| {
            let request = self.require_request(&db_tx, transaction_id).await?;
            match self.find_debt(&db_tx, request.debt_id).await? {
                Some(debt) => {
                    require_party(user_id, &debt)?;
                }
                None => require_requester(user_id, &request).map_err(|_| {
                    EngineError::Forbidden("user is not a party of this debt".to_string())
                })?,
            }
            Ok(request)
        })
    }

    /// Full request history of one debt, newest first.
    pub async fn list_debt_requests(
        &self,
        debt_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<ChangeRequest>> {
        with_tx!(self, |db_tx| {
            let debt = self.require_debt(&db_tx, debt_id).await?;
            require_party(user_id, &debt)?;
            let models = debt_transactions::Entity::find()
                .filter(debt_transactions::Column::DebtId.eq(debt_id.to_string()))
                .order_by_desc(debt_transactions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(ChangeRequest::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Return a [`DebtRecord`] (snapshot from DB).
    pub async fn debt(&self, debt_id: Uuid, user_id: &str) -> ResultEngine<DebtRecord> {
        with_tx!(self, |db_tx| {
            let debt = self.require_debt(&db_tx, debt_id).await?;
            require_party(user_id, &debt)?;
            Ok(debt)
        })
    }
}

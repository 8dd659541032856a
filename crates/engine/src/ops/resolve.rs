use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    ChangeRequest, ChangeStatus, EngineError, ResultEngine, debt_transactions,
    notify::{Notification, NotificationKind, NotificationPayload},
};

use super::{
    Engine, Party, Resolution,
    access::{require_party, require_requester},
    apply::apply_approved,
    with_tx,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Rejected,
    Applied,
    AwaitingCounterparty,
}

impl Engine {
    /// Approve or reject a pending request as one of the debt's parties.
    ///
    /// Approval sets the caller's flag; once both flags are set the change is
    /// applied in the same database transaction. Rejection resolves the
    /// request and leaves the debt untouched.
    pub async fn respond(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        approve: bool,
    ) -> ResultEngine<Resolution> {
        let resolved_at = Utc::now();

        let (request, debt, outcome) = with_tx!(self, |db_tx| {
            let request = self.require_request(&db_tx, transaction_id).await?;
            if !request.is_pending() {
                return Err(already_resolved());
            }
            let debt = self.require_debt(&db_tx, request.debt_id).await?;
            let party = require_party(user_id, &debt)?;

            let outcome = if approve {
                record_approval(&db_tx, request.id, party).await?;
                let current = self.require_request(&db_tx, request.id).await?;
                if current.has_consensus() {
                    apply_approved(&db_tx, &current, &debt, resolved_at).await?;
                    Outcome::Applied
                } else {
                    Outcome::AwaitingCounterparty
                }
            } else {
                finalize(&db_tx, request.id, ChangeStatus::Rejected, resolved_at).await?;
                Outcome::Rejected
            };

            let request = self.require_request(&db_tx, transaction_id).await?;
            Ok((request, debt, outcome))
        })?;

        match outcome {
            Outcome::Applied => {
                tracing::info!(
                    request_id = %request.id,
                    debt_id = %debt.id,
                    kind = request.kind.as_str(),
                    "change request applied"
                );
                self.notify(Notification {
                    kind: NotificationKind::RequestApplied,
                    recipient: request.requester_id.clone(),
                    payload: NotificationPayload::describe(&request, &debt, user_id),
                });
            }
            Outcome::Rejected => {
                tracing::info!(request_id = %request.id, by = %user_id, "change request rejected");
                let recipient = if request.requester_id == user_id {
                    counterpart_of(&debt, user_id)
                } else {
                    Some(request.requester_id.clone())
                };
                if let Some(recipient) = recipient {
                    self.notify(Notification {
                        kind: NotificationKind::RequestRejected,
                        recipient,
                        payload: NotificationPayload::describe(&request, &debt, user_id),
                    });
                }
            }
            Outcome::AwaitingCounterparty => {
                tracing::debug!(request_id = %request.id, by = %user_id, "approval recorded");
            }
        }

        Ok(Resolution {
            debt_mutated: outcome == Outcome::Applied,
            request,
        })
    }

    /// Withdraw a pending request. Only its requester may do this.
    pub async fn cancel(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<ChangeRequest> {
        let resolved_at = Utc::now();

        let (request, debt) = with_tx!(self, |db_tx| {
            let request = self.require_request(&db_tx, transaction_id).await?;
            if !request.is_pending() {
                return Err(already_resolved());
            }
            require_requester(user_id, &request)?;
            finalize(&db_tx, request.id, ChangeStatus::Cancelled, resolved_at).await?;

            let debt = self.find_debt(&db_tx, request.debt_id).await?;
            let request = self.require_request(&db_tx, transaction_id).await?;
            Ok((request, debt))
        })?;

        tracing::info!(request_id = %request.id, "change request cancelled");
        if let Some(debt) = debt
            && let Some(recipient) = counterpart_of(&debt, user_id)
        {
            self.notify(Notification {
                kind: NotificationKind::RequestCancelled,
                recipient,
                payload: NotificationPayload::describe(&request, &debt, user_id),
            });
        }
        Ok(request)
    }
}

fn counterpart_of(debt: &crate::DebtRecord, user_id: &str) -> Option<String> {
    debt.party_of(user_id)
        .map(|party| debt.user_of(party.counterpart()).to_string())
}

pub(super) fn already_resolved() -> EngineError {
    EngineError::AlreadyResolved("transaction is not pending".to_string())
}

/// Set the approval flag of `party`, only while the request is pending.
async fn record_approval(
    db: &DatabaseTransaction,
    request_id: Uuid,
    party: Party,
) -> ResultEngine<()> {
    let column = match party {
        Party::Lender => debt_transactions::Column::LenderApproved,
        Party::Borrower => debt_transactions::Column::BorrowerApproved,
    };
    let res = debt_transactions::Entity::update_many()
        .col_expr(column, Expr::value(true))
        .filter(debt_transactions::Column::Id.eq(request_id.to_string()))
        .filter(debt_transactions::Column::Status.eq(ChangeStatus::Pending.as_str()))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(already_resolved());
    }
    Ok(())
}

/// Move a request out of `pending`. Losing a race with another resolution
/// yields [`EngineError::AlreadyResolved`].
pub(super) async fn finalize(
    db: &DatabaseTransaction,
    request_id: Uuid,
    status: ChangeStatus,
    resolved_at: DateTime<Utc>,
) -> ResultEngine<()> {
    let res = debt_transactions::Entity::update_many()
        .col_expr(
            debt_transactions::Column::Status,
            Expr::value(status.as_str()),
        )
        .col_expr(
            debt_transactions::Column::ResolvedAt,
            Expr::value(Some(resolved_at)),
        )
        .filter(debt_transactions::Column::Id.eq(request_id.to_string()))
        .filter(debt_transactions::Column::Status.eq(ChangeStatus::Pending.as_str()))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(already_resolved());
    }
    Ok(())
}

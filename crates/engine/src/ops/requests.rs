use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, DbErr, PaginatorTrait, QueryFilter, SqlErr, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    ChangeKind, ChangeRequest, ChangeStatus, CreateRequestCmd, EngineError, MoneyCents,
    Proposal, ResultEngine, debt_transactions,
    notify::{Notification, NotificationKind, NotificationPayload},
    util::normalize_optional_text,
};

use super::{Engine, access::require_party, with_tx};

impl Engine {
    /// Open a change request on a debt.
    ///
    /// The requester's own approval flag starts set. The counterparty is
    /// notified once the request is committed.
    pub async fn create_request(&self, cmd: CreateRequestCmd) -> ResultEngine<ChangeRequest> {
        let reason = normalize_optional_text(cmd.reason.as_deref());
        let created_at = Utc::now();

        let (request, debt, party) = with_tx!(self, |db_tx| {
            let debt = self.require_debt(&db_tx, cmd.debt_id).await?;
            let party = require_party(&cmd.requester_id, &debt)?;
            let proposal = validate_proposal(
                cmd.kind,
                cmd.proposed_amount,
                cmd.proposed_description.as_deref(),
            )?;
            self.ensure_no_pending(&db_tx, debt.id).await?;

            let request = ChangeRequest::new(
                debt.id,
                cmd.kind,
                cmd.requester_id.clone(),
                party,
                proposal,
                reason,
                created_at,
            );
            debt_transactions::ActiveModel::from(&request)
                .insert(&db_tx)
                .await
                .map_err(map_pending_conflict)?;
            Ok((request, debt, party))
        })?;

        tracing::info!(
            request_id = %request.id,
            debt_id = %debt.id,
            kind = request.kind.as_str(),
            requester = %request.requester_id,
            "change request opened"
        );
        self.notify(Notification {
            kind: NotificationKind::RequestCreated,
            recipient: debt.user_of(party.counterpart()).to_string(),
            payload: NotificationPayload::describe(&request, &debt, &request.requester_id),
        });
        Ok(request)
    }

    async fn ensure_no_pending(&self, db: &DatabaseTransaction, debt_id: Uuid) -> ResultEngine<()> {
        let pending = debt_transactions::Entity::find()
            .filter(debt_transactions::Column::DebtId.eq(debt_id.to_string()))
            .filter(debt_transactions::Column::Status.eq(ChangeStatus::Pending.as_str()))
            .count(db)
            .await?;
        if pending > 0 {
            return Err(pending_conflict());
        }
        Ok(())
    }
}

/// Check the proposed values against `kind`.
///
/// `modify` needs at least one proposed field and a positive amount. The
/// description is trimmed but kept when empty, which clears it on apply.
/// Other kinds carry no proposal.
fn validate_proposal(
    kind: ChangeKind,
    amount: Option<MoneyCents>,
    description: Option<&str>,
) -> ResultEngine<Proposal> {
    if kind != ChangeKind::Modify {
        return Ok(Proposal::default());
    }
    if amount.is_none() && description.is_none() {
        return Err(EngineError::InvalidRequest(
            "modify requires a new amount or description".to_string(),
        ));
    }
    if let Some(amount) = amount
        && !amount.is_positive()
    {
        return Err(EngineError::InvalidRequest(
            "proposed amount must be > 0".to_string(),
        ));
    }
    Ok(Proposal {
        amount,
        description: description.map(|d| d.trim().to_string()),
    })
}

fn pending_conflict() -> EngineError {
    EngineError::Conflict("debt already has a pending transaction".to_string())
}

/// A concurrent insert that lost the race hits the partial unique index.
fn map_pending_conflict(err: DbErr) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => pending_conflict(),
        _ => EngineError::Database(err),
    }
}

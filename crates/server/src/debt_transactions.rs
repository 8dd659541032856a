//! Debt transaction API endpoints

use api_types::debt_transaction::{
    ChangeKind as ApiKind, ChangeStatus as ApiStatus, DebtTransactionListResponse,
    DebtTransactionNew, DebtTransactionResolution, DebtTransactionRespond, DebtTransactionView,
    PendingCount,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{ChangeKind, ChangeRequest, ChangeStatus, CreateRequestCmd, MoneyCents};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: ChangeKind) -> ApiKind {
    match kind {
        ChangeKind::Drop => ApiKind::Drop,
        ChangeKind::Modify => ApiKind::Modify,
        ChangeKind::ConfirmPaid => ApiKind::ConfirmPaid,
    }
}

fn map_api_kind(kind: ApiKind) -> ChangeKind {
    match kind {
        ApiKind::Drop => ChangeKind::Drop,
        ApiKind::Modify => ChangeKind::Modify,
        ApiKind::ConfirmPaid => ChangeKind::ConfirmPaid,
    }
}

fn map_status(status: ChangeStatus) -> ApiStatus {
    match status {
        ChangeStatus::Pending => ApiStatus::Pending,
        ChangeStatus::Approved => ApiStatus::Approved,
        ChangeStatus::Rejected => ApiStatus::Rejected,
        ChangeStatus::Cancelled => ApiStatus::Cancelled,
    }
}

pub(crate) fn view(request: ChangeRequest) -> DebtTransactionView {
    DebtTransactionView {
        id: request.id,
        debt_id: request.debt_id,
        kind: map_kind(request.kind),
        requester_id: request.requester_id,
        lender_approved: request.lender_approved,
        borrower_approved: request.borrower_approved,
        proposed_amount_minor: request.proposal.amount.map(MoneyCents::cents),
        proposed_description: request.proposal.description,
        reason: request.reason,
        status: map_status(request.status),
        created_at: request.created_at,
        resolved_at: request.resolved_at,
    }
}

/// Pending requests on the caller's debts, newest first.
pub async fn list_pending(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<DebtTransactionListResponse>, ServerError> {
    let requests = state.engine.list_pending(&user.username).await?;
    Ok(Json(DebtTransactionListResponse {
        transactions: requests.into_iter().map(view).collect(),
    }))
}

pub async fn pending_count(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<PendingCount>, ServerError> {
    let count = state.engine.pending_count_for_user(&user.username).await?;
    Ok(Json(PendingCount { count }))
}

/// Open a change request on a debt the caller is party to.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<DebtTransactionNew>,
) -> Result<(StatusCode, Json<DebtTransactionView>), ServerError> {
    let mut cmd = CreateRequestCmd::new(payload.debt_id, map_api_kind(payload.kind), user.username);
    if let Some(amount) = payload.proposed_amount_minor {
        cmd = cmd.amount(amount);
    }
    if let Some(description) = payload.proposed_description {
        cmd = cmd.description(description);
    }
    if let Some(reason) = payload.reason {
        cmd = cmd.reason(reason);
    }

    let request = state.engine.create_request(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(request))))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtTransactionView>, ServerError> {
    let request = state.engine.request(id, &user.username).await?;
    Ok(Json(view(request)))
}

/// Approve or reject a pending request.
pub async fn respond(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DebtTransactionRespond>,
) -> Result<Json<DebtTransactionResolution>, ServerError> {
    let resolution = state
        .engine
        .respond(id, &user.username, payload.approve)
        .await?;
    Ok(Json(DebtTransactionResolution {
        transaction: view(resolution.request),
        debt_mutated: resolution.debt_mutated,
    }))
}

/// Withdraw a pending request opened by the caller.
pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtTransactionView>, ServerError> {
    let request = state.engine.cancel(id, &user.username).await?;
    Ok(Json(view(request)))
}

//! Debt API endpoints

use api_types::{
    debt::{DebtStatus as ApiStatus, DebtView},
    debt_transaction::DebtTransactionListResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::DebtStatus;
use uuid::Uuid;

use crate::{ServerError, debt_transactions::view, server::ServerState, user};

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtView>, ServerError> {
    let debt = state.engine.debt(id, &user.username).await?;
    Ok(Json(DebtView {
        id: debt.id,
        lender_id: debt.lender_id,
        borrower_id: debt.borrower_id,
        amount_minor: debt.amount.cents(),
        description: debt.description,
        status: match debt.status {
            DebtStatus::Pending => ApiStatus::Pending,
            DebtStatus::Paid => ApiStatus::Paid,
        },
        group_id: debt.group_id,
        reminder_id: debt.reminder_id,
        created_at: debt.created_at,
    }))
}

/// Request history of a debt, newest first.
pub async fn transactions(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtTransactionListResponse>, ServerError> {
    let requests = state.engine.list_debt_requests(id, &user.username).await?;
    Ok(Json(DebtTransactionListResponse {
        transactions: requests.into_iter().map(view).collect(),
    }))
}

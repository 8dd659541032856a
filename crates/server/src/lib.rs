use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod debt_transactions;
mod debts;
mod server;
mod user;

pub mod types {
    pub mod debt {
        pub use api_types::debt::{DebtStatus, DebtView};
    }

    pub mod debt_transaction {
        pub use api_types::debt_transaction::{
            ChangeKind, ChangeStatus, DebtTransactionListResponse, DebtTransactionNew,
            DebtTransactionResolution, DebtTransactionRespond, DebtTransactionView, PendingCount,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_) | EngineError::AlreadyResolved(_) => StatusCode::CONFLICT,
        EngineError::Database(_) | EngineError::Commit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidRequest(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Commit(db_err) => {
            tracing::error!("commit failed: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

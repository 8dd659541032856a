use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod debt {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DebtStatus {
        Pending,
        Paid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtView {
        pub id: Uuid,
        pub lender_id: String,
        pub borrower_id: String,
        /// Amount in cents.
        pub amount_minor: i64,
        pub description: Option<String>,
        pub status: DebtStatus,
        pub group_id: Option<String>,
        pub reminder_id: Option<Uuid>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod debt_transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ChangeKind {
        Drop,
        Modify,
        ConfirmPaid,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ChangeStatus {
        Pending,
        Approved,
        Rejected,
        Cancelled,
    }

    /// Request body for opening a change request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtTransactionNew {
        pub debt_id: Uuid,
        pub kind: ChangeKind,
        /// New amount in cents. `modify` only.
        pub proposed_amount_minor: Option<i64>,
        /// New description; an empty string clears it. `modify` only.
        pub proposed_description: Option<String>,
        pub reason: Option<String>,
    }

    /// Request body for approving or rejecting a pending request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtTransactionRespond {
        pub approve: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtTransactionView {
        pub id: Uuid,
        pub debt_id: Uuid,
        pub kind: ChangeKind,
        pub requester_id: String,
        pub lender_approved: bool,
        pub borrower_approved: bool,
        pub proposed_amount_minor: Option<i64>,
        pub proposed_description: Option<String>,
        pub reason: Option<String>,
        pub status: ChangeStatus,
        pub created_at: DateTime<Utc>,
        pub resolved_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtTransactionListResponse {
        pub transactions: Vec<DebtTransactionView>,
    }

    /// Response body for `PATCH /debtTransactions/{id}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtTransactionResolution {
        pub transaction: DebtTransactionView,
        /// `true` when both parties agreed and the debt was changed.
        pub debt_mutated: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingCount {
        pub count: u64,
    }
}

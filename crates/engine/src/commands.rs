//! Command structs for engine operations.
//!
//! These types group parameters for write operations (debt creation and
//! change requests), keeping call sites readable and avoiding long argument
//! lists.

use uuid::Uuid;

use crate::{ChangeKind, MoneyCents};

/// Open a change request on a debt.
#[derive(Clone, Debug)]
pub struct CreateRequestCmd {
    pub debt_id: Uuid,
    pub kind: ChangeKind,
    pub requester_id: String,
    pub proposed_amount: Option<MoneyCents>,
    pub proposed_description: Option<String>,
    pub reason: Option<String>,
}

impl CreateRequestCmd {
    #[must_use]
    pub fn new(debt_id: Uuid, kind: ChangeKind, requester_id: impl Into<String>) -> Self {
        Self {
            debt_id,
            kind,
            requester_id: requester_id.into(),
            proposed_amount: None,
            proposed_description: None,
            reason: None,
        }
    }

    /// Request that the debt be deleted.
    #[must_use]
    pub fn drop(debt_id: Uuid, requester_id: impl Into<String>) -> Self {
        Self::new(debt_id, ChangeKind::Drop, requester_id)
    }

    /// Request a new amount and/or description.
    #[must_use]
    pub fn modify(debt_id: Uuid, requester_id: impl Into<String>) -> Self {
        Self::new(debt_id, ChangeKind::Modify, requester_id)
    }

    /// Request that the debt be marked as paid.
    #[must_use]
    pub fn confirm_paid(debt_id: Uuid, requester_id: impl Into<String>) -> Self {
        Self::new(debt_id, ChangeKind::ConfirmPaid, requester_id)
    }

    #[must_use]
    pub fn amount(mut self, amount: impl Into<MoneyCents>) -> Self {
        self.proposed_amount = Some(amount.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.proposed_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Record a new debt between two users.
#[derive(Clone, Debug)]
pub struct NewDebtCmd {
    pub lender_id: String,
    pub borrower_id: String,
    pub amount: MoneyCents,
    pub description: Option<String>,
    pub group_id: Option<String>,
}

impl NewDebtCmd {
    #[must_use]
    pub fn new(
        lender_id: impl Into<String>,
        borrower_id: impl Into<String>,
        amount: impl Into<MoneyCents>,
    ) -> Self {
        Self {
            lender_id: lender_id.into(),
            borrower_id: borrower_id.into(),
            amount: amount.into(),
            description: None,
            group_id: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

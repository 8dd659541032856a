//! Change requests ("debt transactions").
//!
//! A `ChangeRequest` proposes one mutation of a `DebtRecord` and carries one
//! approval flag per party. It leaves `Pending` exactly once.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, Party, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Drop,
    Modify,
    ConfirmPaid,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Modify => "modify",
            Self::ConfirmPaid => "confirm_paid",
        }
    }
}

impl TryFrom<&str> for ChangeKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "drop" => Ok(Self::Drop),
            "modify" => Ok(Self::Modify),
            "confirm_paid" => Ok(Self::ConfirmPaid),
            other => Err(EngineError::InvalidId(format!(
                "invalid change kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for ChangeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidId(format!(
                "invalid change status: {other}"
            ))),
        }
    }
}

/// Values proposed by a `modify` request. Empty for the other kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub amount: Option<MoneyCents>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub kind: ChangeKind,
    pub requester_id: String,
    pub lender_approved: bool,
    pub borrower_approved: bool,
    pub proposal: Proposal,
    pub reason: Option<String>,
    pub status: ChangeStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    /// Opens a pending request; the requester's own flag starts approved.
    pub fn new(
        debt_id: Uuid,
        kind: ChangeKind,
        requester_id: String,
        requester_party: Party,
        proposal: Proposal,
        reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            debt_id,
            kind,
            requester_id,
            lender_approved: requester_party == Party::Lender,
            borrower_approved: requester_party == Party::Borrower,
            proposal,
            reason,
            status: ChangeStatus::Pending,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeStatus::Pending
    }

    pub fn approved_by(&self, party: Party) -> bool {
        match party {
            Party::Lender => self.lender_approved,
            Party::Borrower => self.borrower_approved,
        }
    }

    /// Both parties agree.
    pub fn has_consensus(&self) -> bool {
        self.lender_approved && self.borrower_approved
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debt_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub debt_id: String,
    pub kind: String,
    pub requester_id: String,
    pub lender_approved: bool,
    pub borrower_approved: bool,
    pub proposed_amount_minor: Option<i64>,
    pub proposed_description: Option<String>,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub resolved_at: Option<DateTimeUtc>,
}

// No FK on `debt_id`: the history of a dropped debt is kept.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debts::Entity",
        from = "Column::DebtId",
        to = "super::debts::Column::Id"
    )]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ChangeRequest> for ActiveModel {
    fn from(request: &ChangeRequest) -> Self {
        Self {
            id: ActiveValue::Set(request.id.to_string()),
            debt_id: ActiveValue::Set(request.debt_id.to_string()),
            kind: ActiveValue::Set(request.kind.as_str().to_string()),
            requester_id: ActiveValue::Set(request.requester_id.clone()),
            lender_approved: ActiveValue::Set(request.lender_approved),
            borrower_approved: ActiveValue::Set(request.borrower_approved),
            proposed_amount_minor: ActiveValue::Set(request.proposal.amount.map(MoneyCents::cents)),
            proposed_description: ActiveValue::Set(request.proposal.description.clone()),
            reason: ActiveValue::Set(request.reason.clone()),
            status: ActiveValue::Set(request.status.as_str().to_string()),
            created_at: ActiveValue::Set(request.created_at),
            resolved_at: ActiveValue::Set(request.resolved_at),
        }
    }
}

impl TryFrom<Model> for ChangeRequest {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            debt_id: parse_uuid(&model.debt_id, "debt")?,
            kind: ChangeKind::try_from(model.kind.as_str())?,
            requester_id: model.requester_id,
            lender_approved: model.lender_approved,
            borrower_approved: model.borrower_approved,
            proposal: Proposal {
                amount: model.proposed_amount_minor.map(MoneyCents::new),
                description: model.proposed_description,
            },
            reason: model.reason,
            status: ChangeStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            resolved_at: model.resolved_at,
        })
    }
}

//! Debt records.
//!
//! A `DebtRecord` is the shared financial fact under management: `lender_id`
//! is owed `amount` by `borrower_id`. Once created it is only mutated through
//! an approved change request.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, Party, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    #[default]
    Pending,
    Paid,
}

impl DebtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl TryFrom<&str> for DebtStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::InvalidId(format!("invalid debt status: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub id: Uuid,
    pub lender_id: String,
    pub borrower_id: String,
    pub amount: MoneyCents,
    pub description: Option<String>,
    pub status: DebtStatus,
    pub group_id: Option<String>,
    pub reminder_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl DebtRecord {
    pub fn new(
        lender_id: String,
        borrower_id: String,
        amount: MoneyCents,
        description: Option<String>,
        group_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if lender_id == borrower_id {
            return Err(EngineError::InvalidRequest(
                "lender and borrower must differ".to_string(),
            ));
        }
        let amount = amount.ensure_positive("amount")?;
        Ok(Self {
            id: Uuid::new_v4(),
            lender_id,
            borrower_id,
            amount,
            description,
            status: DebtStatus::Pending,
            group_id,
            reminder_id: None,
            created_at,
        })
    }

    /// Role of `user_id` on this debt, `None` when not a party.
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        Party::of(user_id, &self.lender_id, &self.borrower_id)
    }

    /// Username holding `party` on this debt.
    pub fn user_of(&self, party: Party) -> &str {
        match party {
            Party::Lender => &self.lender_id,
            Party::Borrower => &self.borrower_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lender_id: String,
    pub borrower_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub status: String,
    pub group_id: Option<String>,
    pub reminder_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reminders::Entity",
        from = "Column::ReminderId",
        to = "super::reminders::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Reminders,
    #[sea_orm(has_many = "super::debt_transactions::Entity")]
    DebtTransactions,
}

impl Related<super::reminders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reminders.def()
    }
}

impl Related<super::debt_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebtTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DebtRecord> for ActiveModel {
    fn from(debt: &DebtRecord) -> Self {
        Self {
            id: ActiveValue::Set(debt.id.to_string()),
            lender_id: ActiveValue::Set(debt.lender_id.clone()),
            borrower_id: ActiveValue::Set(debt.borrower_id.clone()),
            amount_minor: ActiveValue::Set(debt.amount.cents()),
            description: ActiveValue::Set(debt.description.clone()),
            status: ActiveValue::Set(debt.status.as_str().to_string()),
            group_id: ActiveValue::Set(debt.group_id.clone()),
            reminder_id: ActiveValue::Set(debt.reminder_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(debt.created_at),
        }
    }
}

impl TryFrom<Model> for DebtRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "debt")?,
            lender_id: model.lender_id,
            borrower_id: model.borrower_id,
            amount: MoneyCents::new(model.amount_minor),
            description: model.description,
            status: DebtStatus::try_from(model.status.as_str())?,
            group_id: model.group_id,
            reminder_id: model
                .reminder_id
                .as_deref()
                .map(|id| parse_uuid(id, "reminder"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}

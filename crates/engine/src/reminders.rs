//! Reminders attached by a lender to an outstanding debt.
//!
//! Settling or dropping the debt deactivates its reminder.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub lender_id: String,
    pub borrower_id: String,
    pub message: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lender_id: String,
    pub borrower_id: String,
    pub message: Option<String>,
    pub deadline: Option<DateTimeUtc>,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::debts::Entity")]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Reminder> for ActiveModel {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: ActiveValue::Set(reminder.id.to_string()),
            lender_id: ActiveValue::Set(reminder.lender_id.clone()),
            borrower_id: ActiveValue::Set(reminder.borrower_id.clone()),
            message: ActiveValue::Set(reminder.message.clone()),
            deadline: ActiveValue::Set(reminder.deadline),
            is_active: ActiveValue::Set(reminder.is_active),
            created_at: ActiveValue::Set(reminder.created_at),
        }
    }
}

impl TryFrom<Model> for Reminder {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "reminder")?,
            lender_id: model.lender_id,
            borrower_id: model.borrower_id,
            message: model.message,
            deadline: model.deadline,
            is_active: model.is_active,
            created_at: model.created_at,
        })
    }
}

//! Two-party consensus engine for shared debts.
//!
//! Lender and borrower change a debt through a [`ChangeRequest`]: one party
//! opens it (approving it implicitly), the other approves, rejects, or the
//! requester cancels. On consensus the change is applied to the
//! [`DebtRecord`] in the same database transaction that resolves the request.

pub use commands::{CreateRequestCmd, NewDebtCmd};
pub use debt_transactions::{ChangeKind, ChangeRequest, ChangeStatus, Proposal};
pub use debts::{DebtRecord, DebtStatus};
pub use error::EngineError;
pub use money::MoneyCents;
pub use notify::{
    ChannelNotifier, LogNotifier, Notification, NotificationKind, NotificationPayload, Notifier,
    NotifyError,
};
pub use ops::{Engine, EngineBuilder, Party, Resolution};
pub use reminders::Reminder;

mod commands;
mod debt_transactions;
mod debts;
mod error;
mod money;
mod notify;
mod ops;
mod reminders;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;

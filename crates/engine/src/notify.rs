//! Notification dispatch.
//!
//! The engine emits a [`Notification`] after each committed creation or
//! resolution. Delivery is best effort: a [`Notifier`] must not block, and
//! its failures are logged and dropped by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{ChangeKind, ChangeRequest, DebtRecord, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestCreated,
    RequestApplied,
    RequestRejected,
    RequestCancelled,
}

/// Before/after view of the change, so the recipient does not need to
/// query the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub request_id: Uuid,
    pub debt_id: Uuid,
    pub change_kind: ChangeKind,
    /// The party who triggered the notification.
    pub counterparty: String,
    pub amount_before: MoneyCents,
    pub amount_after: MoneyCents,
    pub description_before: Option<String>,
    pub description_after: Option<String>,
    pub reason: Option<String>,
}

impl NotificationPayload {
    pub fn describe(request: &ChangeRequest, debt: &DebtRecord, counterparty: &str) -> Self {
        let (amount_after, description_after) = match request.kind {
            ChangeKind::Modify => (
                request.proposal.amount.unwrap_or(debt.amount),
                match &request.proposal.description {
                    Some(description) => {
                        (!description.is_empty()).then(|| description.clone())
                    }
                    None => debt.description.clone(),
                },
            ),
            ChangeKind::Drop | ChangeKind::ConfirmPaid => (debt.amount, debt.description.clone()),
        };
        Self {
            request_id: request.id,
            debt_id: debt.id,
            change_kind: request.kind,
            counterparty: counterparty.to_string(),
            amount_before: debt.amount,
            amount_after,
            description_before: debt.description.clone(),
            description_after,
            reason: request.reason.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub payload: NotificationPayload,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Hand the notification over for delivery. Must return without waiting
    /// on the delivery itself.
    fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            request_id = %notification.payload.request_id,
            "notification"
        );
        Ok(())
    }
}

/// Queues notifications on an unbounded channel consumed by a delivery task.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Deliver `notification`, logging and discarding any failure.
pub(crate) fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    let kind = notification.kind;
    let recipient = notification.recipient.clone();
    if let Err(err) = notifier.notify(notification) {
        tracing::warn!(?kind, %recipient, "dropping notification: {err}");
    }
}

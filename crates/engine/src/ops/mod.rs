use std::sync::Arc;

use sea_orm::{ConnectOptions, DatabaseConnection};

use crate::{
    ChangeRequest, ResultEngine,
    notify::{self, LogNotifier, Notification, Notifier},
};

mod access;
mod apply;
mod debts;
mod list;
mod requests;
mod resolve;

pub use access::Party;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// Errors from the block drop the transaction (rollback). A failing commit is
/// reported as [`EngineError::Commit`](crate::EngineError::Commit).
///
/// SQLite transactions begin deferred, so the engine expects a
/// single-connection pool (see [`Engine::connect_options`]). Units of work
/// then run one at a time and a losing writer sees the winner's committed
/// state instead of `SQLITE_BUSY`.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::EngineError::Commit)?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Outcome of [`Engine::respond`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub request: ChangeRequest,
    /// `true` when consensus was reached and the debt was changed.
    pub debt_mutated: bool,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Connection options for the database the engine runs on: a pool of
    /// exactly one connection.
    pub fn connect_options(url: impl Into<String>) -> ConnectOptions {
        let mut options = ConnectOptions::new(url.into());
        options.max_connections(1).min_connections(1);
        options
    }

    fn notify(&self, notification: Notification) {
        notify::dispatch(self.notifier.as_ref(), notification);
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn Notifier>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where notifications go. Defaults to [`LogNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
        })
    }
}

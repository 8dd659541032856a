use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    ChangeKind, ChangeStatus, ChannelNotifier, CreateRequestCmd, DebtRecord, DebtStatus, Engine,
    EngineError, MoneyCents, NewDebtCmd, Notification, NotificationKind, Notifier, NotifyError,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn seed_users(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    for name in ["alice", "bob", "carol"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![name.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
}

async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    seed_users(&db).await;
    db
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = memory_db().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_notifier(notifier: Arc<dyn Notifier>) -> Engine {
    Engine::builder()
        .database(memory_db().await)
        .notifier(notifier)
        .build()
        .await
        .unwrap()
}

async fn engine_with_file_db() -> (Engine, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(Engine::connect_options(url)).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    seed_users(&db).await;
    let engine = Engine::builder().database(db).build().await.unwrap();
    (engine, path)
}

/// Alice lent Bob 50.00 for dinner.
async fn dinner(engine: &Engine) -> DebtRecord {
    engine
        .new_debt(NewDebtCmd::new("alice", "bob", 5000).description("dinner"))
        .await
        .unwrap()
}

fn assert_unchanged(after: &DebtRecord, before: &DebtRecord) {
    assert_eq!(after.amount, before.amount);
    assert_eq!(after.description, before.description);
    assert_eq!(after.status, before.status);
    assert_eq!(after.reminder_id, before.reminder_id);
}

#[derive(Debug)]
struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("smtp unreachable".to_string()))
    }
}

#[tokio::test]
async fn confirm_paid_by_borrower_then_lender_approval_marks_paid() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "bob"))
        .await
        .unwrap();
    assert_eq!(request.status, ChangeStatus::Pending);
    assert!(request.borrower_approved);
    assert!(!request.lender_approved);

    let resolution = engine.respond(request.id, "alice", true).await.unwrap();
    assert!(resolution.debt_mutated);
    assert_eq!(resolution.request.status, ChangeStatus::Approved);
    assert!(resolution.request.resolved_at.is_some());

    let debt = engine.debt(debt.id, "alice").await.unwrap();
    assert_eq!(debt.status, DebtStatus::Paid);
    assert_eq!(debt.amount, MoneyCents::new(5000));
}

#[tokio::test]
async fn rejected_modify_leaves_debt_untouched() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(3500))
        .await
        .unwrap();
    let resolution = engine.respond(request.id, "bob", false).await.unwrap();
    assert!(!resolution.debt_mutated);
    assert_eq!(resolution.request.status, ChangeStatus::Rejected);
    assert!(resolution.request.resolved_at.is_some());

    let after = engine.debt(debt.id, "bob").await.unwrap();
    assert_unchanged(&after, &debt);
}

#[tokio::test]
async fn second_request_on_same_debt_conflicts() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();

    let err = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn empty_modify_is_invalid() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let err = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    let err = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn outsiders_cannot_open_or_answer_requests() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let err = engine
        .create_request(CreateRequestCmd::drop(debt.id, "carol"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();
    let err = engine.respond(request.id, "carol", true).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine.request(request.id, "carol").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    assert!(engine.debt(debt.id, "alice").await.is_ok());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_request(CreateRequestCmd::drop(Uuid::new_v4(), "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.respond(Uuid::new_v4(), "alice", true).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.cancel(Uuid::new_v4(), "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn requester_approving_own_request_does_not_apply() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    for (requester, cmd) in [
        ("alice", CreateRequestCmd::drop(debt.id, "alice")),
        ("bob", CreateRequestCmd::confirm_paid(debt.id, "bob")),
    ] {
        let request = engine.create_request(cmd).await.unwrap();
        let resolution = engine.respond(request.id, requester, true).await.unwrap();
        assert!(!resolution.debt_mutated);
        assert_eq!(resolution.request.status, ChangeStatus::Pending);
        assert!(!resolution.request.has_consensus());

        engine.cancel(request.id, requester).await.unwrap();
    }

    let after = engine.debt(debt.id, "alice").await.unwrap();
    assert_unchanged(&after, &debt);
}

#[tokio::test]
async fn amount_only_modify_keeps_description() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(
            CreateRequestCmd::modify(debt.id, "bob")
                .amount(MoneyCents::new(3500))
                .reason("  split the tip  "),
        )
        .await
        .unwrap();
    assert_eq!(request.reason.as_deref(), Some("split the tip"));
    assert_eq!(request.proposal.description, None);

    let resolution = engine.respond(request.id, "alice", true).await.unwrap();
    assert!(resolution.debt_mutated);

    let after = engine.debt(debt.id, "alice").await.unwrap();
    assert_eq!(after.amount, MoneyCents::new(3500));
    assert_eq!(after.description.as_deref(), Some("dinner"));
    assert_eq!(after.status, DebtStatus::Pending);
}

#[tokio::test]
async fn description_modify_can_clear_description() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").description(""))
        .await
        .unwrap();
    engine.respond(request.id, "bob", true).await.unwrap();

    let after = engine.debt(debt.id, "bob").await.unwrap();
    assert_eq!(after.description, None);
    assert_eq!(after.amount, MoneyCents::new(5000));
}

#[tokio::test]
async fn approved_drop_deletes_debt_and_deactivates_reminder() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;
    let reminder = engine
        .attach_reminder(debt.id, "alice", Some("pay me back"), None)
        .await
        .unwrap();
    assert!(reminder.is_active);

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "bob").reason("duplicate"))
        .await
        .unwrap();
    let resolution = engine.respond(request.id, "alice", true).await.unwrap();
    assert!(resolution.debt_mutated);
    assert_eq!(resolution.request.status, ChangeStatus::Approved);

    let err = engine.debt(debt.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let reminder = engine.reminder(reminder.id, "alice").await.unwrap();
    assert!(!reminder.is_active);

    // The history survives the debt, for the requester only.
    let kept = engine.request(request.id, "bob").await.unwrap();
    assert_eq!(kept.kind, ChangeKind::Drop);
    assert_eq!(kept.status, ChangeStatus::Approved);
    let err = engine.request(request.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn confirm_paid_deactivates_reminder() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;
    let reminder = engine
        .attach_reminder(debt.id, "alice", None, None)
        .await
        .unwrap();

    let request = engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "alice"))
        .await
        .unwrap();
    engine.respond(request.id, "bob", true).await.unwrap();

    let reminder = engine.reminder(reminder.id, "bob").await.unwrap();
    assert!(!reminder.is_active);
    let attached = engine.debt_reminder(debt.id, "bob").await.unwrap();
    assert_eq!(attached.map(|r| r.id), Some(reminder.id));
}

#[tokio::test]
async fn reminder_is_lender_only_and_unique() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let err = engine
        .attach_reminder(debt.id, "bob", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .attach_reminder(debt.id, "alice", None, None)
        .await
        .unwrap();
    let err = engine
        .attach_reminder(debt.id, "alice", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn cancel_rules() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();

    let err = engine.cancel(request.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let cancelled = engine.cancel(request.id, "alice").await.unwrap();
    assert_eq!(cancelled.status, ChangeStatus::Cancelled);
    assert!(cancelled.resolved_at.is_some());

    let err = engine.cancel(request.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
    let err = engine.respond(request.id, "bob", true).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyResolved(_)));

    // The slot is free again.
    engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "bob"))
        .await
        .unwrap();
    assert_unchanged(&engine.debt(debt.id, "alice").await.unwrap(), &debt);
}

#[tokio::test]
async fn resolved_request_cannot_be_answered_again() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(4000))
        .await
        .unwrap();
    engine.respond(request.id, "bob", true).await.unwrap();

    let err = engine.respond(request.id, "bob", true).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
    let err = engine.respond(request.id, "alice", false).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyResolved(_)));
}

#[tokio::test]
async fn concurrent_approvals_apply_once() {
    let (engine, _db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.respond(request.id, "bob", true),
        engine.respond(request.id, "bob", true),
    );
    let results = [first, second];
    let applied = results
        .iter()
        .filter(|res| matches!(res, Ok(resolution) if resolution.debt_mutated))
        .count();
    assert_eq!(applied, 1);
    assert!(
        results
            .iter()
            .any(|res| matches!(res, Err(EngineError::AlreadyResolved(_))))
    );
}

#[tokio::test]
async fn concurrent_approvals_on_file_db_apply_once() {
    let (engine, path) = engine_with_file_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        engine.respond(request.id, "bob", true),
        engine.respond(request.id, "bob", true),
    );
    let results = [first, second];
    let applied = results
        .iter()
        .filter(|res| matches!(res, Ok(resolution) if resolution.debt_mutated))
        .count();
    assert_eq!(applied, 1);
    // The loser waits for the pool and sees the resolved request, never a busy database.
    assert!(
        results
            .iter()
            .any(|res| matches!(res, Err(EngineError::AlreadyResolved(_))))
    );

    let stored = engine.request(request.id, "alice").await.unwrap();
    assert_eq!(stored.status, ChangeStatus::Approved);
    let err = engine.debt(debt.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn concurrent_creates_leave_one_pending_request() {
    let (engine, path) = engine_with_file_db().await;
    let debt = dinner(&engine).await;

    let (first, second) = tokio::join!(
        engine.create_request(CreateRequestCmd::drop(debt.id, "alice")),
        engine.create_request(CreateRequestCmd::confirm_paid(debt.id, "bob")),
    );
    let results = [first, second];
    let created = results.iter().filter(|res| res.is_ok()).count();
    assert_eq!(created, 1);
    assert!(
        results
            .iter()
            .any(|res| matches!(res, Err(EngineError::Conflict(_))))
    );

    let pending = engine.list_pending("alice").await.unwrap();
    assert_eq!(pending.len(), 1);

    drop(engine);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn failed_apply_rolls_back_the_approval() {
    let (engine, db) = engine_with_db().await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(MoneyCents::new(3500)))
        .await
        .unwrap();

    db.execute_unprepared(
        "CREATE TRIGGER boom BEFORE UPDATE ON debts BEGIN SELECT RAISE(ABORT, 'boom'); END",
    )
    .await
    .unwrap();
    let err = engine.respond(request.id, "bob", true).await.unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));
    db.execute_unprepared("DROP TRIGGER boom").await.unwrap();

    let stored = engine.request(request.id, "bob").await.unwrap();
    assert_eq!(stored.status, ChangeStatus::Pending);
    assert!(stored.lender_approved);
    assert!(!stored.borrower_approved);
    assert_eq!(stored.resolved_at, None);
    assert_unchanged(&engine.debt(debt.id, "bob").await.unwrap(), &debt);

    let resolution = engine.respond(request.id, "bob", true).await.unwrap();
    assert!(resolution.debt_mutated);
    assert_eq!(
        engine.debt(debt.id, "bob").await.unwrap().amount,
        MoneyCents::new(3500)
    );
}

#[tokio::test]
async fn pending_index_rejects_a_second_pending_row() {
    let (engine, db) = engine_with_db().await;
    let debt = dinner(&engine).await;
    engine
        .create_request(CreateRequestCmd::drop(debt.id, "alice"))
        .await
        .unwrap();

    let insert = |status: &'static str| {
        Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT INTO debt_transactions (id, debt_id, kind, requester_id, status, created_at) \
             VALUES (?, ?, 'confirm_paid', 'bob', ?, ?)",
            vec![
                Uuid::new_v4().to_string().into(),
                debt.id.to_string().into(),
                status.into(),
                chrono::Utc::now().into(),
            ],
        )
    };
    assert!(db.execute(insert("pending")).await.is_err());
    db.execute(insert("rejected")).await.unwrap();

    let history = engine.list_debt_requests(debt.id, "alice").await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn list_pending_and_counts_follow_parties() {
    let (engine, _db) = engine_with_db().await;
    let first = dinner(&engine).await;
    let second = engine
        .new_debt(NewDebtCmd::new("bob", "alice", 1200).group_id("flat"))
        .await
        .unwrap();

    let older = engine
        .create_request(CreateRequestCmd::drop(first.id, "alice"))
        .await
        .unwrap();
    let newer = engine
        .create_request(CreateRequestCmd::confirm_paid(second.id, "alice"))
        .await
        .unwrap();

    let pending = engine.list_pending("bob").await.unwrap();
    assert_eq!(
        pending.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );
    assert!(engine.list_pending("carol").await.unwrap().is_empty());

    assert_eq!(engine.pending_count_for_user("bob").await.unwrap(), 2);
    assert_eq!(engine.pending_count_for_user("alice").await.unwrap(), 0);

    engine.respond(older.id, "bob", false).await.unwrap();
    assert_eq!(engine.list_pending("alice").await.unwrap().len(), 1);
    assert_eq!(engine.pending_count_for_user("bob").await.unwrap(), 1);

    let history = engine.list_debt_requests(first.id, "alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ChangeStatus::Rejected);
    let err = engine
        .list_debt_requests(first.id, "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn new_debt_requires_known_distinct_users() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_debt(NewDebtCmd::new("alice", "dave", 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .new_debt(NewDebtCmd::new("alice", "alice", 100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    let err = engine
        .new_debt(NewDebtCmd::new("alice", "bob", -5))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn notifications_reach_the_other_party() {
    let (notifier, mut rx) = ChannelNotifier::new();
    let engine = engine_with_notifier(Arc::new(notifier)).await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::modify(debt.id, "alice").amount(3500))
        .await
        .unwrap();
    let created = rx.try_recv().unwrap();
    assert_eq!(created.kind, NotificationKind::RequestCreated);
    assert_eq!(created.recipient, "bob");
    assert_eq!(created.payload.counterparty, "alice");
    assert_eq!(created.payload.amount_before, MoneyCents::new(5000));
    assert_eq!(created.payload.amount_after, MoneyCents::new(3500));

    engine.respond(request.id, "bob", true).await.unwrap();
    let applied = rx.try_recv().unwrap();
    assert_eq!(applied.kind, NotificationKind::RequestApplied);
    assert_eq!(applied.recipient, "alice");
    assert_eq!(applied.payload.request_id, request.id);

    let request = engine
        .create_request(CreateRequestCmd::drop(debt.id, "bob"))
        .await
        .unwrap();
    let _ = rx.try_recv().unwrap();
    // A requester rejecting their own request tells the other party.
    engine.respond(request.id, "bob", false).await.unwrap();
    let rejected = rx.try_recv().unwrap();
    assert_eq!(rejected.kind, NotificationKind::RequestRejected);
    assert_eq!(rejected.recipient, "alice");

    let request = engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "bob"))
        .await
        .unwrap();
    let _ = rx.try_recv().unwrap();
    engine.cancel(request.id, "bob").await.unwrap();
    let cancelled = rx.try_recv().unwrap();
    assert_eq!(cancelled.kind, NotificationKind::RequestCancelled);
    assert_eq!(cancelled.recipient, "alice");

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failing_notifier_does_not_fail_operations() {
    let engine = engine_with_notifier(Arc::new(FailingNotifier)).await;
    let debt = dinner(&engine).await;

    let request = engine
        .create_request(CreateRequestCmd::confirm_paid(debt.id, "bob"))
        .await
        .unwrap();
    let resolution = engine.respond(request.id, "alice", true).await.unwrap();
    assert!(resolution.debt_mutated);
    assert_eq!(
        engine.debt(debt.id, "bob").await.unwrap().status,
        DebtStatus::Paid
    );
}

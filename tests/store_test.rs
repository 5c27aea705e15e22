use credrelay::db;
use credrelay::domain::{DomainError, LoginStatus};
use credrelay::models::ActorKind;
use credrelay::services::{
    EventBus, JobOutcome, NewPendingLogin, PendingLoginStore, TransitionOpts,
};

// Helper to create a store over an in-memory database
async fn setup_store() -> PendingLoginStore {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    PendingLoginStore::new(db, EventBus::new())
}

fn submission(platform: &str) -> NewPendingLogin {
    NewPendingLogin {
        platform: platform.to_string(),
        username: "a@x.com".to_string(),
        password: "p".to_string(),
        ..Default::default()
    }
}

fn admin_opts() -> TransitionOpts {
    TransitionOpts {
        actor: ActorKind::Admin,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_starts_pending_with_unique_ids() {
    let store = setup_store().await;

    let first = store.create(submission("facebook")).await.unwrap();
    let second = store.create(submission("facebook")).await.unwrap();

    assert_eq!(first.status(), LoginStatus::Pending);
    assert_eq!(second.status(), LoginStatus::Pending);
    assert_ne!(first.id, second.id);
    assert!(!first.requires_otp);
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let store = setup_store().await;

    let mut missing_platform = submission("facebook");
    missing_platform.platform = "  ".to_string();
    assert!(matches!(
        store.create(missing_platform).await,
        Err(DomainError::Validation(_))
    ));

    let mut missing_password = submission("facebook");
    missing_password.password = String::new();
    assert!(matches!(
        store.create(missing_password).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_transition_table_is_enforced() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();

    // pending -> otp_required -> approved is legal
    store
        .transition(&record.id, LoginStatus::OtpRequired, admin_opts())
        .await
        .unwrap();
    let approved = store
        .transition(&record.id, LoginStatus::Approved, admin_opts())
        .await
        .unwrap();
    assert_eq!(approved.status(), LoginStatus::Approved);

    // approved is terminal for admin decisions
    let err = store
        .transition(&record.id, LoginStatus::Denied, admin_opts())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InvalidTransition {
            from: LoginStatus::Approved,
            to: LoginStatus::Denied
        }
    ));

    // state unchanged after the rejected transition
    let current = store.get(&record.id).await.unwrap();
    assert_eq!(current.status(), LoginStatus::Approved);
}

#[tokio::test]
async fn test_require_otp_only_from_pending() {
    let store = setup_store().await;
    let record = store.create(submission("google")).await.unwrap();

    store
        .transition(&record.id, LoginStatus::Denied, admin_opts())
        .await
        .unwrap();

    assert!(matches!(
        store
            .transition(&record.id, LoginStatus::OtpRequired, admin_opts())
            .await,
        Err(DomainError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_unknown_id_is_not_found_and_emits_nothing() {
    let store = setup_store().await;
    let mut rx = store.events().subscribe();

    assert!(matches!(
        store
            .transition("no-such-id", LoginStatus::Approved, admin_opts())
            .await,
        Err(DomainError::NotFound)
    ));
    assert!(matches!(store.get("no-such-id").await, Err(DomainError::NotFound)));

    assert!(rx.try_recv().is_err(), "no event for a failed decision");
    assert!(store.audit_trail("no-such-id").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_trail_follows_commit_order() {
    let store = setup_store().await;
    let mut rx = store.events().subscribe();

    let record = store.create(submission("facebook")).await.unwrap();
    store
        .transition(&record.id, LoginStatus::OtpRequired, admin_opts())
        .await
        .unwrap();
    store
        .transition(&record.id, LoginStatus::Approved, admin_opts())
        .await
        .unwrap();

    let trail = store.audit_trail(&record.id).await.unwrap();
    let moves: Vec<(Option<&str>, &str)> = trail
        .iter()
        .map(|e| (e.from_status.as_deref(), e.to_status.as_str()))
        .collect();
    assert_eq!(
        moves,
        vec![
            (None, "pending"),
            (Some("pending"), "otp_required"),
            (Some("otp_required"), "approved"),
        ]
    );

    // Fan-out delivered the same events in the same order
    assert_eq!(rx.recv().await.unwrap().to_status, "pending");
    assert_eq!(rx.recv().await.unwrap().to_status, "otp_required");
    assert_eq!(rx.recv().await.unwrap().to_status, "approved");
}

#[tokio::test]
async fn test_deny_records_reason_note() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();

    let denied = store
        .transition(
            &record.id,
            LoginStatus::Denied,
            TransitionOpts {
                actor: ActorKind::Admin,
                note: Some("suspicious submission".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(denied.note.as_deref(), Some("suspicious submission"));
}

#[tokio::test]
async fn test_concurrent_decisions_have_one_winner() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();

    let (approve, deny) = tokio::join!(
        store.transition(&record.id, LoginStatus::Approved, admin_opts()),
        store.transition(&record.id, LoginStatus::Denied, admin_opts()),
    );

    let winners = [approve.is_ok(), deny.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(winners, 1, "exactly one decision wins");

    let losers = [approve, deny]
        .into_iter()
        .filter_map(|r| r.err())
        .collect::<Vec<_>>();
    assert_eq!(losers.len(), 1);
    assert!(matches!(
        losers[0],
        DomainError::InvalidTransition { .. }
    ));
}

#[tokio::test]
async fn test_needs_otp_outcome_flags_record_without_status_change() {
    let store = setup_store().await;
    let record = store.create(submission("google")).await.unwrap();
    store
        .transition(&record.id, LoginStatus::Approved, admin_opts())
        .await
        .unwrap();

    let updated = store
        .record_outcome(&record.id, JobOutcome::NeedsOtp)
        .await
        .unwrap();

    assert_eq!(updated.status(), LoginStatus::Approved);
    assert!(updated.requires_otp);
}

#[tokio::test]
async fn test_failed_outcome_moves_job_to_failed() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();
    store
        .transition(&record.id, LoginStatus::Approved, admin_opts())
        .await
        .unwrap();

    let updated = store
        .record_outcome(
            &record.id,
            JobOutcome::Failed("profile_not_resolved".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.status(), LoginStatus::Failed);
    assert_eq!(updated.job_error.as_deref(), Some("profile_not_resolved"));
}

#[tokio::test]
async fn test_success_outcome_leaves_record_untouched() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();
    let approved = store
        .transition(&record.id, LoginStatus::Approved, admin_opts())
        .await
        .unwrap();

    let after = store
        .record_outcome(&record.id, JobOutcome::Success)
        .await
        .unwrap();

    assert_eq!(after.status(), LoginStatus::Approved);
    assert_eq!(after.updated_at, approved.updated_at);
}

#[tokio::test]
async fn test_list_is_newest_first_and_filterable() {
    let store = setup_store().await;

    let _first = store.create(submission("facebook")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = store.create(submission("google")).await.unwrap();
    store
        .transition(&second.id, LoginStatus::Denied, admin_opts())
        .await
        .unwrap();

    let all = store.list(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id, "newest first");

    let denied = store.list(Some(LoginStatus::Denied)).await.unwrap();
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].id, second.id);
}

#[tokio::test]
async fn test_repeated_reads_are_stable_between_transitions() {
    let store = setup_store().await;
    let record = store.create(submission("facebook")).await.unwrap();

    let a = store.get(&record.id).await.unwrap();
    let b = store.get(&record.id).await.unwrap();
    assert_eq!(a, b);
}

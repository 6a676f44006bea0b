//! Integration tests for marking posts resolved.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forum_attention::api::{self, Caller, SetResolvedPayload};
use forum_attention::clock::FixedClock;
use forum_attention::config::{Config, ResolveScope};
use forum_attention::db::{
    add_category_moderator, create_category, create_topic, create_user, get_events_for_post,
    get_post, update_user_admin, update_user_global_moderator, Database, NewTopic,
    ResolvedState,
};
use forum_attention::error::WorkflowError;
use forum_attention::workflow::{
    ObserverRegistry, ResolutionChange, ResolutionObserver, Workflow,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

const NOW: i64 = 1_735_732_800_000; // 2025-01-01T12:00:00Z
const DESIGNATED: &str = "Comments & Feedback";

struct Forum {
    workflow: Workflow,
    db: Database,
    admin: i64,
    global_mod: i64,
    category_mod: i64,
    regular: i64,
    author: i64,
    comments_cid: i64,
    other_cid: i64,
    comments_pid: i64,
    other_pid: i64,
    _temp_dir: TempDir,
}

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

async fn setup_forum(config: &Config, observers: ObserverRegistry) -> Forum {
    let (db, temp_dir) = setup_db().await;
    let pool = db.pool();

    let admin = create_user(pool, "resolvedadmin").await.unwrap();
    let global_mod = create_user(pool, "resolvedglobalmod").await.unwrap();
    let category_mod = create_user(pool, "resolvedcategorymod").await.unwrap();
    let regular = create_user(pool, "resolvedregularuser").await.unwrap();
    let author = create_user(pool, "resolvedpostauthor").await.unwrap();

    update_user_admin(pool, admin, true).await.unwrap();
    update_user_global_moderator(pool, global_mod, true).await.unwrap();

    let comments_cid = create_category(pool, "Comments &amp; Feedback", None, DESIGNATED)
        .await
        .unwrap();
    let other_cid = create_category(pool, "General Discussion", None, DESIGNATED)
        .await
        .unwrap();
    add_category_moderator(pool, comments_cid, category_mod)
        .await
        .unwrap();

    let comments = create_topic(
        pool,
        &NewTopic {
            category_id: comments_cid,
            user_id: author,
            title: "Test Question in Comments & Feedback".to_string(),
            content: "This is a test question that needs resolution".to_string(),
            timestamp: NOW,
        },
    )
    .await
    .unwrap();
    let other = create_topic(
        pool,
        &NewTopic {
            category_id: other_cid,
            user_id: author,
            title: "Test Topic in Other Category".to_string(),
            content: "This is a post in another category".to_string(),
            timestamp: NOW,
        },
    )
    .await
    .unwrap();

    let workflow = Workflow::new(&db, config, Arc::new(FixedClock::new(NOW)), observers)
        .await
        .unwrap();

    Forum {
        workflow,
        db,
        admin,
        global_mod,
        category_mod,
        regular,
        author,
        comments_cid,
        other_cid,
        comments_pid: comments.main_post_id,
        other_pid: other.main_post_id,
        _temp_dir: temp_dir,
    }
}

async fn default_forum() -> Forum {
    setup_forum(&Config::default(), ObserverRegistry::new()).await
}

#[tokio::test]
async fn test_can_resolve_privileged_roles_and_author() {
    let f = default_forum().await;
    let gate = &f.workflow.resolution;

    assert!(gate.can_resolve(f.comments_pid, f.admin).await);
    assert!(gate.can_resolve(f.comments_pid, f.global_mod).await);
    assert!(gate.can_resolve(f.comments_pid, f.category_mod).await);
    assert!(gate.can_resolve(f.comments_pid, f.author).await);
}

#[tokio::test]
async fn test_can_resolve_denies_others() {
    let f = default_forum().await;
    let gate = &f.workflow.resolution;

    assert!(!gate.can_resolve(f.comments_pid, f.regular).await);
    assert!(!gate.can_resolve(f.comments_pid, 0).await);
    assert!(!gate.can_resolve(9_999_999, f.admin).await);
}

#[tokio::test]
async fn test_category_moderator_is_scoped_to_their_category() {
    let f = default_forum().await;
    let pool = f.db.pool();

    let other_mod = create_user(pool, "resolvedothermod").await.unwrap();
    add_category_moderator(pool, f.other_cid, other_mod)
        .await
        .unwrap();

    assert!(!f.workflow.resolution.can_resolve(f.comments_pid, other_mod).await);
    assert!(f.workflow.resolution.can_resolve(f.other_pid, other_mod).await);
    assert!(!f.workflow.resolution.can_resolve(f.other_pid, f.category_mod).await);
}

#[tokio::test]
async fn test_any_scope_allows_resolution_outside_designated_category() {
    let f = default_forum().await;
    assert!(f.workflow.resolution.can_resolve(f.other_pid, f.admin).await);
    assert!(f.workflow.resolution.can_resolve(f.other_pid, f.author).await);
}

#[tokio::test]
async fn test_eligible_only_scope_restricts_to_designated_category() {
    let config = Config {
        resolve_scope: ResolveScope::EligibleOnly,
        ..Config::default()
    };
    let f = setup_forum(&config, ObserverRegistry::new()).await;
    let gate = &f.workflow.resolution;

    assert!(gate.can_resolve(f.comments_pid, f.admin).await);
    assert!(gate.can_resolve(f.comments_pid, f.author).await);
    assert!(!gate.can_resolve(f.other_pid, f.admin).await);
    assert!(!gate.can_resolve(f.other_pid, f.author).await);
    assert!(!gate.can_resolve(f.other_pid, f.global_mod).await);
    assert!(matches!(
        gate.set_resolved(f.other_pid, true, f.admin).await,
        Err(WorkflowError::NoPrivileges)
    ));
}

#[tokio::test]
async fn test_unauthorized_set_resolved_does_not_mutate() {
    let f = default_forum().await;

    let err = f
        .workflow
        .resolution
        .set_resolved(f.comments_pid, true, f.regular)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NoPrivileges));
    assert_eq!(err.to_string(), "[[error:no-privileges]]");

    let post = get_post(f.db.pool(), f.comments_pid).await.unwrap().unwrap();
    assert_eq!(post.resolved_state(), ResolvedState::Unset);
    assert!(get_events_for_post(f.db.pool(), f.comments_pid)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_set_resolved_missing_post() {
    let f = default_forum().await;
    let err = f
        .workflow
        .resolution
        .set_resolved(9_999_999, true, f.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound("no-post")));
}

#[tokio::test]
async fn test_resolved_status_round_trip() {
    let f = default_forum().await;
    let gate = &f.workflow.resolution;

    assert!(!gate.get_resolved_status(f.comments_pid).await.unwrap());

    let result = gate.set_resolved(f.comments_pid, true, f.admin).await.unwrap();
    assert!(result.resolved);
    assert!(gate.get_resolved_status(f.comments_pid).await.unwrap());

    let result = gate
        .set_resolved(f.comments_pid, false, f.author)
        .await
        .unwrap();
    assert!(!result.resolved);
    assert!(!gate.get_resolved_status(f.comments_pid).await.unwrap());

    gate.set_resolved(f.comments_pid, true, f.category_mod)
        .await
        .unwrap();
    assert!(gate.get_resolved_status(f.comments_pid).await.unwrap());

    let post = get_post(f.db.pool(), f.comments_pid).await.unwrap().unwrap();
    assert_eq!(post.resolved, Some(1));
    // Toggling never touches the post's timestamp.
    assert_eq!(post.timestamp, NOW);
}

#[tokio::test]
async fn test_resolved_status_of_missing_post_is_false() {
    let f = default_forum().await;
    assert!(!f
        .workflow
        .resolution
        .get_resolved_status(9_999_999)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_events_logged_for_each_change() {
    let f = default_forum().await;
    let gate = &f.workflow.resolution;

    gate.set_resolved(f.comments_pid, true, f.admin).await.unwrap();
    gate.set_resolved(f.comments_pid, false, f.author).await.unwrap();

    let events = get_events_for_post(f.db.pool(), f.comments_pid).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "post-resolved");
    assert_eq!(events[0].user_id, f.admin);
    assert_eq!(events[1].event_type, "post-unresolved");
    assert_eq!(events[1].user_id, f.author);

    let post = get_post(f.db.pool(), f.comments_pid).await.unwrap().unwrap();
    assert!(events.iter().all(|e| e.topic_id == Some(post.topic_id)));
}

struct Recorder(mpsc::UnboundedSender<ResolutionChange>);

#[async_trait]
impl ResolutionObserver for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn on_resolution_change(&self, change: &ResolutionChange) -> anyhow::Result<()> {
        self.0.send(change.clone())?;
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl ResolutionObserver for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    async fn on_resolution_change(&self, _change: &ResolutionChange) -> anyhow::Result<()> {
        anyhow::bail!("observer unavailable")
    }
}

struct Stalled;

#[async_trait]
impl ResolutionObserver for Stalled {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn on_resolution_change(&self, _change: &ResolutionChange) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_observers_receive_previous_snapshot() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observers = ObserverRegistry::new()
        .with(Arc::new(Broken))
        .with(Arc::new(Recorder(tx)));
    let f = setup_forum(&Config::default(), observers).await;

    let result = f
        .workflow
        .resolution
        .set_resolved(f.comments_pid, true, f.admin)
        .await
        .unwrap();
    assert!(result.resolved);
    assert!(f
        .workflow
        .resolution
        .get_resolved_status(f.comments_pid)
        .await
        .unwrap());

    let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("observer was not notified")
        .expect("observer channel closed");
    assert_eq!(change.uid, f.admin);
    assert!(change.resolved);
    assert_eq!(change.post.id, f.comments_pid);
    assert_eq!(change.post.resolved_state(), ResolvedState::Unset);
}

#[tokio::test]
async fn test_stalled_observer_does_not_block_set_resolved() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observers = ObserverRegistry::new()
        .with_timeout(Duration::from_millis(100))
        .with(Arc::new(Stalled))
        .with(Arc::new(Recorder(tx)));
    let f = setup_forum(&Config::default(), observers).await;

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        f.workflow
            .resolution
            .set_resolved(f.comments_pid, true, f.admin),
    )
    .await
    .expect("set_resolved waited on a stalled observer")
    .unwrap();
    assert!(result.resolved);

    // Observers after the stalled one still run once it times out.
    let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("later observer was not notified")
        .expect("observer channel closed");
    assert_eq!(change.post.id, f.comments_pid);
}

#[tokio::test]
async fn test_cross_user_authorization() {
    let f = default_forum().await;
    let pool = f.db.pool();

    let user1 = create_user(pool, "resolveduser1").await.unwrap();
    let user2 = create_user(pool, "resolveduser2").await.unwrap();
    let mut pids = Vec::new();
    for (uid, title) in [(user1, "User1 Question"), (user2, "User2 Question")] {
        let created = create_topic(
            pool,
            &NewTopic {
                category_id: f.comments_cid,
                user_id: uid,
                title: title.to_string(),
                content: "Question".to_string(),
                timestamp: NOW,
            },
        )
        .await
        .unwrap();
        pids.push(created.main_post_id);
    }

    let gate = &f.workflow.resolution;
    assert!(gate.can_resolve(pids[0], user1).await);
    assert!(!gate.can_resolve(pids[1], user1).await);
    assert!(gate.can_resolve(pids[0], f.admin).await);
    assert!(gate.can_resolve(pids[1], f.admin).await);
    assert!(matches!(
        gate.set_resolved(pids[1], true, user1).await,
        Err(WorkflowError::NoPrivileges)
    ));
}

#[tokio::test]
async fn test_api_set_resolved_validation_order() {
    let f = default_forum().await;
    let wf = &f.workflow;

    let full = SetResolvedPayload {
        pid: Some(f.comments_pid),
        resolved: Some(true),
    };

    let err = api::set_resolved(wf, Caller::guest(), &full).await.unwrap_err();
    assert_eq!(err.to_string(), "[[error:not-logged-in]]");

    // Guests are rejected before the payload is inspected.
    let err = api::set_resolved(wf, Caller::guest(), &SetResolvedPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotLoggedIn));

    let missing_resolved = SetResolvedPayload {
        pid: Some(f.comments_pid),
        resolved: None,
    };
    let err = api::set_resolved(wf, Caller { uid: f.admin }, &missing_resolved)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "[[error:invalid-data]]");

    let missing_pid = SetResolvedPayload {
        pid: None,
        resolved: Some(true),
    };
    let err = api::set_resolved(wf, Caller { uid: f.admin }, &missing_pid)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidData));

    // Invalid data wins over missing privileges.
    let err = api::set_resolved(wf, Caller { uid: f.regular }, &missing_pid)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidData));

    let err = api::set_resolved(wf, Caller { uid: f.regular }, &full)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "[[error:no-privileges]]");

    let ok = api::set_resolved(wf, Caller { uid: f.admin }, &full).await.unwrap();
    assert!(ok.resolved);

    let unresolve = SetResolvedPayload {
        pid: Some(f.comments_pid),
        resolved: Some(false),
    };
    let ok = api::set_resolved(wf, Caller { uid: f.author }, &unresolve)
        .await
        .unwrap();
    assert!(!ok.resolved);
}

#[tokio::test]
async fn test_api_get_resolved_reports_permission() {
    let f = default_forum().await;
    let wf = &f.workflow;

    let status = api::get_resolved(wf, Caller { uid: f.author }, f.comments_pid)
        .await
        .unwrap();
    assert!(!status.resolved);
    assert!(status.can_resolve);

    wf.resolution
        .set_resolved(f.comments_pid, true, f.admin)
        .await
        .unwrap();

    let status = api::get_resolved(wf, Caller { uid: f.regular }, f.comments_pid)
        .await
        .unwrap();
    assert!(status.resolved);
    assert!(!status.can_resolve);
}

#[tokio::test]
async fn test_api_recent_events_admin_only() {
    let f = default_forum().await;
    let wf = &f.workflow;

    wf.resolution
        .set_resolved(f.comments_pid, true, f.admin)
        .await
        .unwrap();

    assert!(matches!(
        api::recent_events(wf, Caller::guest(), None).await,
        Err(WorkflowError::NotLoggedIn)
    ));
    assert!(matches!(
        api::recent_events(wf, Caller { uid: f.global_mod }, None).await,
        Err(WorkflowError::NoPrivileges)
    ));

    let events = api::recent_events(wf, Caller { uid: f.admin }, Some(10))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "post-resolved");
    assert_eq!(events[0].pid, Some(f.comments_pid));

    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["type"], "post-resolved");
    assert_eq!(json["uid"], f.admin);
}

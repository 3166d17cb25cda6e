use chrono::{DateTime, Duration, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, EngineError, MilestonePatch, NewMilestone, NewTask, OrderStatus, ProgressStatus};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn due(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

fn task(name: &str) -> NewTask {
    NewTask {
        name: name.to_string(),
        due_date: due(7),
    }
}

async fn order_in_process(engine: &Engine, owner: &str) -> Uuid {
    let shop_id = engine.create_shop(owner, "Atelier Blanc").await.unwrap();
    let order_id = engine.create_order(shop_id, 500_000).await.unwrap();
    engine.accept_order(owner, order_id).await.unwrap();
    order_id
}

#[tokio::test]
async fn first_milestone_starts_in_progress_with_its_first_task() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements"), task("First fitting")],
            },
        )
        .await
        .unwrap();
    engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Delivery".to_string(),
                due_date: due(20),
                tasks: vec![task("Final press")],
            },
        )
        .await
        .unwrap();

    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones.len(), 2);
    assert_eq!(milestones[0].idx, 1);
    assert_eq!(milestones[0].status, ProgressStatus::InProgress);
    assert_eq!(milestones[1].idx, 2);
    assert_eq!(milestones[1].status, ProgressStatus::Pending);

    let tasks = engine
        .tasks_for_milestone("alice", milestones[0].id)
        .await
        .unwrap();
    assert_eq!(tasks[0].status, ProgressStatus::InProgress);
    assert_eq!(tasks[1].status, ProgressStatus::Pending);

    let tasks = engine
        .tasks_for_milestone("alice", milestones[1].id)
        .await
        .unwrap();
    assert_eq!(tasks[0].status, ProgressStatus::Pending);
}

#[tokio::test]
async fn cascade_walks_tasks_milestones_and_completes_the_order() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements"), task("First fitting")],
            },
        )
        .await
        .unwrap();
    let m2 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Delivery".to_string(),
                due_date: due(20),
                tasks: vec![task("Final press")],
            },
        )
        .await
        .unwrap();

    let m1_tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();

    // Completing the first task only advances within the milestone.
    engine
        .complete_task("alice", m1, m1_tasks[0].id)
        .await
        .unwrap();
    let m1_tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();
    assert_eq!(m1_tasks[0].status, ProgressStatus::Completed);
    assert_eq!(m1_tasks[1].status, ProgressStatus::InProgress);
    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones[0].status, ProgressStatus::InProgress);
    assert_eq!(milestones[1].status, ProgressStatus::Pending);

    // Completing the last task hands off to the next milestone.
    engine
        .complete_task("alice", m1, m1_tasks[1].id)
        .await
        .unwrap();
    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones[0].status, ProgressStatus::Completed);
    assert_eq!(milestones[1].status, ProgressStatus::InProgress);
    let m2_tasks = engine.tasks_for_milestone("alice", m2).await.unwrap();
    assert_eq!(m2_tasks[0].status, ProgressStatus::InProgress);

    // Completing the last task of the last milestone completes the order.
    engine
        .complete_task("alice", m2, m2_tasks[0].id)
        .await
        .unwrap();
    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones[1].status, ProgressStatus::Completed);
    let order = engine.order("alice", order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn complete_task_requires_an_in_progress_task() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements"), task("First fitting")],
            },
        )
        .await
        .unwrap();
    let tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();

    // The second task is still pending.
    let err = engine
        .complete_task("alice", m1, tasks[1].id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("task not in progress".to_string())
    );

    // A completed task cannot be completed twice.
    engine.complete_task("alice", m1, tasks[0].id).await.unwrap();
    let err = engine
        .complete_task("alice", m1, tasks[0].id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("task not in progress".to_string())
    );

    // Unknown ids surface as "task not found".
    let err = engine
        .complete_task("alice", m1, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidState("task not found".to_string()));
    let err = engine
        .complete_task("alice", Uuid::new_v4(), tasks[0].id)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidState("task not found".to_string()));
}

#[tokio::test]
async fn complete_task_requires_the_order_in_process() {
    let (engine, _db) = engine_with_db().await;
    let shop_id = engine.create_shop("alice", "Atelier Blanc").await.unwrap();
    let order_id = engine.create_order(shop_id, 500_000).await.unwrap();

    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements")],
            },
        )
        .await
        .unwrap();
    let tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();

    let err = engine
        .complete_task("alice", m1, tasks[0].id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("order not in process".to_string())
    );
}

#[tokio::test]
async fn task_added_to_a_drained_active_milestone_starts_in_progress() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    // First milestone opens with no tasks at all.
    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![],
            },
        )
        .await
        .unwrap();

    engine
        .create_task("alice", m1, task("Take measurements"))
        .await
        .unwrap();
    engine
        .create_task("alice", m1, task("First fitting"))
        .await
        .unwrap();

    let tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();
    assert_eq!(tasks[0].idx, 1);
    assert_eq!(tasks[0].status, ProgressStatus::InProgress);
    assert_eq!(tasks[1].idx, 2);
    assert_eq!(tasks[1].status, ProgressStatus::Pending);
}

#[tokio::test]
async fn update_milestone_only_touches_closed_milestones() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fiting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements")],
            },
        )
        .await
        .unwrap();

    let err = engine
        .update_milestone(
            "alice",
            m1,
            MilestonePatch {
                name: Some("Fitting".to_string()),
                due_date: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("milestone not closed".to_string())
    );

    let tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();
    engine.complete_task("alice", m1, tasks[0].id).await.unwrap();

    engine
        .update_milestone(
            "alice",
            m1,
            MilestonePatch {
                name: Some("Fitting".to_string()),
                due_date: None,
            },
        )
        .await
        .unwrap();
    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones[0].name, "Fitting");
    assert_eq!(milestones[0].status, ProgressStatus::Completed);
}

#[tokio::test]
async fn cancel_order_closes_everything_still_open() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;

    let m1 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![task("Take measurements"), task("First fitting")],
            },
        )
        .await
        .unwrap();
    let m2 = engine
        .create_milestone(
            "alice",
            NewMilestone {
                order_id,
                name: "Delivery".to_string(),
                due_date: due(20),
                tasks: vec![task("Final press")],
            },
        )
        .await
        .unwrap();

    let tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();
    engine.complete_task("alice", m1, tasks[0].id).await.unwrap();

    engine.cancel_order("alice", order_id).await.unwrap();

    let order = engine.order("alice", order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let milestones = engine.milestones_for_order("alice", order_id).await.unwrap();
    assert_eq!(milestones[0].status, ProgressStatus::Cancelled);
    assert_eq!(milestones[1].status, ProgressStatus::Cancelled);

    // Completed work keeps its status; everything open is cancelled.
    let m1_tasks = engine.tasks_for_milestone("alice", m1).await.unwrap();
    assert_eq!(m1_tasks[0].status, ProgressStatus::Completed);
    assert_eq!(m1_tasks[1].status, ProgressStatus::Cancelled);
    let m2_tasks = engine.tasks_for_milestone("alice", m2).await.unwrap();
    assert_eq!(m2_tasks[0].status, ProgressStatus::Cancelled);

    let err = engine.cancel_order("alice", order_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("order cannot move from cancelled to cancelled".to_string())
    );
}

#[tokio::test]
async fn milestones_are_scoped_to_the_owning_shop() {
    let (engine, _db) = engine_with_db().await;
    let order_id = order_in_process(&engine, "alice").await;
    engine.create_shop("mallory", "Rival Atelier").await.unwrap();

    let err = engine
        .create_milestone(
            "mallory",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound("order not owned by this shop".to_string())
    );

    let err = engine
        .create_milestone(
            "nobody",
            NewMilestone {
                order_id,
                name: "Fitting".to_string(),
                due_date: due(10),
                tasks: vec![],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("shop not exists".to_string()));
}

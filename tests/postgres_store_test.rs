//! PostgreSQL store tests
//!
//! Need Docker (or `TEST_DATABASE_URL`); run with `cargo test -- --ignored`.

mod helpers;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use helpers::*;
use serial_test::serial;
use PoolMate::database::{DatabaseService, EventStore};
use PoolMate::models::{CreateEventRequest, CreateTrainerRequest, CreateUserRequest, NewAssignment, NewPoolAttendee};
use PoolMate::utils::errors::StoreError;

async fn seeded_event(service: &DatabaseService) -> (i64, Vec<i64>) {
    let event = service
        .create_event(CreateEventRequest {
            title: "Sunrise Yoga".to_string(),
            event_date: Utc::now() + Duration::days(1),
            event_time: "06:00 AM - 07:00 AM".to_string(),
            registration_deadline: Some(Utc::now() - Duration::days(1)),
            max_capacity: Some(50),
            pool_capacity: Some(100),
        })
        .await
        .unwrap();

    let mut user_ids = Vec::new();
    for name in ["Asha", "Bilal"] {
        let user = service
            .users
            .create(CreateUserRequest {
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                phone_number: Some("9876500001".to_string()),
            })
            .await
            .unwrap();
        service.register_for_event(event.id, user.id, None).await.unwrap();
        user_ids.push(user.id);
    }
    (event.id, user_ids)
}

fn assignment(event_id: i64, user_ids: &[i64]) -> NewAssignment {
    NewAssignment {
        event_id,
        pool_name: "Main Pool".to_string(),
        capacity: 100,
        trainer_id: None,
        meet_link: Some("https://zoom.us/j/85746065432".to_string()),
        attendees: user_ids
            .iter()
            .map(|id| NewPoolAttendee {
                user_id: *id,
                meet_link: Some(format!("https://zoom.us/w/85746065432?tk={}", id)),
            })
            .collect(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_commit_assignment_writes_everything_once() {
    let db = TestDatabase::new().await.unwrap();
    let service = DatabaseService::new(db.pool.clone(), &db.config());
    let (event_id, user_ids) = seeded_event(&service).await;

    let committed = service.commit_assignment(&assignment(event_id, &user_ids)).await.unwrap();
    assert_eq!(committed.attendees.len(), 2);

    let details = service.load_event(event_id).await.unwrap().unwrap();
    assert!(details.event.pools_assigned);
    assert_eq!(details.pools.len(), 1);
    assert_eq!(details.pools[0].attendees.len(), 2);
    assert_eq!(details.registrants.len(), 2);

    let again = service.commit_assignment(&assignment(event_id, &user_ids)).await;
    assert_matches!(again, Err(StoreError::AlreadyAssigned { .. }));
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_concurrent_commits_assign_once() {
    let db = TestDatabase::new().await.unwrap();
    let service = Arc::new(DatabaseService::new(db.pool.clone(), &db.config()));
    let (event_id, user_ids) = seeded_event(&service).await;

    let first = {
        let service = service.clone();
        let assignment = assignment(event_id, &user_ids);
        tokio::spawn(async move { service.commit_assignment(&assignment).await })
    };
    let second = {
        let service = service.clone();
        let assignment = assignment(event_id, &user_ids);
        tokio::spawn(async move { service.commit_assignment(&assignment).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let pools: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pools WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(pools.0, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_failed_commit_rolls_back() {
    let db = TestDatabase::new().await.unwrap();
    let service = DatabaseService::new(db.pool.clone(), &db.config());
    let (event_id, _) = seeded_event(&service).await;

    // unknown user violates the attendee foreign key after the pool insert
    let result = service.commit_assignment(&assignment(event_id, &[i64::MAX])).await;
    assert!(result.is_err());

    let details = service.load_event(event_id).await.unwrap().unwrap();
    assert!(!details.event.pools_assigned);
    assert!(details.pools.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_reminder_selection_and_trainer_links() {
    let db = TestDatabase::new().await.unwrap();
    let service = DatabaseService::new(db.pool.clone(), &db.config());
    let (event_id, user_ids) = seeded_event(&service).await;

    let trainer = service
        .trainers
        .create(CreateTrainerRequest {
            name: "Coach".to_string(),
            email: Some("coach@example.com".to_string()),
            phone_number: None,
        })
        .await
        .unwrap();
    let attached = service.attach_trainers(event_id, &[trainer.id]).await.unwrap();
    assert_eq!(attached.len(), 1);
    assert!(service.attach_trainers(event_id, &[trainer.id]).await.unwrap().is_empty());

    let from = Utc::now();
    let to = Utc::now() + Duration::days(2);
    assert!(service.events_pending_reminder(from, to).await.unwrap().is_empty());

    let committed = service.commit_assignment(&assignment(event_id, &user_ids)).await.unwrap();
    service.set_pool_trainer(committed.pool.id, trainer.id).await.unwrap();
    assert_eq!(service.events_pending_reminder(from, to).await.unwrap().len(), 1);

    service.mark_reminder_sent(event_id).await.unwrap();
    assert!(service.events_pending_reminder(from, to).await.unwrap().is_empty());

    let details = service.load_event(event_id).await.unwrap().unwrap();
    assert_eq!(details.pools[0].pool.trainer_id, Some(trainer.id));
    assert_eq!(details.trainers.len(), 1);
}

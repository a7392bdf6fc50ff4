//! Test application wiring
//!
//! Builds the engine and the reminder scheduler over the in-memory store
//! and the recording collaborators, plus seeding shortcuts.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use PoolMate::config::SchedulingConfig;
use PoolMate::database::InMemoryEventStore;
use PoolMate::models::{CreateEventRequest, CreateTrainerRequest, CreateUserRequest, Event, Trainer, User};
use PoolMate::scheduling::{NotificationCascade, PoolAssignmentEngine, ReminderScheduler};

use super::mocks::{FakeShortener, RecordingMeetingProvider, RecordingSender};

pub const OPERATOR_PHONE: &str = "919000000001";

/// 2026-03-10 04:00 UTC, 09:30 in the +05:30 business time zone
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap()
}

pub struct TestApp {
    pub store: Arc<InMemoryEventStore>,
    pub meetings: Arc<RecordingMeetingProvider>,
    pub sender: Arc<RecordingSender>,
    pub engine: PoolAssignmentEngine,
    pub scheduler: ReminderScheduler,
    pub config: SchedulingConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_shortener(FakeShortener::default())
    }

    pub fn with_shortener(shortener: FakeShortener) -> Self {
        Self::build(shortener, |_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut SchedulingConfig)) -> Self {
        Self::build(FakeShortener::default(), adjust)
    }

    fn build(shortener: FakeShortener, adjust: impl FnOnce(&mut SchedulingConfig)) -> Self {
        let mut config = SchedulingConfig {
            operator_phone: Some(OPERATOR_PHONE.to_string()),
            ..SchedulingConfig::default()
        };
        adjust(&mut config);

        let store = Arc::new(InMemoryEventStore::new());
        let meetings = Arc::new(RecordingMeetingProvider::new());
        let sender = Arc::new(RecordingSender::new());
        let cascade = NotificationCascade::new(sender.clone(), Arc::new(shortener), &config);
        let engine = PoolAssignmentEngine::new(store.clone(), meetings.clone(), cascade.clone(), config.clone());
        let scheduler = ReminderScheduler::new(store.clone(), cascade, &config);

        Self {
            store,
            meetings,
            sender,
            engine,
            scheduler,
            config,
        }
    }

    /// Event dated `event_date` whose registration closed yesterday
    pub async fn closed_event(&self, title: &str, event_time: &str, event_date: DateTime<Utc>) -> Event {
        self.event(title, event_time, event_date, Some(fixed_now() - Duration::days(1))).await
    }

    pub async fn event(
        &self,
        title: &str,
        event_time: &str,
        event_date: DateTime<Utc>,
        registration_deadline: Option<DateTime<Utc>>,
    ) -> Event {
        self.store
            .add_event(CreateEventRequest {
                title: title.to_string(),
                event_date,
                event_time: event_time.to_string(),
                registration_deadline,
                max_capacity: Some(200),
                pool_capacity: Some(100),
            })
            .await
    }

    /// Create a user and register them for `event_id`
    pub async fn registrant(&self, event_id: i64, name: &str, email: Option<&str>, phone: Option<&str>) -> User {
        let user = self
            .store
            .add_user(CreateUserRequest {
                name: name.to_string(),
                email: email.map(str::to_string),
                phone_number: phone.map(str::to_string),
            })
            .await;
        self.store.register(event_id, user.id).await.unwrap();
        user
    }

    pub async fn trainer(&self, name: &str, email: Option<&str>, phone: Option<&str>) -> Trainer {
        self.store
            .add_trainer(CreateTrainerRequest {
                name: name.to_string(),
                email: email.map(str::to_string),
                phone_number: phone.map(str::to_string),
            })
            .await
    }

    /// Create a trainer and link them to `event_id`
    pub async fn linked_trainer(&self, event_id: i64, name: &str, email: Option<&str>, phone: Option<&str>) -> Trainer {
        use PoolMate::database::EventStore;

        let trainer = self.trainer(name, email, phone).await;
        self.store.attach_trainers(event_id, &[trainer.id]).await.unwrap();
        trainer
    }
}

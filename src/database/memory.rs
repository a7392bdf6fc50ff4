//! In-memory event store
//!
//! Mirrors the PostgreSQL store semantics without a database: assignment
//! commits are staged on a copy of the state and swapped in only when every
//! step succeeds. A one-shot failure can be injected at any commit step, and
//! committed writes are counted, which makes it the store used by tests and
//! dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::database::store::{CommitStep, EventStore};
use crate::models::*;
use crate::utils::errors::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    trainers: BTreeMap<i64, Trainer>,
    events: BTreeMap<i64, Event>,
    registrations: Vec<Registration>,
    event_trainers: Vec<EventTrainer>,
    pools: Vec<Pool>,
    attendees: Vec<PoolAttendee>,
    writes: usize,
    fail_at: Option<CommitStep>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_fault(&self, step: CommitStep) -> StoreResult<()> {
        if self.fail_at == Some(step) {
            return Err(StoreError::Injected(step.to_string()));
        }
        Ok(())
    }

    fn event_pools(&self, event_id: i64) -> impl Iterator<Item = &Pool> {
        self.pools.iter().filter(move |p| p.event_id == event_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Mutex<MemoryState>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, request: CreateUserRequest) -> User {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            name: request.name,
            email: request.email,
            phone_number: request.phone_number,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn add_trainer(&self, request: CreateTrainerRequest) -> Trainer {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let trainer = Trainer {
            id: state.next_id(),
            name: request.name,
            email: request.email,
            phone_number: request.phone_number,
            created_at: now,
            updated_at: now,
        };
        state.trainers.insert(trainer.id, trainer.clone());
        trainer
    }

    pub async fn add_event(&self, request: CreateEventRequest) -> Event {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let event = Event {
            id: state.next_id(),
            title: request.title,
            event_date: request.event_date,
            event_time: request.event_time,
            registration_deadline: request.registration_deadline,
            max_capacity: request.max_capacity,
            pool_capacity: request.pool_capacity,
            pools_assigned: false,
            reminder2_sent: false,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        event
    }

    /// Register a user, enforcing one registration per (user, event)
    pub async fn register(&self, event_id: i64, user_id: i64) -> StoreResult<Registration> {
        let mut state = self.state.lock().await;
        if !state.events.contains_key(&event_id) {
            return Err(StoreError::EventNotFound { event_id });
        }
        if state.registrations.iter().any(|r| r.event_id == event_id && r.user_id == user_id) {
            return Err(StoreError::Conflict(format!("user {} already registered for event {}", user_id, event_id)));
        }
        let registration = Registration {
            id: state.next_id(),
            user_id,
            event_id,
            payment_reference: None,
            created_at: Utc::now(),
        };
        state.registrations.push(registration.clone());
        Ok(registration)
    }

    /// Make the next assignment commit fail at `step`
    pub async fn fail_next_commit_at(&self, step: CommitStep) {
        self.state.lock().await.fail_at = Some(step);
    }

    /// Number of committed writes since creation
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn event(&self, event_id: i64) -> Option<Event> {
        self.state.lock().await.events.get(&event_id).cloned()
    }

    pub async fn pools_for(&self, event_id: i64) -> Vec<Pool> {
        self.state.lock().await.event_pools(event_id).cloned().collect()
    }

    pub async fn attendees_for(&self, event_id: i64) -> Vec<PoolAttendee> {
        let state = self.state.lock().await;
        let pool_ids: Vec<i64> = state.event_pools(event_id).map(|p| p.id).collect();
        state
            .attendees
            .iter()
            .filter(|a| pool_ids.contains(&a.pool_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_event(&self, event_id: i64) -> StoreResult<Option<EventDetails>> {
        let state = self.state.lock().await;
        let Some(event) = state.events.get(&event_id).cloned() else {
            return Ok(None);
        };

        let registrants = state
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .filter_map(|r| state.users.get(&r.user_id).cloned())
            .collect();
        let trainers = state
            .event_trainers
            .iter()
            .filter(|et| et.event_id == event_id)
            .filter_map(|et| state.trainers.get(&et.trainer_id).cloned())
            .collect();
        let pools = state
            .event_pools(event_id)
            .map(|pool| PoolWithAttendees {
                pool: pool.clone(),
                attendees: state.attendees.iter().filter(|a| a.pool_id == pool.id).cloned().collect(),
            })
            .collect();

        Ok(Some(EventDetails {
            event,
            registrants,
            trainers,
            pools,
        }))
    }

    async fn events_pending_assignment(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.event_date >= from && e.event_date <= to && !e.pools_assigned)
            .cloned()
            .collect())
    }

    async fn events_pending_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.event_date >= from && e.event_date <= to && e.pools_assigned && !e.reminder2_sent)
            .cloned()
            .collect())
    }

    async fn commit_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment> {
        let mut state = self.state.lock().await;
        let event_id = assignment.event_id;
        let fail_at = state.fail_at.take();

        let event = state.events.get(&event_id).ok_or(StoreError::EventNotFound { event_id })?;
        if event.pools_assigned || state.event_pools(event_id).next().is_some() {
            return Err(StoreError::AlreadyAssigned { event_id });
        }

        let mut staged = state.clone();
        staged.fail_at = fail_at;
        let now = Utc::now();

        staged.check_fault(CommitStep::PoolInsert)?;
        let pool = Pool {
            id: staged.next_id(),
            name: assignment.pool_name.clone(),
            capacity: assignment.capacity,
            is_active: true,
            meet_link: assignment.meet_link.clone(),
            event_id,
            trainer_id: assignment.trainer_id,
            created_at: now,
            updated_at: now,
        };
        staged.pools.push(pool.clone());

        staged.check_fault(CommitStep::AttendeeInsert)?;
        let mut attendees = Vec::with_capacity(assignment.attendees.len());
        for attendee in &assignment.attendees {
            let row = PoolAttendee {
                id: staged.next_id(),
                pool_id: pool.id,
                user_id: attendee.user_id,
                notified: false,
                meet_link: attendee.meet_link.clone(),
                created_at: now,
            };
            staged.attendees.push(row.clone());
            attendees.push(row);
        }

        staged.check_fault(CommitStep::EventUpdate)?;
        let event = staged
            .events
            .get_mut(&event_id)
            .filter(|e| !e.pools_assigned)
            .ok_or(StoreError::AlreadyAssigned { event_id })?;
        event.pools_assigned = true;
        event.updated_at = now;

        staged.fail_at = None;
        staged.writes += 1;
        *state = staged;

        Ok(PoolAssignment { pool, attendees })
    }

    async fn mark_reminder_sent(&self, event_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let event = state.events.get_mut(&event_id).ok_or(StoreError::EventNotFound { event_id })?;
        event.reminder2_sent = true;
        event.updated_at = Utc::now();
        state.writes += 1;
        Ok(())
    }

    async fn attach_trainers(&self, event_id: i64, trainer_ids: &[i64]) -> StoreResult<Vec<Trainer>> {
        let mut state = self.state.lock().await;
        if !state.events.contains_key(&event_id) {
            return Err(StoreError::EventNotFound { event_id });
        }

        let mut attached = Vec::new();
        for trainer_id in trainer_ids {
            let Some(trainer) = state.trainers.get(trainer_id).cloned() else {
                continue;
            };
            let linked = state
                .event_trainers
                .iter()
                .any(|et| et.event_id == event_id && et.trainer_id == *trainer_id);
            if linked {
                continue;
            }
            let link = EventTrainer {
                id: state.next_id(),
                event_id,
                trainer_id: *trainer_id,
                created_at: Utc::now(),
            };
            state.event_trainers.push(link);
            attached.push(trainer);
        }

        if !attached.is_empty() {
            state.writes += 1;
        }
        Ok(attached)
    }

    async fn set_pool_trainer(&self, pool_id: i64, trainer_id: i64) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let mut changed = false;
        if let Some(pool) = state.pools.iter_mut().find(|p| p.id == pool_id && p.trainer_id.is_none()) {
            pool.trainer_id = Some(trainer_id);
            pool.updated_at = Utc::now();
            changed = true;
        }
        if changed {
            state.writes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn seeded() -> (InMemoryEventStore, Event, User) {
        let store = InMemoryEventStore::new();
        let event = store
            .add_event(CreateEventRequest {
                title: "Core Strength".to_string(),
                event_date: Utc::now(),
                event_time: "07:00 AM - 08:00 AM".to_string(),
                registration_deadline: None,
                max_capacity: None,
                pool_capacity: None,
            })
            .await;
        let user = store
            .add_user(CreateUserRequest { name: "Ravi".to_string(), email: None, phone_number: None })
            .await;
        store.register(event.id, user.id).await.unwrap();
        (store, event, user)
    }

    fn assignment(event_id: i64, user_id: i64) -> NewAssignment {
        NewAssignment {
            event_id,
            pool_name: "Main Pool".to_string(),
            capacity: 100,
            trainer_id: None,
            meet_link: Some("https://zoom.us/j/1".to_string()),
            attendees: vec![NewPoolAttendee { user_id, meet_link: None }],
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let (store, event, user) = seeded().await;
        assert_matches!(store.register(event.id, user.id).await, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_commit_is_compare_and_swap() {
        let (store, event, user) = seeded().await;
        store.commit_assignment(&assignment(event.id, user.id)).await.unwrap();
        assert_matches!(
            store.commit_assignment(&assignment(event.id, user.id)).await,
            Err(StoreError::AlreadyAssigned { .. })
        );
        assert_eq!(store.pools_for(event.id).await.len(), 1);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_fault_leaves_no_rows() {
        let (store, event, user) = seeded().await;
        store.fail_next_commit_at(CommitStep::AttendeeInsert).await;
        assert_matches!(store.commit_assignment(&assignment(event.id, user.id)).await, Err(StoreError::Injected(_)));
        assert!(store.pools_for(event.id).await.is_empty());

        // the fault is one-shot
        store.commit_assignment(&assignment(event.id, user.id)).await.unwrap();
        assert_eq!(store.attendees_for(event.id).await.len(), 1);
    }
}

//! Database service layer
//!
//! This module provides a high-level interface to database operations
//! and the PostgreSQL implementation of [`EventStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::settings;
use crate::database::{DatabasePool, EventRepository, PoolRepository, TrainerRepository, TransactionLimits, UserRepository};
use crate::database::store::EventStore;
use crate::models::*;
use crate::utils::errors::{StoreError, StoreResult};

#[derive(Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub trainers: TrainerRepository,
    pub events: EventRepository,
    pub pools: PoolRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool, config: &settings::DatabaseConfig) -> Self {
        let limits = TransactionLimits {
            timeout: Duration::from_secs(config.transaction_timeout_secs),
            lock_wait: Duration::from_secs(config.lock_wait_secs),
        };

        Self {
            users: UserRepository::new(pool.clone()),
            trainers: TrainerRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            pools: PoolRepository::new(pool, limits),
        }
    }

    /// Create a new event
    pub async fn create_event(&self, request: CreateEventRequest) -> StoreResult<Event> {
        self.events.create(request).await
    }

    /// Register user for event
    pub async fn register_for_event(&self, event_id: i64, user_id: i64, payment_reference: Option<String>) -> StoreResult<Registration> {
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(StoreError::EventNotFound { event_id });
        }

        let request = RegisterUserRequest {
            event_id,
            user_id,
            payment_reference,
        };

        self.events.register_user(request).await
    }
}

#[async_trait]
impl EventStore for DatabaseService {
    async fn load_event(&self, event_id: i64) -> StoreResult<Option<EventDetails>> {
        let Some(event) = self.events.find_by_id(event_id).await? else {
            return Ok(None);
        };

        let registrants = self.events.get_registrants(event_id).await?;
        let trainers = self.trainers.get_event_trainers(event_id).await?;
        let pools = self.pools.get_event_pools(event_id).await?;
        let pool_ids: Vec<i64> = pools.iter().map(|p| p.id).collect();
        let mut attendees = if pool_ids.is_empty() {
            Vec::new()
        } else {
            self.pools.get_attendees(&pool_ids).await?
        };

        let pools = pools
            .into_iter()
            .map(|pool| {
                let (own, rest): (Vec<PoolAttendee>, Vec<PoolAttendee>) =
                    attendees.drain(..).partition(|a| a.pool_id == pool.id);
                attendees = rest;
                PoolWithAttendees { pool, attendees: own }
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
        self.events.find_pending_assignment(from, to).await
    }

    async fn events_pending_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        self.events.find_pending_reminder(from, to).await
    }

    async fn commit_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment> {
        self.pools.commit_assignment(assignment).await
    }

    async fn mark_reminder_sent(&self, event_id: i64) -> StoreResult<()> {
        self.events.mark_reminder_sent(event_id).await
    }

    async fn attach_trainers(&self, event_id: i64, trainer_ids: &[i64]) -> StoreResult<Vec<Trainer>> {
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(StoreError::EventNotFound { event_id });
        }
        self.trainers.attach_to_event(event_id, trainer_ids).await
    }

    async fn set_pool_trainer(&self, pool_id: i64, trainer_id: i64) -> StoreResult<()> {
        self.pools.set_trainer_if_unset(pool_id, trainer_id).await
    }
}

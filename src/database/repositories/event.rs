//! Event repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::event::{Event, Registration, CreateEventRequest, RegisterUserRequest};
use crate::models::user::User;
use crate::utils::errors::{StoreError, StoreResult};

const EVENT_COLUMNS: &str = "id, title, event_date, event_time, registration_deadline, max_capacity, pool_capacity, pools_assigned, reminder2_sent, created_at, updated_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, event_date, event_time, registration_deadline, max_capacity, pool_capacity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.title)
        .bind(request.event_date)
        .bind(request.event_time)
        .bind(request.registration_deadline)
        .bind(request.max_capacity)
        .bind(request.pool_capacity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Unassigned events dated within the given range
    pub async fn find_pending_assignment(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_date BETWEEN $1 AND $2 AND pools_assigned = FALSE ORDER BY event_date ASC, id ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Assigned events dated within the given range still waiting for the same-day reminder
    pub async fn find_pending_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_date BETWEEN $1 AND $2 AND pools_assigned = TRUE AND reminder2_sent = FALSE ORDER BY event_date ASC, id ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Set the same-day reminder flag
    pub async fn mark_reminder_sent(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE events SET reminder2_sent = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EventNotFound { event_id: id });
        }

        Ok(())
    }

    /// Register a user for an event
    pub async fn register_user(&self, request: RegisterUserRequest) -> StoreResult<Registration> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (user_id, event_id, payment_reference, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, event_id, payment_reference, created_at
            "#
        )
        .bind(request.user_id)
        .bind(request.event_id)
        .bind(request.payment_reference)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Registered users in registration order
    pub async fn get_registrants(&self, event_id: i64) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.phone_number, u.created_at, u.updated_at
            FROM users u
            INNER JOIN registrations r ON r.user_id = u.id
            WHERE r.event_id = $1
            ORDER BY r.created_at ASC, r.id ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

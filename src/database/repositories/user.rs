//! User and trainer repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{User, Trainer, CreateUserRequest, CreateTrainerRequest};
use crate::utils::errors::StoreResult;

const TRAINER_COLUMNS: &str = "t.id, t.name, t.email, t.phone_number, t.created_at, t.updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, email, phone_number, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.email)
        .bind(request.phone_number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, phone_number, created_at, updated_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[derive(Clone)]
pub struct TrainerRepository {
    pool: PgPool,
}

impl TrainerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new trainer
    pub async fn create(&self, request: CreateTrainerRequest) -> StoreResult<Trainer> {
        let trainer = sqlx::query_as::<_, Trainer>(
            r#"
            INSERT INTO trainers (name, email, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, email, phone_number, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.email)
        .bind(request.phone_number)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(trainer)
    }

    /// Trainers linked to an event in the order they were attached
    pub async fn get_event_trainers(&self, event_id: i64) -> StoreResult<Vec<Trainer>> {
        let trainers = sqlx::query_as::<_, Trainer>(&format!(
            r#"
            SELECT {TRAINER_COLUMNS}
            FROM trainers t
            INNER JOIN event_trainers et ON et.trainer_id = t.id
            WHERE et.event_id = $1
            ORDER BY et.created_at ASC, et.id ASC
            "#
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(trainers)
    }

    /// Link trainers to an event, returning the trainers that were not linked before
    pub async fn attach_to_event(&self, event_id: i64, trainer_ids: &[i64]) -> StoreResult<Vec<Trainer>> {
        let mut tx = self.pool.begin().await?;
        let mut attached = Vec::new();

        for trainer_id in trainer_ids {
            let inserted: Option<(i64,)> = sqlx::query_as(
                r#"
                INSERT INTO event_trainers (event_id, trainer_id, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (event_id, trainer_id) DO NOTHING
                RETURNING trainer_id
                "#
            )
            .bind(event_id)
            .bind(trainer_id)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((id,)) = inserted {
                attached.push(id);
            }
        }

        let trainers = sqlx::query_as::<_, Trainer>(&format!(
            "SELECT {TRAINER_COLUMNS} FROM trainers t WHERE t.id = ANY($1) ORDER BY t.id ASC"
        ))
        .bind(&attached)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(trainers)
    }
}

//! Trainers attached after assignment
//!
//! Linking trainers to an event that already has its pool adds them to the
//! existing meeting and sends them the meeting-ready message. The pool and
//! its attendees are left alone; only an empty pool trainer is backfilled.

use serde::Serialize;
use tracing::{info, warn};

use crate::models::AssignmentState;
use crate::scheduling::engine::PoolAssignmentEngine;
use crate::services::meeting::participant_key;
use crate::services::{DeliveryReport, MeetingData, Participant};
use crate::utils::errors::{AssignmentError, StoreError};
use crate::utils::logging::log_api_error;

/// What a trainer addition did
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainerAddition {
    pub event_id: i64,
    /// Trainers linked by this call, existing links excluded
    pub attached: Vec<i64>,
    /// Trainers registered on the existing meeting
    pub registered: usize,
    pub notifications: DeliveryReport,
}

impl PoolAssignmentEngine {
    /// Link trainers to an event and, if its pool exists, bring them into the meeting
    pub async fn add_trainers(&self, event_id: i64, trainer_ids: &[i64]) -> Result<TrainerAddition, AssignmentError> {
        let attached = self
            .store
            .attach_trainers(event_id, trainer_ids)
            .await
            .map_err(|e| match e {
                StoreError::EventNotFound { event_id } => AssignmentError::NotFound { event_id },
                other => other.into(),
            })?;

        let mut addition = TrainerAddition {
            event_id,
            attached: attached.iter().map(|t| t.id).collect(),
            ..TrainerAddition::default()
        };
        if attached.is_empty() {
            info!(event_id = event_id, "No new trainers to attach");
            return Ok(addition);
        }

        let details = self
            .store
            .load_event(event_id)
            .await?
            .ok_or(AssignmentError::NotFound { event_id })?;
        if details.assignment_state() != AssignmentState::Assigned {
            info!(event_id = event_id, trainers = attached.len(), "Trainers attached ahead of assignment");
            return Ok(addition);
        }

        let Some(pool) = details.pool_with_meet_link() else {
            warn!(event_id = event_id, "Assigned event has no pool with a meeting link, trainers not invited");
            return Ok(addition);
        };
        let Some(shared_url) = pool.pool.meet_link.clone() else {
            return Ok(addition);
        };
        let Some(meeting_id) = self.meetings.meeting_id_from_url(&shared_url) else {
            warn!(event_id = event_id, url = %shared_url, "Cannot extract meeting id from pool link");
            return Ok(addition);
        };

        let participants: Vec<Participant> = attached
            .iter()
            .filter_map(|t| t.meeting_identity().map(|email| Participant::new(email, &t.name)))
            .collect();

        let mut participant_urls = if participants.is_empty() {
            Default::default()
        } else {
            match self.meetings.add_participants(&meeting_id, &participants).await {
                Ok(urls) => urls,
                Err(e) => {
                    log_api_error("meeting", &e.to_string(), Some(&format!("add trainers to meeting {}", meeting_id)));
                    Default::default()
                }
            }
        };
        addition.registered = participant_urls.len();

        // Trainers the provider did not register still get the shared link
        for participant in &participants {
            participant_urls
                .entry(participant_key(&participant.email))
                .or_insert_with(|| shared_url.clone());
        }

        if pool.pool.trainer_id.is_none() {
            if let Err(e) = self.store.set_pool_trainer(pool.pool.id, attached[0].id).await {
                warn!(event_id = event_id, pool_id = pool.pool.id, error = %e, "Failed to backfill pool trainer");
            }
        }

        let meeting = MeetingData {
            meeting_id,
            shared_url,
            participant_urls,
        };
        addition.notifications = self.cascade.announce_trainers(&details, &attached, Some(&meeting)).await;

        info!(
            event_id = event_id,
            attached = addition.attached.len(),
            registered = addition.registered,
            "Trainers added to assigned event"
        );
        Ok(addition)
    }
}

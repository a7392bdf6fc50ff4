//! Pool assignment engine
//!
//! Turns an eligible event into exactly one pool bound to one meeting:
//! checks preconditions, creates the meeting, commits the pool with its
//! attendees through the store's atomic transaction and hands the result
//! to the notification cascade.
//!
//! The meeting is created before the transaction. When the commit fails and
//! this run's pool is not in the store, the meeting is deleted again, so a
//! meeting never outlives a missing pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SchedulingConfig;
use crate::database::EventStore;
use crate::models::{AssignmentState, EventDetails, EventSnapshot, NewAssignment, NewPoolAttendee, PoolAssignment};
use crate::scheduling::cascade::NotificationCascade;
use crate::scheduling::time_range::TimeRange;
use crate::services::{DeliveryReport, MeetingData, MeetingProvider, MeetingRequest, Participant};
use crate::utils::errors::{AssignmentError, MeetingError, MeetingResult, StoreError};
use crate::utils::helpers::offset_from_minutes;
use crate::utils::logging::{log_api_error, log_assignment_outcome};

/// A committed assignment
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub assignment: PoolAssignment,
    /// Absent when nobody had a contact address to invite
    pub meeting: Option<MeetingData>,
    pub notifications: DeliveryReport,
}

#[derive(Clone)]
pub struct PoolAssignmentEngine {
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) meetings: Arc<dyn MeetingProvider>,
    pub(crate) cascade: NotificationCascade,
    pub(crate) config: SchedulingConfig,
}

impl PoolAssignmentEngine {
    pub fn new(
        store: Arc<dyn EventStore>,
        meetings: Arc<dyn MeetingProvider>,
        cascade: NotificationCascade,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            store,
            meetings,
            cascade,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn cascade(&self) -> &NotificationCascade {
        &self.cascade
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Assign pools for an event as of now
    pub async fn assign_pools(&self, event_id: i64) -> Result<AssignmentOutcome, AssignmentError> {
        self.assign_pools_at(event_id, Utc::now()).await
    }

    /// Assign pools for an event, judging the registration deadline against `now`.
    ///
    /// Failures after the event was loaded are escalated to the operator.
    pub async fn assign_pools_at(&self, event_id: i64, now: DateTime<Utc>) -> Result<AssignmentOutcome, AssignmentError> {
        let result = self.run(event_id, now).await;

        match &result {
            Ok(outcome) => {
                log_assignment_outcome(event_id, "success", None);
                debug!(
                    event_id = event_id,
                    pool_id = outcome.assignment.pool.id,
                    attendees = outcome.assignment.attendees.len(),
                    "Assignment result"
                );
            }
            Err(e) => {
                let outcome = if e.is_skip() { "skipped" } else { "failed" };
                log_assignment_outcome(event_id, outcome, Some(e.kind()));
                if let Some(event) = e.event() {
                    self.cascade.escalate(event, &e.to_string()).await;
                }
            }
        }

        result
    }

    async fn run(&self, event_id: i64, now: DateTime<Utc>) -> Result<AssignmentOutcome, AssignmentError> {
        let details = self
            .store
            .load_event(event_id)
            .await?
            .ok_or(AssignmentError::NotFound { event_id })?;
        let snapshot = details.event.snapshot();

        if !details.event.deadline_passed(now) {
            return Err(AssignmentError::DeadlineNotPassed { event: snapshot });
        }
        if details.assignment_state() == AssignmentState::Assigned {
            return Err(AssignmentError::AlreadyAssigned { event: snapshot });
        }
        if details.registrants.is_empty() {
            return Err(AssignmentError::NoRegistrants { event: snapshot });
        }

        let range = TimeRange::parse_or_default(&details.event.event_time);
        let meeting = self.create_meeting(&details, &range, &snapshot).await?;
        let assignment = self.build_assignment(&details, meeting.as_ref());

        let committed = match self.store.commit_assignment(&assignment).await {
            Ok(committed) => committed,
            Err(e) => self.reconcile_commit_failure(snapshot, e, meeting.as_ref()).await?,
        };

        info!(
            event_id = event_id,
            pool_id = committed.pool.id,
            attendees = committed.attendees.len(),
            "Pools assigned"
        );

        let notifications = self
            .cascade
            .announce_assignment(&details, &committed, meeting.as_ref())
            .await;

        Ok(AssignmentOutcome {
            assignment: committed,
            meeting,
            notifications,
        })
    }

    async fn create_meeting(
        &self,
        details: &EventDetails,
        range: &TimeRange,
        snapshot: &EventSnapshot,
    ) -> Result<Option<MeetingData>, AssignmentError> {
        let participants = invitees(details);
        let Some(host) = participants.first().cloned() else {
            info!(event_id = details.event.id, "Nobody has a contact address, creating the pool without a meeting");
            return Ok(None);
        };

        let request = MeetingRequest {
            topic: details.event.title.clone(),
            start_time: range.start_on(details.event.event_date, offset_from_minutes(self.config.utc_offset_minutes)),
            duration_minutes: range.duration_minutes(),
            participants,
            host,
        };
        debug!(
            event_id = details.event.id,
            participants = request.participants.len(),
            duration_minutes = request.duration_minutes,
            "Creating meeting"
        );

        let limit = Duration::from_secs(self.config.meeting_timeout_secs);
        let provider = self.meetings.clone();
        let open_request = request.clone();
        let mut opening = tokio::spawn(async move { provider.open_meeting(&open_request).await });

        let mut meeting = match tokio::time::timeout(limit, &mut opening).await {
            Ok(Ok(Ok(meeting))) => meeting,
            Ok(Ok(Err(e))) => return Err(meeting_failure(snapshot, e)),
            Ok(Err(join_error)) => {
                return Err(meeting_failure(snapshot, MeetingError::RequestFailed(join_error.to_string())));
            }
            Err(_) => {
                self.reap_late_meeting(opening, limit).await;
                return Err(meeting_failure(snapshot, MeetingError::Timeout));
            }
        };

        if meeting.shared_url.trim().is_empty() {
            self.discard_meeting(&meeting).await;
            return Err(meeting_failure(snapshot, MeetingError::MissingJoinUrl));
        }

        // The meeting exists from here on, so every failure path deletes it
        let registration = self.meetings.add_participants(&meeting.meeting_id, &request.participants);
        match tokio::time::timeout(limit, registration).await {
            Ok(Ok(urls)) => meeting.participant_urls = urls,
            Ok(Err(e)) => {
                self.discard_meeting(&meeting).await;
                return Err(meeting_failure(snapshot, e));
            }
            Err(_) => {
                warn!(meeting_id = %meeting.meeting_id, participants = request.participants.len(), "Participant registration timed out");
                self.discard_meeting(&meeting).await;
                return Err(meeting_failure(snapshot, MeetingError::Timeout));
            }
        }

        Ok(Some(meeting))
    }

    fn build_assignment(&self, details: &EventDetails, meeting: Option<&MeetingData>) -> NewAssignment {
        let attendees = details
            .registrants
            .iter()
            .map(|user| NewPoolAttendee {
                user_id: user.id,
                meet_link: meeting
                    .zip(user.meeting_identity())
                    .and_then(|(m, email)| m.url_for(email))
                    .map(str::to_string),
            })
            .collect();

        NewAssignment {
            event_id: details.event.id,
            pool_name: self.config.pool_name.clone(),
            capacity: details
                .event
                .pool_capacity
                .filter(|c| *c > 0)
                .unwrap_or(self.config.default_pool_capacity),
            trainer_id: details.trainers.first().map(|t| t.id),
            meet_link: meeting.map(|m| m.shared_url.clone()),
            attendees,
        }
    }

    /// Decide what a failed commit means before touching the meeting.
    ///
    /// A lost compare-and-swap is `AlreadyAssigned`. Any other error may have
    /// arrived after the transaction committed on the server, so the event is
    /// read again: a pool carrying this run's shared link means the commit
    /// landed and the run continues as a success. The meeting is deleted only
    /// once this run's pool is known to be absent.
    async fn reconcile_commit_failure(
        &self,
        event: EventSnapshot,
        error: StoreError,
        meeting: Option<&MeetingData>,
    ) -> Result<PoolAssignment, AssignmentError> {
        if matches!(error, StoreError::AlreadyAssigned { .. }) {
            if let Some(meeting) = meeting {
                self.discard_meeting(meeting).await;
            }
            return Err(AssignmentError::AlreadyAssigned { event });
        }

        warn!(event_id = event.id, error = %error, "Assignment transaction failed");
        let current = match self.store.load_event(event.id).await {
            Ok(current) => current,
            Err(reload_error) => {
                if let Some(meeting) = meeting {
                    warn!(
                        event_id = event.id,
                        meeting_id = %meeting.meeting_id,
                        error = %reload_error,
                        "Commit outcome unknown, keeping meeting"
                    );
                }
                return Err(AssignmentError::TransactionFailed {
                    event,
                    reason: format!("{} (outcome unverified: {})", error, reload_error),
                });
            }
        };

        let landed = current.as_ref().zip(meeting).and_then(|(current, meeting)| {
            current
                .pools
                .iter()
                .find(|p| p.pool.meet_link.as_deref() == Some(meeting.shared_url.as_str()))
        });
        if let Some(ours) = landed {
            info!(event_id = event.id, pool_id = ours.pool.id, "Commit landed despite the store error");
            return Ok(PoolAssignment {
                pool: ours.pool.clone(),
                attendees: ours.attendees.clone(),
            });
        }

        if let Some(meeting) = meeting {
            self.discard_meeting(meeting).await;
        }
        match current {
            Some(current) if current.assignment_state() == AssignmentState::Assigned => {
                Err(AssignmentError::AlreadyAssigned { event })
            }
            _ => Err(AssignmentError::TransactionFailed {
                event,
                reason: error.to_string(),
            }),
        }
    }

    /// Give a creation that outlived the timeout `grace` more time to finish,
    /// then delete whatever it created
    async fn reap_late_meeting(&self, opening: JoinHandle<MeetingResult<MeetingData>>, grace: Duration) {
        match tokio::time::timeout(grace, opening).await {
            Ok(Ok(Ok(meeting))) => {
                warn!(meeting_id = %meeting.meeting_id, "Meeting created after the timeout, deleting it");
                self.discard_meeting(&meeting).await;
            }
            Ok(_) => debug!("Timed out meeting creation did not produce a meeting"),
            Err(_) => warn!(grace_secs = grace.as_secs(), "Meeting creation still pending, leaving it behind"),
        }
    }

    async fn discard_meeting(&self, meeting: &MeetingData) {
        match self.meetings.delete_meeting(&meeting.meeting_id).await {
            Ok(()) => info!(meeting_id = %meeting.meeting_id, "Orphaned meeting deleted"),
            Err(e) => log_api_error("meeting", &e.to_string(), Some(&format!("delete meeting {}", meeting.meeting_id))),
        }
    }
}

/// Registrants then trainers with a contact address, without duplicates
fn invitees(details: &EventDetails) -> Vec<Participant> {
    let mut seen = HashSet::new();
    let registrants = details
        .registrants
        .iter()
        .filter_map(|u| u.meeting_identity().map(|email| Participant::new(email, &u.name)));
    let trainers = details
        .trainers
        .iter()
        .filter_map(|t| t.meeting_identity().map(|email| Participant::new(email, &t.name)));

    registrants
        .chain(trainers)
        .filter(|p| seen.insert(p.key()))
        .collect()
}

fn meeting_failure(event: &EventSnapshot, error: MeetingError) -> AssignmentError {
    AssignmentError::MeetingCreationFailed {
        event: event.clone(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Trainer, User};

    fn user(id: i64, name: &str, email: Option<&str>) -> User {
        User {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn details(registrants: Vec<User>, trainers: Vec<Trainer>) -> EventDetails {
        EventDetails {
            event: Event {
                id: 1,
                title: "HIIT".to_string(),
                event_date: Utc::now(),
                event_time: "10:00 AM - 2:00 PM".to_string(),
                registration_deadline: None,
                max_capacity: None,
                pool_capacity: None,
                pools_assigned: false,
                reminder2_sent: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            registrants,
            trainers,
            pools: Vec::new(),
        }
    }

    #[test]
    fn test_invitees_skip_missing_and_duplicate_addresses() {
        let trainer = Trainer {
            id: 9,
            name: "Coach".to_string(),
            email: Some("A@Example.com".to_string()),
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let details = details(
            vec![
                user(1, "Asha", Some("a@example.com")),
                user(2, "Bo", Some("not-an-address")),
                user(3, "Cy", None),
                user(4, "Di", Some("d@example.com")),
            ],
            vec![trainer],
        );

        let invited: Vec<String> = invitees(&details).into_iter().map(|p| p.email).collect();
        assert_eq!(invited, vec!["a@example.com".to_string(), "d@example.com".to_string()]);
    }

    #[test]
    fn test_host_falls_back_to_trainer() {
        let trainer = Trainer {
            id: 9,
            name: "Coach".to_string(),
            email: Some("coach@example.com".to_string()),
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let details = details(vec![user(1, "Asha", None)], vec![trainer]);
        let invited = invitees(&details);
        assert_eq!(invited.first().map(|p| p.display_name.as_str()), Some("Coach"));
    }
}

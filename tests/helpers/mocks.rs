//! Recording collaborators
//!
//! In-process stand-ins for the meeting provider, the messaging provider and
//! the URL shortener. Every call is recorded so tests can assert on exactly
//! what the scheduling core asked for.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use PoolMate::database::{EventStore, InMemoryEventStore};
use PoolMate::models::{Event, EventDetails, NewAssignment, PoolAssignment, Trainer};
use PoolMate::services::meeting::{MeetingData, MeetingProvider, MeetingRequest, Participant};
use PoolMate::services::notification::{MessageAck, NotificationSender, TemplateKind, TemplateMessage};
use PoolMate::services::shortener::UrlShortener;
use PoolMate::services::zoom::zoom_meeting_id;
use PoolMate::utils::errors::{
    MeetingError, MeetingResult, NotificationError, NotificationResult, PoolMateError, StoreError, StoreResult,
};

/// Meeting provider handing out deterministic Zoom-style URLs
#[derive(Default)]
pub struct RecordingMeetingProvider {
    pub created: Mutex<Vec<MeetingRequest>>,
    pub added: Mutex<Vec<(String, Vec<Participant>)>>,
    pub deleted: Mutex<Vec<String>>,
    fail_create: AtomicBool,
    empty_shared_url: AtomicBool,
    next_id: AtomicU64,
    open_delay: Mutex<Option<Duration>>,
    registration_delay: Mutex<Option<Duration>>,
}

impl RecordingMeetingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creation(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn omit_shared_url(&self) {
        self.empty_shared_url.store(true, Ordering::SeqCst);
    }

    /// Record the meeting, then stall before answering
    pub fn stall_creation(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = Some(delay);
    }

    /// Stall every participant registration call
    pub fn stall_registration(&self, delay: Duration) {
        *self.registration_delay.lock().unwrap() = Some(delay);
    }

    pub fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<MeetingRequest> {
        self.created.lock().unwrap().last().cloned()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn personal_urls(meeting_id: &str, participants: &[Participant]) -> HashMap<String, String> {
        participants
            .iter()
            .map(|p| (p.key(), format!("https://zoom.us/w/{}?tk={}", meeting_id, p.key())))
            .collect()
    }
}

#[async_trait]
impl MeetingProvider for RecordingMeetingProvider {
    async fn open_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingData> {
        self.created.lock().unwrap().push(request.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(MeetingError::RequestFailed("HTTP 500: provider down".to_string()));
        }

        let meeting_id = (81_000_000_000 + self.next_id.fetch_add(1, Ordering::SeqCst)).to_string();
        let shared_url = if self.empty_shared_url.load(Ordering::SeqCst) {
            String::new()
        } else {
            format!("https://zoom.us/j/{}", meeting_id)
        };

        let delay = *self.open_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(MeetingData {
            meeting_id,
            shared_url,
            participant_urls: HashMap::new(),
        })
    }

    async fn add_participants(&self, meeting_id: &str, participants: &[Participant]) -> MeetingResult<HashMap<String, String>> {
        self.added
            .lock()
            .unwrap()
            .push((meeting_id.to_string(), participants.to_vec()));

        let delay = *self.registration_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::personal_urls(meeting_id, participants))
    }

    async fn delete_meeting(&self, meeting_id: &str) -> MeetingResult<()> {
        self.deleted.lock().unwrap().push(meeting_id.to_string());
        Ok(())
    }

    fn meeting_id_from_url(&self, url: &str) -> Option<String> {
        zoom_meeting_id(url)
    }
}

/// One recorded send attempt
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub message: TemplateMessage,
    pub delivered: bool,
}

/// Messaging provider recording every attempt, failing for chosen recipients
#[derive(Default)]
pub struct RecordingSender {
    attempts: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str) {
        self.failing.lock().unwrap().insert(recipient.to_string());
    }

    /// Stall every send after recording it
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn attempts(&self) -> Vec<SentMessage> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_of(&self, kind: TemplateKind) -> Vec<SentMessage> {
        self.attempts()
            .into_iter()
            .filter(|a| a.message.kind == kind)
            .collect()
    }

    pub fn recipients_of(&self, kind: TemplateKind) -> Vec<String> {
        self.attempts_of(kind).into_iter().map(|a| a.recipient).collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_template(&self, recipient: &str, message: &TemplateMessage) -> NotificationResult<MessageAck> {
        let fails = self.failing.lock().unwrap().contains(recipient);
        self.attempts.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            message: message.clone(),
            delivered: !fails,
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fails {
            return Err(NotificationError::Rejected(format!("recipient {} unavailable", recipient)));
        }
        Ok(MessageAck {
            message_id: format!("wamid.{}", self.attempts.lock().unwrap().len()),
        })
    }
}

/// Shortener mapping every URL onto a fixed host, or failing on demand
#[derive(Default)]
pub struct FakeShortener {
    fail: AtomicBool,
}

impl FakeShortener {
    pub const PREFIX: &'static str = "https://tiny.test/";

    pub fn failing() -> Self {
        Self {
            fail: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl UrlShortener for FakeShortener {
    async fn shorten(&self, url: &str) -> Result<String, PoolMateError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PoolMateError::InvalidInput("shortener unavailable".to_string()));
        }
        Ok(format!("{}{}", Self::PREFIX, url.len()))
    }
}

/// Store whose commit goes through but is reported as timed out, like a
/// COMMIT acknowledged by the server after the client gave up
pub struct LateAckStore {
    inner: Arc<InMemoryEventStore>,
}

impl LateAckStore {
    pub fn new(inner: Arc<InMemoryEventStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EventStore for LateAckStore {
    async fn load_event(&self, event_id: i64) -> StoreResult<Option<EventDetails>> {
        self.inner.load_event(event_id).await
    }

    async fn events_pending_assignment(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        self.inner.events_pending_assignment(from, to).await
    }

    async fn events_pending_reminder(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Event>> {
        self.inner.events_pending_reminder(from, to).await
    }

    async fn commit_assignment(&self, assignment: &NewAssignment) -> StoreResult<PoolAssignment> {
        self.inner.commit_assignment(assignment).await?;
        Err(StoreError::Timeout(10))
    }

    async fn mark_reminder_sent(&self, event_id: i64) -> StoreResult<()> {
        self.inner.mark_reminder_sent(event_id).await
    }

    async fn attach_trainers(&self, event_id: i64, trainer_ids: &[i64]) -> StoreResult<Vec<Trainer>> {
        self.inner.attach_trainers(event_id, trainer_ids).await
    }

    async fn set_pool_trainer(&self, pool_id: i64, trainer_id: i64) -> StoreResult<()> {
        self.inner.set_pool_trainer(pool_id, trainer_id).await
    }
}

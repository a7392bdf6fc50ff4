//! Meeting provider seam
//!
//! A provider creates a time-boxed video meeting and registers every
//! participant individually so each one gets a personal join URL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::utils::errors::MeetingResult;

/// One invitee of a meeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub email: String,
    pub display_name: String,
}

impl Participant {
    pub fn new(email: &str, display_name: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// Case-insensitive key used in per-participant URL maps
    pub fn key(&self) -> String {
        participant_key(&self.email)
    }
}

/// Normalized lookup key for a participant email
pub fn participant_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parameters of a meeting to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub participants: Vec<Participant>,
    /// Nominal host identity, the first registrant with an email
    pub host: Participant,
}

/// A created meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingData {
    pub meeting_id: String,
    pub shared_url: String,
    /// Personal join URLs keyed by [`participant_key`]
    pub participant_urls: HashMap<String, String>,
}

impl MeetingData {
    pub fn url_for(&self, email: &str) -> Option<&str> {
        self.participant_urls.get(&participant_key(email)).map(String::as_str)
    }
}

#[async_trait]
pub trait MeetingProvider: Send + Sync {
    /// Create the meeting itself, without registering anyone.
    ///
    /// Returns the meeting id and shared URL with empty `participant_urls`.
    async fn open_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingData>;

    /// Register more participants on an existing meeting, returning the URLs obtained.
    ///
    /// Participants whose registration fails are left out of the map.
    async fn add_participants(&self, meeting_id: &str, participants: &[Participant]) -> MeetingResult<HashMap<String, String>>;

    /// Remove a meeting that ended up without a pool
    async fn delete_meeting(&self, meeting_id: &str) -> MeetingResult<()>;

    /// Extract the meeting identifier from a stored shared URL
    fn meeting_id_from_url(&self, url: &str) -> Option<String>;

    /// Create a meeting and register all participants.
    ///
    /// Only a failure to create the meeting fails the call. If registration
    /// itself errors the meeting is deleted again before the error is returned.
    async fn create_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingData> {
        let mut meeting = self.open_meeting(request).await?;
        match self.add_participants(&meeting.meeting_id, &request.participants).await {
            Ok(urls) => {
                meeting.participant_urls = urls;
                Ok(meeting)
            }
            Err(e) => {
                if let Err(delete_error) = self.delete_meeting(&meeting.meeting_id).await {
                    warn!(meeting_id = %meeting.meeting_id, error = %delete_error, "Failed to delete meeting after registration error");
                }
                Err(e)
            }
        }
    }
}

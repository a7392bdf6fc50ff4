//! Zoom meeting provider
//!
//! Uses a server-to-server OAuth app: an account-credentials token is
//! fetched on demand and cached until shortly before it expires. Meetings
//! are created with automatic registrant approval so that every registrant
//! gets a personal `join_url`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::settings::ZoomConfig;
use crate::services::meeting::{MeetingData, MeetingProvider, MeetingRequest, Participant};
use crate::utils::errors::{MeetingError, MeetingResult, PoolMateError, Result};
use crate::utils::logging::log_api_error;

/// Refresh the token this long before Zoom says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedMeeting {
    id: u64,
    join_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedRegistrant {
    join_url: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Zoom implementation of [`MeetingProvider`]
#[derive(Clone)]
pub struct ZoomMeetingProvider {
    client: Client,
    config: ZoomConfig,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl ZoomMeetingProvider {
    /// Create a new ZoomMeetingProvider instance
    pub fn new(config: ZoomConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("PoolMate/1.0")
            .build()
            .map_err(PoolMateError::Http)?;

        Ok(Self {
            client,
            config,
            token: Arc::new(Mutex::new(None)),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// Return a valid access token, fetching a new one when the cached one is stale
    async fn access_token(&self) -> MeetingResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Zoom access token");
        let response = self
            .client
            .post(&self.config.oauth_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .query(&[("grant_type", "account_credentials"), ("account_id", self.config.account_id.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MeetingError::AuthenticationFailed(format!("HTTP {}: {}", status, error_text)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MeetingError::InvalidResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    /// Register one participant, returning their personal join URL
    async fn register(&self, meeting_id: &str, participant: &Participant, token: &str) -> MeetingResult<String> {
        let (first_name, last_name) = split_name(participant);
        let response = self
            .client
            .post(self.api_url(&format!("meetings/{}/registrants", meeting_id)))
            .bearer_auth(token)
            .json(&json!({
                "email": participant.email,
                "first_name": first_name,
                "last_name": last_name,
            }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let registrant: CreatedRegistrant = parse_success(response).await?;
        registrant
            .join_url
            .ok_or_else(|| MeetingError::InvalidResponse("registrant without join_url".to_string()))
    }

    /// Register participants concurrently, keeping whatever subset succeeds
    async fn register_all(&self, meeting_id: &str, participants: &[Participant], token: &str) -> HashMap<String, String> {
        let registrations: Vec<BoxFuture<'static, (String, MeetingResult<String>)>> = participants
            .iter()
            .cloned()
            .map(|participant| {
                let provider = self.clone();
                let meeting_id = meeting_id.to_string();
                let token = token.to_string();
                async move {
                    let result = provider.register(&meeting_id, &participant, &token).await;
                    (participant.key(), result)
                }
                .boxed()
            })
            .collect();

        let results: Vec<(String, MeetingResult<String>)> = stream::iter(registrations)
            .buffer_unordered(self.config.registration_concurrency.max(1))
            .collect()
            .await;

        let mut urls = HashMap::new();
        for (key, result) in results {
            match result {
                Ok(url) => {
                    urls.insert(key, url);
                }
                Err(e) => {
                    warn!(meeting_id = %meeting_id, participant = %key, error = %e, "Failed to register meeting participant");
                }
            }
        }

        debug!(meeting_id = %meeting_id, registered = urls.len(), requested = participants.len(), "Registered meeting participants");
        urls
    }
}

#[async_trait]
impl MeetingProvider for ZoomMeetingProvider {
    async fn open_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingData> {
        info!(topic = %request.topic, start_time = %request.start_time, duration = request.duration_minutes, participants = request.participants.len(), "Creating Zoom meeting");

        let token = self.access_token().await?;
        let body = json!({
            "topic": request.topic,
            "type": 2,
            "start_time": request.start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "duration": request.duration_minutes,
            "timezone": "UTC",
            "settings": {
                "approval_type": 0,
                "registration_type": 1,
                "join_before_host": true,
                "waiting_room": false,
                "registrants_email_notification": false,
                "registrants_confirmation_email": false,
                "contact_name": request.host.display_name,
                "contact_email": request.host.email,
            }
        });

        let response = self
            .client
            .post(self.api_url(&format!("users/{}/meetings", self.config.host_user)))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let created: CreatedMeeting = parse_success(response).await.map_err(|e| {
            log_api_error("zoom", &e.to_string(), Some("create meeting"));
            e
        })?;

        let meeting_id = created.id.to_string();
        let Some(shared_url) = created.join_url.filter(|url| !url.is_empty()) else {
            if let Err(e) = self.delete_meeting(&meeting_id).await {
                warn!(meeting_id = %meeting_id, error = %e, "Failed to delete meeting without join URL");
            }
            return Err(MeetingError::MissingJoinUrl);
        };

        info!(meeting_id = %meeting_id, "Zoom meeting created");
        Ok(MeetingData {
            meeting_id,
            shared_url,
            participant_urls: HashMap::new(),
        })
    }

    async fn add_participants(&self, meeting_id: &str, participants: &[Participant]) -> MeetingResult<HashMap<String, String>> {
        let token = self.access_token().await?;
        Ok(self.register_all(meeting_id, participants, &token).await)
    }

    async fn delete_meeting(&self, meeting_id: &str) -> MeetingResult<()> {
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(self.api_url(&format!("meetings/{}", meeting_id)))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MeetingError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        info!(meeting_id = %meeting_id, "Zoom meeting deleted");
        Ok(())
    }

    fn meeting_id_from_url(&self, url: &str) -> Option<String> {
        zoom_meeting_id(url)
    }
}

/// Meeting number from a join URL such as `https://us02web.zoom.us/j/85746065432?pwd=...`
pub fn zoom_meeting_id(join_url: &str) -> Option<String> {
    let parsed = url::Url::parse(join_url).ok()?;
    let mut segments = parsed.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "j" || segment == "w" || segment == "s" {
            return segments
                .next()
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string);
        }
    }
    None
}

fn split_name(participant: &Participant) -> (String, String) {
    let name = participant.display_name.trim();
    if name.is_empty() {
        let local = participant.email.split('@').next().unwrap_or_default();
        return (local.to_string(), String::new());
    }
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

fn map_transport_error(e: reqwest::Error) -> MeetingError {
    if e.is_timeout() {
        MeetingError::Timeout
    } else {
        MeetingError::RequestFailed(e.to_string())
    }
}

async fn parse_success<T: serde::de::DeserializeOwned>(response: Response) -> MeetingResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(MeetingError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| MeetingError::InvalidResponse(e.to_string()))
}

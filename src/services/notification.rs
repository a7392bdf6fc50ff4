//! Notification primitives
//!
//! Message kinds, length-bounded template parameters and the
//! [`NotificationSender`] seam implemented by the messaging provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TemplateNames;
use crate::models::EventSnapshot;
use crate::utils::errors::NotificationResult;
use crate::utils::helpers::truncate_text;

/// Maximum characters in a header parameter
pub const HEADER_PARAM_MAX_CHARS: usize = 60;
/// Maximum characters in a single body parameter
pub const BODY_PARAM_MAX_CHARS: usize = 512;
/// Maximum characters in a button parameter
pub const BUTTON_PARAM_MAX_CHARS: usize = 2000;

/// The templated messages sent by the scheduling core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    MeetingReadyUser,
    MeetingReadyTrainer,
    ReminderUser,
    ReminderTrainer,
    FirstTouch,
    ErrorEscalation,
}

impl TemplateKind {
    /// Provider template name configured for this kind
    pub fn template_name<'a>(&self, names: &'a TemplateNames) -> &'a str {
        match self {
            TemplateKind::MeetingReadyUser => &names.meeting_ready_user,
            TemplateKind::MeetingReadyTrainer => &names.meeting_ready_trainer,
            TemplateKind::ReminderUser => &names.reminder_user,
            TemplateKind::ReminderTrainer => &names.reminder_trainer,
            TemplateKind::FirstTouch => &names.first_touch,
            TemplateKind::ErrorEscalation => &names.error_escalation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::MeetingReadyUser => "meeting_ready_user",
            TemplateKind::MeetingReadyTrainer => "meeting_ready_trainer",
            TemplateKind::ReminderUser => "reminder_user",
            TemplateKind::ReminderTrainer => "reminder_trainer",
            TemplateKind::FirstTouch => "first_touch",
            TemplateKind::ErrorEscalation => "error_escalation",
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template message with ordered, already truncated parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub kind: TemplateKind,
    pub header: Option<String>,
    pub body: Vec<String>,
    pub button: Option<String>,
}

impl TemplateMessage {
    pub fn new(kind: TemplateKind) -> Self {
        Self {
            kind,
            header: None,
            body: Vec::new(),
            button: None,
        }
    }

    pub fn header(mut self, text: &str) -> Self {
        self.header = Some(truncate_text(text, HEADER_PARAM_MAX_CHARS));
        self
    }

    pub fn body_param(mut self, text: &str) -> Self {
        self.body.push(truncate_text(text, BODY_PARAM_MAX_CHARS));
        self
    }

    pub fn button(mut self, text: &str) -> Self {
        self.button = Some(truncate_text(text, BUTTON_PARAM_MAX_CHARS));
        self
    }

    /// "Your meeting is ready" for a registrant
    pub fn meeting_ready_user(name: &str, title: &str, date: &str, time: &str, link: &str) -> Self {
        Self::new(TemplateKind::MeetingReadyUser)
            .header(title)
            .body_param(name)
            .body_param(title)
            .body_param(date)
            .body_param(time)
            .body_param(link)
    }

    /// "Your session is ready" for a trainer
    pub fn meeting_ready_trainer(name: &str, title: &str, date: &str, time: &str, link: &str) -> Self {
        Self::new(TemplateKind::MeetingReadyTrainer)
            .header(title)
            .body_param(name)
            .body_param(title)
            .body_param(date)
            .body_param(time)
            .body_param(link)
    }

    /// Same-day "about to start" reminder for a registrant
    pub fn reminder_user(name: &str, title: &str, time: &str, link: &str) -> Self {
        Self::new(TemplateKind::ReminderUser)
            .body_param(name)
            .body_param(title)
            .body_param(time)
            .body_param(link)
    }

    /// Same-day "about to start" reminder for a trainer
    pub fn reminder_trainer(name: &str, title: &str, time: &str, link: &str) -> Self {
        Self::new(TemplateKind::ReminderTrainer)
            .body_param(name)
            .body_param(title)
            .body_param(time)
            .body_param(link)
    }

    /// Parameterless nudge sent right after the meeting-ready message
    pub fn first_touch() -> Self {
        Self::new(TemplateKind::FirstTouch)
    }

    /// Operator alert describing a failed run
    pub fn error_escalation(event: &EventSnapshot, date: &str, error: &str) -> Self {
        Self::new(TemplateKind::ErrorEscalation)
            .header("Pool assignment failed")
            .body_param(&event.title)
            .body_param(date)
            .body_param(&event.event_time)
            .body_param(error)
    }
}

/// Provider acknowledgement of an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAck {
    pub message_id: String,
}

/// Sends a template message to one recipient phone number
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_template(&self, recipient: &str, message: &TemplateMessage) -> NotificationResult<MessageAck>;
}

/// Tally of a batch of independent sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Recipients without a usable phone number or link
    pub skipped: usize,
}

impl DeliveryReport {
    pub fn merge(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

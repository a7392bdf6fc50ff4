//! Notification cascade
//!
//! Best-effort fan-out of templated messages after an assignment and
//! operator escalation when a run fails. Every recipient is attempted
//! independently; nothing here can turn a committed assignment into a
//! failure.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info, warn};

use crate::config::SchedulingConfig;
use crate::models::{EventDetails, EventSnapshot, PoolAssignment, Trainer};
use crate::services::{DeliveryReport, MeetingData, NotificationSender, TemplateMessage, UrlShortener};
use crate::utils::helpers::{format_event_date, offset_from_minutes};
use crate::utils::logging::log_notification_failure;

#[derive(Clone)]
pub struct NotificationCascade {
    sender: Arc<dyn NotificationSender>,
    shortener: Arc<dyn UrlShortener>,
    offset: FixedOffset,
    operator_phone: Option<String>,
}

impl NotificationCascade {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        shortener: Arc<dyn UrlShortener>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            sender,
            shortener,
            offset: offset_from_minutes(config.utc_offset_minutes),
            operator_phone: config.operator_phone.clone(),
        }
    }

    /// Business time zone used to render dates in messages
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Send one message, recording the outcome in `report`
    pub(crate) async fn deliver(
        &self,
        event_id: i64,
        phone: Option<&str>,
        message: &TemplateMessage,
        report: &mut DeliveryReport,
    ) -> bool {
        let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
            debug!(event_id = event_id, template = %message.kind, "Recipient has no phone number, skipping");
            report.skipped += 1;
            return false;
        };

        match self.sender.send_template(phone, message).await {
            Ok(ack) => {
                debug!(event_id = event_id, template = %message.kind, message_id = %ack.message_id, "Notification sent");
                report.sent += 1;
                true
            }
            Err(e) => {
                log_notification_failure(event_id, message.kind.as_str(), phone, &e.to_string());
                report.failed += 1;
                false
            }
        }
    }

    /// Meeting-ready and first-touch messages for everyone in a fresh assignment
    pub async fn announce_assignment(
        &self,
        details: &EventDetails,
        assignment: &PoolAssignment,
        meeting: Option<&MeetingData>,
    ) -> DeliveryReport {
        let event = &details.event;
        let date = format_event_date(event.event_date, self.offset);
        let links: HashMap<i64, &str> = assignment
            .attendees
            .iter()
            .filter_map(|a| a.meet_link.as_deref().map(|link| (a.user_id, link)))
            .collect();

        let mut report = DeliveryReport::default();

        for user in &details.registrants {
            let phone = user.phone_number.as_deref();
            match links.get(&user.id) {
                Some(link) => {
                    let link = self.short_link(link).await;
                    let message = TemplateMessage::meeting_ready_user(&user.name, &event.title, &date, &event.event_time, &link);
                    self.deliver(event.id, phone, &message, &mut report).await;
                }
                None => debug!(event_id = event.id, user_id = user.id, "No personal link, no meeting-ready message"),
            }
            self.deliver(event.id, phone, &TemplateMessage::first_touch(), &mut report).await;
        }

        let trainer_report = self.announce_trainers(details, &details.trainers, meeting).await;
        report.merge(trainer_report);

        info!(
            event_id = event.id,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Assignment notifications dispatched"
        );
        report
    }

    /// Meeting-ready messages for trainers holding a link on `meeting`,
    /// first-touch for every trainer
    pub async fn announce_trainers(
        &self,
        details: &EventDetails,
        trainers: &[Trainer],
        meeting: Option<&MeetingData>,
    ) -> DeliveryReport {
        let event = &details.event;
        let date = format_event_date(event.event_date, self.offset);
        let mut report = DeliveryReport::default();

        for trainer in trainers {
            let phone = trainer.phone_number.as_deref();
            let link = meeting.zip(trainer.meeting_identity()).and_then(|(m, email)| m.url_for(email));
            match link {
                Some(link) => {
                    let message = TemplateMessage::meeting_ready_trainer(&trainer.name, &event.title, &date, &event.event_time, link);
                    self.deliver(event.id, phone, &message, &mut report).await;
                }
                None => debug!(event_id = event.id, trainer_id = trainer.id, "Trainer has no meeting link"),
            }
            self.deliver(event.id, phone, &TemplateMessage::first_touch(), &mut report).await;
        }

        report
    }

    /// Alert the operator about a failed run. Never fails.
    pub async fn escalate(&self, event: &EventSnapshot, error: &str) {
        let Some(phone) = self.operator_phone.as_deref() else {
            debug!(event_id = event.id, "No operator contact configured, escalation dropped");
            return;
        };

        let date = format_event_date(event.event_date, self.offset);
        let message = TemplateMessage::error_escalation(event, &date, error);
        match self.sender.send_template(phone, &message).await {
            Ok(_) => info!(event_id = event.id, "Operator escalation sent"),
            Err(e) => warn!(event_id = event.id, error = %e, "Operator escalation failed"),
        }
    }

    async fn short_link(&self, link: &str) -> String {
        match self.shortener.shorten(link).await {
            Ok(short) => short,
            Err(e) => {
                debug!(error = %e, "Shortening failed, sending the full link");
                link.to_string()
            }
        }
    }
}

//! Services module
//!
//! External collaborators of the scheduling core: the meeting provider,
//! the messaging provider and the URL shortener.

pub mod meeting;
pub mod notification;
pub mod shortener;
pub mod whatsapp;
pub mod zoom;

// Re-export commonly used services
pub use meeting::{MeetingData, MeetingProvider, MeetingRequest, Participant};
pub use notification::{DeliveryReport, MessageAck, NotificationSender, TemplateKind, TemplateMessage};
pub use shortener::{HttpUrlShortener, PassthroughShortener, UrlShortener};
pub use whatsapp::WhatsAppSender;
pub use zoom::ZoomMeetingProvider;

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::utils::errors::Result;

/// Service factory for creating the configured provider implementations
#[derive(Clone)]
pub struct ServiceFactory {
    pub meeting_provider: Arc<dyn MeetingProvider>,
    pub notification_sender: Arc<dyn NotificationSender>,
    pub url_shortener: Arc<dyn UrlShortener>,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings) -> Result<Self> {
        let meeting_provider: Arc<dyn MeetingProvider> = Arc::new(ZoomMeetingProvider::new(settings.zoom.clone())?);
        let notification_sender: Arc<dyn NotificationSender> = Arc::new(WhatsAppSender::new(settings.whatsapp.clone())?);
        let url_shortener: Arc<dyn UrlShortener> = if settings.shortener.enabled {
            Arc::new(HttpUrlShortener::new(&settings.shortener)?)
        } else {
            Arc::new(PassthroughShortener)
        };

        Ok(Self {
            meeting_provider,
            notification_sender,
            url_shortener,
        })
    }
}

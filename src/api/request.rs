//! Request types for the exeat engine API.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::eligibility::InboundMessage;
use crate::models::Channel;

/// Body of `POST /leave-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequestBody {
    /// The guardian's message.
    pub text: String,
    /// Phone number or email address it came from.
    pub sender: String,
    /// Channel it arrived on.
    pub channel: Channel,
    /// When it was received; defaults to the server's local clock.
    #[serde(default)]
    pub received_at: Option<NaiveDateTime>,
}

impl LeaveRequestBody {
    /// Splits the body into the engine's message and the reference instant.
    pub fn into_parts(self) -> (InboundMessage, NaiveDateTime) {
        let now = received_or_now(self.received_at);
        let message = InboundMessage {
            text: self.text,
            sender: self.sender,
            channel: self.channel,
        };
        (message, now)
    }
}

/// Body of `POST /admin-commands`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCommandBody {
    /// The administrator's message.
    pub text: String,
    /// Phone number or email address it came from.
    pub sender: String,
    /// When it was received; defaults to the server's local clock.
    #[serde(default)]
    pub received_at: Option<NaiveDateTime>,
}

/// Body of `POST /departures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartureBody {
    /// Student leaving.
    pub admin_number: String,
    /// Identity document of the person collecting the student.
    pub driver_id: String,
    /// Departure time; defaults to the server's local clock.
    #[serde(default)]
    pub departed_at: Option<NaiveDateTime>,
}

/// Query string of `GET /students/:admin_number/active-leaves`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveLeavesQuery {
    /// Instant to check; defaults to the server's local clock.
    #[serde(default)]
    pub at: Option<NaiveDateTime>,
}

/// The supplied instant, or the local clock read once.
pub(crate) fn received_or_now(received_at: Option<NaiveDateTime>) -> NaiveDateTime {
    received_at.unwrap_or_else(|| Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_request_body_deserializes_without_timestamp() {
        let body: LeaveRequestBody = serde_json::from_str(
            r#"{"text": "overnight for 12345 this saturday", "sender": "+27603174174", "channel": "whatsapp"}"#,
        )
        .unwrap();
        assert_eq!(body.channel, Channel::WhatsApp);
        assert!(body.received_at.is_none());
    }

    #[test]
    fn test_explicit_timestamp_is_used() {
        let body: LeaveRequestBody = serde_json::from_str(
            r#"{"text": "x", "sender": "a@b.c", "channel": "email", "received_at": "2025-02-06T10:00:00"}"#,
        )
        .unwrap();
        let (message, now) = body.into_parts();
        assert_eq!(message.channel, Channel::Email);
        assert_eq!(now.to_string(), "2025-02-06 10:00:00");
    }
}

//! Authenticated actors.
//!
//! An [`Identity`] is produced by the policy store when a guardian's contact
//! details authenticate; an [`Administrator`] is the equivalent record for
//! house staff issuing commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The delivery channel a message arrived on.
///
/// The channel decides which contact identifier authenticates the sender:
/// a phone number for WhatsApp, an address for email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Phone-number addressed chat channel.
    #[serde(rename = "whatsapp")]
    WhatsApp,
    /// Email channel.
    #[serde(rename = "email")]
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::WhatsApp => write!(f, "whatsapp"),
            Channel::Email => write!(f, "email"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "whatsapp" | "phone" => Ok(Channel::WhatsApp),
            "email" => Ok(Channel::Email),
            other => Err(format!("unknown channel '{other}' (expected whatsapp or email)")),
        }
    }
}

/// An authenticated guardian.
///
/// Immutable once created; discarded at the end of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque authorization id issued by the store.
    pub auth_id: String,
    /// Channel the guardian authenticated over.
    pub channel: Channel,
    /// The phone number or email address that authenticated.
    pub contact: String,
}

/// An authenticated administrator (housemaster) and the unit they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
    /// Administrator id.
    pub admin_id: String,
    /// The house/unit the administrator is responsible for.
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Channel::WhatsApp).unwrap(), "\"whatsapp\"");
        assert_eq!(serde_json::to_string(&Channel::Email).unwrap(), "\"email\"");
    }

    #[test]
    fn test_channel_from_str_accepts_aliases() {
        assert_eq!("WhatsApp".parse::<Channel>().unwrap(), Channel::WhatsApp);
        assert_eq!("phone".parse::<Channel>().unwrap(), Channel::WhatsApp);
        assert_eq!(" email ".parse::<Channel>().unwrap(), Channel::Email);
        assert!("sms".parse::<Channel>().is_err());
    }
}

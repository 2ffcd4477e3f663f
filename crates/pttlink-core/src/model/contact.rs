// ── Contact domain types ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Kind of roster entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ContactType {
    #[default]
    User,
    Channel,
    Gateway,
    Group,
    Conversation,
}

impl ContactType {
    /// Decode the controller's integer type code. Unknown codes are users.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Channel,
            2 => Self::Gateway,
            3 => Self::Group,
            4 => Self::Conversation,
            _ => Self::User,
        }
    }

    /// Type code sent with select / mute commands.
    pub fn command_code(self) -> i64 {
        match self {
            Self::Channel | Self::Group => 1,
            Self::User | Self::Gateway | Self::Conversation => 0,
        }
    }

    /// Entries that carry member counts rather than a status message.
    pub fn has_members(self) -> bool {
        matches!(self, Self::Channel | Self::Group | Self::Conversation)
    }
}

/// Presence of a roster entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ContactStatus {
    #[default]
    Offline,
    Standby,
    Available,
    Busy,
    Connecting,
}

impl ContactStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Standby,
            2 | 4 | 5 => Self::Available,
            3 => Self::Busy,
            6 => Self::Connecting,
            _ => Self::Offline,
        }
    }

    pub fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// A user, channel, gateway, group or conversation.
///
/// A contact with an empty `name` is the reset value and means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub contact_type: ContactType,
    pub status: ContactStatus,
    /// Users and gateways only.
    pub status_message: Option<String>,
    /// Channels, groups and conversations only.
    pub users_count: u32,
    /// Groups and conversations only.
    pub users_total: u32,
    pub title: Option<String>,
    pub muted: bool,
    pub no_disconnect: bool,
}

impl Contact {
    pub fn new(name: impl Into<String>, contact_type: ContactType) -> Self {
        Self {
            name: name.into(),
            contact_type,
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Best human-facing label: display name, then full name, then name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.full_name.as_deref())
            .unwrap_or(&self.name)
    }
}

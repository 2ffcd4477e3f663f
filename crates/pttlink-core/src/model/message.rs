// ── Message state ──

use serde::{Deserialize, Serialize};

use super::contact::Contact;

/// The message currently being received, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: Contact,
    /// The speaking member when `from` is a channel.
    pub author: Contact,
    pub active: bool,
}

impl InboundMessage {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The message currently being sent, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: Contact,
    pub active: bool,
    /// Set while the channel link is still being established.
    pub connecting: bool,
}

impl OutboundMessage {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Both directions, replaced together so they are never observed out of step.
///
/// At most one of `inbound.active` and `outbound.active` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageState {
    pub inbound: InboundMessage,
    pub outbound: OutboundMessage,
}

// ── Notification-to-snapshot conversions ──
//
// Bridges raw bus extras into `pttlink_core::model` snapshots. A missing
// payload or key never fails; each field falls back to its reset value.

use pttlink_api::Extras;
use pttlink_api::protocol::keys;

use crate::model::{
    AudioRoute, AudioState, Contact, ContactStatus, ContactType, InboundMessage, LastError,
    MessageState, OutboundMessage, SessionState, SignInPhase, Status,
};

// ── Helpers ────────────────────────────────────────────────────────

fn owned(extras: &Extras, key: &str) -> Option<String> {
    extras.get_str(key).map(str::to_owned)
}

/// Non-negative count; negative or oversized values read as 0.
fn count(extras: &Extras, key: &str) -> u32 {
    u32::try_from(extras.get_int(key, 0)).unwrap_or(0)
}

/// Contact fields shared by the message and selection notifications.
fn contact(extras: &Extras) -> Contact {
    Contact {
        name: owned(extras, keys::CONTACT_NAME).unwrap_or_default(),
        full_name: owned(extras, keys::CONTACT_FULL_NAME),
        display_name: owned(extras, keys::CONTACT_DISPLAY_NAME),
        contact_type: ContactType::from_code(extras.get_int(keys::CONTACT_TYPE, -1)),
        status: ContactStatus::from_code(extras.get_int(keys::CONTACT_STATUS, 0)),
        status_message: owned(extras, keys::CONTACT_STATUS_MESSAGE),
        users_count: count(extras, keys::CHANNEL_USERS_COUNT),
        users_total: count(extras, keys::CHANNEL_USERS_TOTAL),
        ..Contact::default()
    }
}

fn author(extras: &Extras) -> Contact {
    Contact {
        name: owned(extras, keys::CHANNEL_AUTHOR_NAME).unwrap_or_default(),
        full_name: owned(extras, keys::CHANNEL_AUTHOR_FULL_NAME),
        display_name: owned(extras, keys::CHANNEL_AUTHOR_DISPLAY_NAME),
        status: ContactStatus::from_code(extras.get_int(keys::CHANNEL_AUTHOR_STATUS, 0)),
        status_message: owned(extras, keys::CHANNEL_AUTHOR_STATUS_MESSAGE),
        ..Contact::default()
    }
}

// ── Session state ──────────────────────────────────────────────────

/// Replace the controller-reported part of `previous`.
///
/// When the controller reports more than one sign-in flag, the
/// transitional one wins: signing out, then signing in, then signed in.
pub(crate) fn session_state(extras: Option<&Extras>, previous: &SessionState) -> SessionState {
    let mut state = previous.clone();
    state.reset();
    let Some(extras) = extras else {
        return state;
    };

    state.phase = if extras.get_bool(keys::STATE_SIGNING_OUT, false) {
        SignInPhase::SigningOut
    } else if extras.get_bool(keys::STATE_SIGNING_IN, false) {
        SignInPhase::SigningIn
    } else if extras.get_bool(keys::STATE_SIGNED_IN, false) {
        SignInPhase::SignedIn
    } else {
        SignInPhase::SignedOut
    };
    state.status = if extras.get_bool(keys::STATE_BUSY, false) {
        Status::Busy
    } else if extras.get_bool(keys::STATE_SOLO, false) {
        Status::Solo
    } else {
        Status::Available
    };

    state.custom_build = extras.get_bool(keys::STATE_CUSTOM_BUILD, false);
    state.configuring = extras.get_bool(keys::STATE_CONFIGURING, false);
    state.locked = extras.get_bool(keys::STATE_LOCKED, false);
    state.cancelling_sign_in = extras.get_bool(keys::STATE_CANCELLING_SIGNIN, false);
    state.reconnect_timer_secs = u32::try_from(extras.get_int(keys::STATE_RECONNECT_TIMER, -1)).ok();
    state.waiting_for_network = extras.get_bool(keys::STATE_WAITING_FOR_NETWORK, false);
    state.show_contacts = extras.get_bool(keys::STATE_SHOW_CONTACTS, false);
    state.auto_run_enabled = extras.get_bool(keys::STATE_AUTO_RUN, false);
    state.channel_auto_connect_enabled = extras.get_bool(keys::STATE_AUTO_CHANNELS, true);
    state.status_message = owned(extras, keys::STATE_STATUS_MESSAGE);
    state.network = owned(extras, keys::STATE_NETWORK);
    state.network_url = owned(extras, keys::STATE_NETWORK_URL);
    state.username = owned(extras, keys::STATE_USERNAME);
    state.last_error = LastError::from_code(extras.get_int(keys::STATE_LAST_ERROR, 0));
    state.external_id = owned(extras, keys::EXTERNAL_ID);
    state
}

// ── Messages ───────────────────────────────────────────────────────

/// Decode a message-state notification.
///
/// Outbound wins when both flags are set. A direction without a contact
/// name is not active.
pub(crate) fn message_state(extras: Option<&Extras>) -> MessageState {
    let Some(extras) = extras else {
        return MessageState::default();
    };
    let mut state = MessageState::default();

    let peer = contact(extras);
    if !peer.is_valid() {
        return state;
    }
    if extras.get_bool(keys::MESSAGE_OUT, false) {
        state.outbound = OutboundMessage {
            to: peer,
            active: true,
            connecting: extras.get_bool(keys::MESSAGE_CONNECTING, false),
        };
    } else if extras.get_bool(keys::MESSAGE_IN, false) {
        state.inbound = InboundMessage {
            from: peer,
            author: author(extras),
            active: true,
        };
    }
    state
}

// ── Selection ──────────────────────────────────────────────────────

/// Decode a selected-contact notification. No name means no selection.
pub(crate) fn selected_contact(extras: Option<&Extras>) -> Contact {
    let Some(extras) = extras else {
        return Contact::default();
    };
    let mut selected = contact(extras);
    if !selected.is_valid() {
        return Contact::default();
    }
    selected.title = owned(extras, keys::CONTACT_TITLE);
    selected.muted = extras.get_int(keys::CONTACT_MUTED, 0) != 0;
    let keep_default = i64::from(selected.contact_type != ContactType::Channel);
    selected.no_disconnect = extras.get_int(keys::CHANNEL_NO_DISCONNECT, keep_default) != 0;
    selected
}

// ── Audio ──────────────────────────────────────────────────────────

pub(crate) fn audio_state(extras: &Extras) -> AudioState {
    AudioState {
        speaker: extras.get_bool(keys::SPEAKER, true),
        earpiece: extras.get_bool(keys::EARPIECE, false),
        bluetooth: extras.get_bool(keys::BLUETOOTH, false),
        wearables: count(extras, keys::WEARABLES),
        route: extras
            .get_str(keys::MODE)
            .map_or(AudioRoute::Speaker, AudioRoute::from_mode),
        changing: extras.get_bool(keys::CHANGING, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_state_replaces_reported_fields() {
        let previous = SessionState {
            available: true,
            locked: true,
            username: Some("old".into()),
            ..SessionState::default()
        };
        let extras = Extras::new()
            .with(keys::STATE_SIGNED_IN, true)
            .with(keys::STATE_USERNAME, "alice")
            .with(keys::STATE_NETWORK, "acme")
            .with(keys::STATE_RECONNECT_TIMER, 12)
            .with(keys::STATE_LAST_ERROR, 2)
            .with(keys::STATE_SOLO, true)
            .with(keys::EXTERNAL_ID, "dev-7");

        let state = session_state(Some(&extras), &previous);
        assert!(state.available);
        assert!(!state.locked);
        assert!(state.is_signed_in());
        assert_eq!(state.username.as_deref(), Some("alice"));
        assert_eq!(state.network.as_deref(), Some("acme"));
        assert!(state.is_reconnecting());
        assert_eq!(state.last_error, LastError::InvalidCredentials);
        assert_eq!(state.status, Status::Solo);
        assert_eq!(state.external_id.as_deref(), Some("dev-7"));
        assert!(state.channel_auto_connect_enabled);
    }

    #[test]
    fn missing_session_payload_resets() {
        let previous = SessionState {
            available: true,
            phase: SignInPhase::SignedIn,
            ..SessionState::default()
        };
        let state = session_state(None, &previous);
        assert!(state.available);
        assert_eq!(state.phase, SignInPhase::SignedOut);
        assert_eq!(state.reconnect_timer_secs, None);
    }

    #[test]
    fn conflicting_sign_in_flags_collapse_to_one_phase() {
        let extras = Extras::new()
            .with(keys::STATE_SIGNED_IN, true)
            .with(keys::STATE_SIGNING_OUT, true);
        let state = session_state(Some(&extras), &SessionState::default());
        assert!(state.is_signing_out());
        assert!(!state.is_signed_in());

        let extras = Extras::new()
            .with(keys::STATE_SIGNED_IN, true)
            .with(keys::STATE_SIGNING_IN, true);
        let state = session_state(Some(&extras), &SessionState::default());
        assert!(state.is_signing_in());
    }

    #[test]
    fn busy_beats_solo() {
        let extras = Extras::new()
            .with(keys::STATE_BUSY, true)
            .with(keys::STATE_SOLO, true);
        let state = session_state(Some(&extras), &SessionState::default());
        assert_eq!(state.status, Status::Busy);
    }

    #[test]
    fn outbound_wins_when_both_directions_flagged() {
        let extras = Extras::new()
            .with(keys::MESSAGE_OUT, true)
            .with(keys::MESSAGE_IN, true)
            .with(keys::MESSAGE_CONNECTING, true)
            .with(keys::CONTACT_NAME, "ops")
            .with(keys::CONTACT_TYPE, 1)
            .with(keys::CHANNEL_USERS_COUNT, 4);
        let state = message_state(Some(&extras));
        assert!(state.outbound.active);
        assert!(state.outbound.connecting);
        assert_eq!(state.outbound.to.contact_type, ContactType::Channel);
        assert_eq!(state.outbound.to.users_count, 4);
        assert_eq!(state.inbound, InboundMessage::default());
    }

    #[test]
    fn inbound_message_carries_author() {
        let extras = Extras::new()
            .with(keys::MESSAGE_IN, true)
            .with(keys::CONTACT_NAME, "ops")
            .with(keys::CONTACT_TYPE, 1)
            .with(keys::CHANNEL_AUTHOR_NAME, "bob")
            .with(keys::CHANNEL_AUTHOR_STATUS, 2);
        let state = message_state(Some(&extras));
        assert!(state.inbound.active);
        assert_eq!(state.inbound.from.name, "ops");
        assert_eq!(state.inbound.author.name, "bob");
        assert_eq!(state.inbound.author.status, ContactStatus::Available);
        assert!(!state.outbound.active);
    }

    #[test]
    fn nameless_message_is_inactive() {
        let extras = Extras::new().with(keys::MESSAGE_IN, true);
        assert_eq!(message_state(Some(&extras)), MessageState::default());
        assert_eq!(message_state(None), MessageState::default());
    }

    #[test]
    fn selected_contact_defaults_no_disconnect_by_type() {
        let user = Extras::new()
            .with(keys::CONTACT_NAME, "alice")
            .with(keys::CONTACT_TYPE, 0)
            .with(keys::CONTACT_MUTED, 1);
        let selected = selected_contact(Some(&user));
        assert!(selected.no_disconnect);
        assert!(selected.muted);

        let channel = Extras::new()
            .with(keys::CONTACT_NAME, "ops")
            .with(keys::CONTACT_TYPE, 1)
            .with(keys::CONTACT_TITLE, "Dispatch");
        let selected = selected_contact(Some(&channel));
        assert!(!selected.no_disconnect);
        assert_eq!(selected.title.as_deref(), Some("Dispatch"));

        let empty = Extras::new().with(keys::CONTACT_TYPE, 1);
        assert_eq!(selected_contact(Some(&empty)), Contact::default());
    }

    #[test]
    fn audio_state_reads_availability_and_mode() {
        let extras = Extras::new()
            .with(keys::EARPIECE, true)
            .with(keys::WEARABLES, 2)
            .with(keys::MODE, "WA1");
        let audio = audio_state(&extras);
        assert!(audio.speaker);
        assert!(audio.earpiece);
        assert!(!audio.bluetooth);
        assert_eq!(audio.wearables, 2);
        assert_eq!(audio.route, AudioRoute::Wearable(1));
        assert!(!audio.changing);
    }
}

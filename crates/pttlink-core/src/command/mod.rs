// ── Command API ──
//
// All outbound operations flow through a unified `Command` enum. The
// session checks each command's gate against the link state, then the
// dispatcher encodes it into a bus broadcast or a launch request.
// Delivery is fire-and-forget; outcomes arrive later as state changes.

mod dispatch;
mod encode;
pub mod requests;

pub(crate) use dispatch::Dispatcher;
pub use encode::password_digest;
pub use requests::{LockRequest, SignInRequest};

use crate::model::{AudioRoute, Contact, ContactPicker, ContactType, Status};

/// How far the link must have progressed before a command may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gate {
    /// A controller identity has been resolved.
    Resolved,
    /// A service binding exists, connected or not.
    Bound,
    /// The service binding is connected.
    Ready,
}

/// Name and kind of a contact a command refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRef {
    pub name: String,
    pub contact_type: ContactType,
}

impl ContactRef {
    pub fn new(name: impl Into<String>, contact_type: ContactType) -> Self {
        Self {
            name: name.into(),
            contact_type,
        }
    }
}

impl From<&Contact> for ContactRef {
    fn from(contact: &Contact) -> Self {
        Self::new(contact.name.clone(), contact.contact_type)
    }
}

/// All operations a host can ask the controller to perform.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Messaging ────────────────────────────────────────────────────
    BeginMessage,
    EndMessage,

    // ── Channels & contacts ──────────────────────────────────────────
    ConnectChannel { name: String },
    DisconnectChannel { name: String },
    Mute { contact: ContactRef, mute: bool },
    /// `None` clears the selection.
    SelectContact(Option<ContactRef>),

    // ── Account ──────────────────────────────────────────────────────
    SignIn(SignInRequest),
    SignOut,
    CancelSignIn,
    Lock(LockRequest),
    Unlock,
    SetStatus(Status),
    SetStatusMessage(String),
    SetAutoRun(bool),
    SetAutoConnectChannels(bool),
    SetExternalId(String),

    // ── Audio ────────────────────────────────────────────────────────
    SetAudioRoute(AudioRoute),

    // ── Link upkeep ──────────────────────────────────────────────────
    StayAwake,

    // ── Controller screens ───────────────────────────────────────────
    OpenMainScreen,
    OpenContactPicker(ContactPicker),
    RequestVitalPermissions,
    ShowMicrophonePermissionDialog,
}

impl Command {
    /// Link state required before this command is delivered.
    ///
    /// `SignIn` is special-cased by the session: before the binding is
    /// ready it is held rather than dropped.
    pub fn gate(&self) -> Gate {
        match self {
            Self::SignIn(_)
            | Self::Lock(_)
            | Self::Unlock
            | Self::SetAutoRun(_)
            | Self::SetAutoConnectChannels(_)
            | Self::SetExternalId(_)
            | Self::StayAwake => Gate::Ready,
            Self::SignOut | Self::CancelSignIn | Self::SetStatus(_) | Self::SetStatusMessage(_) => {
                Gate::Bound
            }
            Self::BeginMessage
            | Self::EndMessage
            | Self::ConnectChannel { .. }
            | Self::DisconnectChannel { .. }
            | Self::Mute { .. }
            | Self::SelectContact(_)
            | Self::SetAudioRoute(_)
            | Self::OpenMainScreen
            | Self::OpenContactPicker(_)
            | Self::RequestVitalPermissions
            | Self::ShowMicrophonePermissionDialog => Gate::Resolved,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginMessage => "begin_message",
            Self::EndMessage => "end_message",
            Self::ConnectChannel { .. } => "connect_channel",
            Self::DisconnectChannel { .. } => "disconnect_channel",
            Self::Mute { .. } => "mute",
            Self::SelectContact(_) => "select_contact",
            Self::SignIn(_) => "sign_in",
            Self::SignOut => "sign_out",
            Self::CancelSignIn => "cancel_sign_in",
            Self::Lock(_) => "lock",
            Self::Unlock => "unlock",
            Self::SetStatus(_) => "set_status",
            Self::SetStatusMessage(_) => "set_status_message",
            Self::SetAutoRun(_) => "set_auto_run",
            Self::SetAutoConnectChannels(_) => "set_auto_connect_channels",
            Self::SetExternalId(_) => "set_external_id",
            Self::SetAudioRoute(_) => "set_audio_route",
            Self::StayAwake => "stay_awake",
            Self::OpenMainScreen => "open_main_screen",
            Self::OpenContactPicker(_) => "open_contact_picker",
            Self::RequestVitalPermissions => "request_vital_permissions",
            Self::ShowMicrophonePermissionDialog => "show_microphone_permission_dialog",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_commands_need_a_ready_link() {
        assert_eq!(Command::Unlock.gate(), Gate::Ready);
        assert_eq!(Command::SetExternalId("x".into()).gate(), Gate::Ready);
        assert_eq!(Command::StayAwake.gate(), Gate::Ready);
        assert_eq!(Command::SignOut.gate(), Gate::Bound);
        assert_eq!(Command::SetStatus(Status::Busy).gate(), Gate::Bound);
        assert_eq!(Command::BeginMessage.gate(), Gate::Resolved);
        assert_eq!(Command::SetAudioRoute(AudioRoute::Earpiece).gate(), Gate::Resolved);
    }

    #[test]
    fn gates_are_ordered() {
        assert!(Gate::Resolved < Gate::Bound);
        assert!(Gate::Bound < Gate::Ready);
    }
}

// ── Wire encoding ──

use md5::{Digest, Md5};
use pttlink_api::protocol::{self, actions, components, keys, values};
use pttlink_api::{Extras, LaunchRequest, Message};
use secrecy::ExposeSecret;

use super::{Command, ContactRef};
use crate::model::{Status, Theme};

/// What a command turns into on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outbound {
    Broadcast(Message),
    Launch(LaunchRequest),
}

/// Per-link encoding context.
pub(crate) struct Target<'a> {
    pub package: &'a str,
    /// Action the picker reports its last selected tab on.
    pub picker_callback: &'a str,
}

/// Lower-case hex MD5 of the password, as the controller expects it.
pub fn password_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

fn with_contact(extras: Extras, contact: &ContactRef) -> Extras {
    extras
        .with(keys::CONTACT_NAME, contact.name.as_str())
        .with(keys::CONTACT_TYPE, contact.contact_type.command_code())
}

impl Command {
    pub(crate) fn encode(&self, target: &Target<'_>) -> Outbound {
        let command = |value: &str| Extras::new().with(keys::COMMAND, value);
        let extras = match self {
            Self::BeginMessage => command(values::BEGIN_MESSAGE),
            Self::EndMessage => command(values::END_MESSAGE),
            Self::ConnectChannel { name } => {
                command(values::CONNECT).with(keys::CONTACT_NAME, name.as_str())
            }
            Self::DisconnectChannel { name } => {
                command(values::DISCONNECT).with(keys::CONTACT_NAME, name.as_str())
            }
            Self::Mute { contact, mute } => with_contact(
                command(if *mute { values::MUTE } else { values::UNMUTE }),
                contact,
            ),
            Self::SelectContact(contact) => match contact {
                Some(contact) if !contact.name.is_empty() => {
                    with_contact(command(values::SELECT_CONTACT), contact)
                }
                _ => command(values::SELECT_CONTACT),
            },
            Self::SignIn(request) => command(values::SIGN_IN)
                .with(keys::NETWORK, request.network.as_str())
                .with(keys::USERNAME, request.username.as_str())
                .with(
                    keys::PASSWORD,
                    password_digest(request.password.expose_secret()),
                )
                .with(keys::PERISHABLE, request.perishable),
            Self::SignOut => command(values::SIGN_OUT),
            Self::CancelSignIn => command(values::CANCEL),
            Self::Lock(request) => {
                let extras =
                    command(values::LOCK).with(keys::APPLICATION, request.application.as_str());
                match &request.package {
                    Some(package) => extras.with(keys::PACKAGE, package.as_str()),
                    None => extras,
                }
            }
            Self::Unlock => command(values::LOCK),
            Self::SetStatus(status) => command(values::SET_STATUS)
                .with(keys::STATE_BUSY, *status == Status::Busy)
                .with(keys::STATE_SOLO, *status == Status::Solo),
            Self::SetStatusMessage(message) => {
                command(values::SET_STATUS).with(keys::STATE_STATUS_MESSAGE, message.as_str())
            }
            Self::SetAutoRun(enabled) => {
                command(values::SET_AUTO_RUN).with(keys::STATE_AUTO_RUN, *enabled)
            }
            Self::SetAutoConnectChannels(enabled) => {
                command(values::SET_AUTO_CHANNELS).with(keys::STATE_AUTO_CHANNELS, *enabled)
            }
            Self::SetExternalId(id) => command(values::SET_EID).with(keys::EXTERNAL_ID, id.as_str()),
            Self::SetAudioRoute(route) => command(values::SET_AUDIO).with(keys::MODE, route.mode()),
            Self::StayAwake => command(values::STAY_AWAKE),
            Self::OpenMainScreen => {
                return Outbound::Launch(LaunchRequest {
                    package: target.package.to_owned(),
                    ..LaunchRequest::default()
                });
            }
            Self::OpenContactPicker(picker) => {
                let mut extras = Extras::new()
                    .with(keys::TABS, picker.tab_list())
                    .with(keys::CALLBACK, target.picker_callback);
                if let Some(title) = &picker.title {
                    extras.insert(keys::TITLE, title.as_str());
                }
                if let Some(tab) = picker.active_tab {
                    extras.insert(keys::TAB, tab.to_string());
                }
                if picker.theme == Theme::Light {
                    extras.insert(keys::THEME, values::LIGHT);
                }
                return Outbound::Launch(LaunchRequest {
                    package: target.package.to_owned(),
                    component: Some(components::CONTACT_PICKER.to_owned()),
                    action: Some(actions::PICK.to_owned()),
                    extras,
                });
            }
            Self::RequestVitalPermissions => {
                return Outbound::Launch(LaunchRequest {
                    package: target.package.to_owned(),
                    component: Some(components::PERMISSIONS.to_owned()),
                    action: None,
                    extras: Extras::new().with(keys::REQUEST_VITAL_PERMISSIONS, true),
                });
            }
            Self::ShowMicrophonePermissionDialog => {
                return Outbound::Launch(LaunchRequest {
                    package: target.package.to_owned(),
                    component: Some(components::PERMISSIONS.to_owned()),
                    action: None,
                    extras: Extras::new()
                        .with(keys::PERMISSION_DIALOG, true)
                        .with(keys::PERMISSION_MICROPHONE, true),
                });
            }
        };
        Outbound::Broadcast(Message::new(
            protocol::action(target.package, actions::COMMAND),
            extras,
        ))
    }
}

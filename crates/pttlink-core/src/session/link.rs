// ── Controller link ──
//
// One resolved controller: its notification receivers, the roster change
// observer, the service binding and the dispatcher for outbound commands.
// Dropping a link unsubscribes from everything it registered and releases
// the binding.

use std::sync::Arc;

use pttlink_api::protocol::{self, actions};
use pttlink_api::{BindingEvent, Extras, Message, Platform, ServiceBinding};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::command::{Command, Dispatcher, Gate};
use crate::discovery::Capabilities;
use crate::error::CoreError;

/// Everything the controller can tell the dispatch task.
#[derive(Debug)]
pub(super) enum Inbound {
    ServiceConnected,
    ServiceDisconnected,
    AppState(Extras),
    MessageState(Extras),
    SelectedContact(Extras),
    AudioState(Extras),
    PermissionError(Extras),
    /// The contact picker reported its last active tab.
    LastTab(Extras),
    RosterChanged,
}

/// Retained notifications found when the receivers were registered.
#[derive(Debug, Default)]
pub(super) struct Sticky {
    pub(super) app_state: Option<Extras>,
    pub(super) message_state: Option<Extras>,
    pub(super) selected: Option<Extras>,
    pub(super) audio: Option<Extras>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkPhase {
    Unbound,
    Connecting,
    Ready,
}

struct Channels {
    app_state: mpsc::UnboundedReceiver<Message>,
    message_state: mpsc::UnboundedReceiver<Message>,
    selected: mpsc::UnboundedReceiver<Message>,
    audio: mpsc::UnboundedReceiver<Message>,
    permissions: mpsc::UnboundedReceiver<Message>,
    picker: mpsc::UnboundedReceiver<Message>,
    roster: mpsc::UnboundedReceiver<()>,
}

pub(super) struct Link {
    platform: Arc<dyn Platform>,
    caps: Capabilities,
    dispatcher: Dispatcher,
    binding: Option<ServiceBinding>,
    phase: LinkPhase,
    channels: Channels,
}

impl Link {
    /// Register every receiver for `caps.package`. The service is not bound
    /// yet; call [`bind`](Self::bind).
    pub(super) fn open(
        platform: &Arc<dyn Platform>,
        caps: Capabilities,
        picker_callback: &str,
    ) -> (Self, Sticky) {
        let package = caps.package.as_str();
        let app_state = platform.register_receiver(&protocol::action(package, actions::APP_STATE));
        let message_state =
            platform.register_receiver(&protocol::action(package, actions::MESSAGE_STATE));
        let selected =
            platform.register_receiver(&protocol::action(package, actions::CONTACT_SELECTED));
        let audio = platform.register_receiver(&protocol::action(package, actions::AUDIO_STATE));
        let permissions =
            platform.register_receiver(&protocol::action(package, actions::PERMISSION_ERRORS));
        let picker = platform.register_receiver(picker_callback);
        let roster = platform.observe(&protocol::roster_address(package));

        let sticky = Sticky {
            app_state: app_state.sticky.map(|m| m.extras),
            message_state: message_state.sticky.map(|m| m.extras),
            selected: selected.sticky.map(|m| m.extras),
            audio: audio.sticky.map(|m| m.extras),
        };
        let dispatcher = Dispatcher::new(
            Arc::clone(platform),
            caps.package.clone(),
            picker_callback.to_owned(),
        );
        let link = Self {
            platform: Arc::clone(platform),
            caps,
            dispatcher,
            binding: None,
            phase: LinkPhase::Unbound,
            channels: Channels {
                app_state: app_state.messages,
                message_state: message_state.messages,
                selected: selected.messages,
                audio: audio.messages,
                permissions: permissions.messages,
                picker: picker.messages,
                roster,
            },
        };
        (link, sticky)
    }

    pub(super) fn package(&self) -> &str {
        &self.caps.package
    }

    pub(super) fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Bind the controller's service. `Connected` arrives later through
    /// [`recv`](Self::recv).
    pub(super) fn bind(&mut self) -> Result<(), CoreError> {
        let binding = self
            .platform
            .bind_service(&self.caps.package, &self.caps.service)?;
        debug!(package = %self.caps.package, service = %self.caps.service, "service bound");
        self.binding = Some(binding);
        self.phase = LinkPhase::Connecting;
        Ok(())
    }

    pub(super) fn on_connected(&mut self) {
        if self.binding.is_some() {
            self.phase = LinkPhase::Ready;
            info!(package = %self.caps.package, "controller service connected");
        }
    }

    /// Forget the binding. A new one is only made by reconnecting.
    pub(super) fn on_disconnected(&mut self) {
        self.binding = None;
        self.phase = LinkPhase::Unbound;
        info!(package = %self.caps.package, "controller service disconnected");
    }

    pub(super) fn satisfies(&self, gate: Gate) -> bool {
        match gate {
            Gate::Resolved => true,
            Gate::Bound => self.phase != LinkPhase::Unbound,
            Gate::Ready => self.phase == LinkPhase::Ready,
        }
    }

    pub(super) fn is_connecting(&self) -> bool {
        self.phase == LinkPhase::Connecting
    }

    pub(super) fn send(&self, command: &Command) {
        self.dispatcher.send(command);
    }

    /// Next inbound event from any source. Pending forever once every
    /// source has closed.
    pub(super) async fn recv(&mut self) -> Inbound {
        let channels = &mut self.channels;
        tokio::select! {
            biased;
            event = binding_event(&mut self.binding) => match event {
                Some(BindingEvent::Connected) => Inbound::ServiceConnected,
                Some(BindingEvent::Disconnected) | None => Inbound::ServiceDisconnected,
            },
            Some(m) = channels.app_state.recv() => Inbound::AppState(m.extras),
            Some(m) = channels.message_state.recv() => Inbound::MessageState(m.extras),
            Some(m) = channels.selected.recv() => Inbound::SelectedContact(m.extras),
            Some(m) = channels.audio.recv() => Inbound::AudioState(m.extras),
            Some(m) = channels.permissions.recv() => Inbound::PermissionError(m.extras),
            Some(m) = channels.picker.recv() => Inbound::LastTab(m.extras),
            Some(()) = channels.roster.recv() => Inbound::RosterChanged,
            else => std::future::pending().await,
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv), same source priority.
    pub(super) fn try_recv(&mut self) -> Option<Inbound> {
        if let Some(binding) = self.binding.as_mut() {
            if let Some(event) = binding.try_next_event() {
                return Some(match event {
                    BindingEvent::Connected => Inbound::ServiceConnected,
                    BindingEvent::Disconnected => Inbound::ServiceDisconnected,
                });
            }
        }
        let channels = &mut self.channels;
        if let Ok(m) = channels.app_state.try_recv() {
            return Some(Inbound::AppState(m.extras));
        }
        if let Ok(m) = channels.message_state.try_recv() {
            return Some(Inbound::MessageState(m.extras));
        }
        if let Ok(m) = channels.selected.try_recv() {
            return Some(Inbound::SelectedContact(m.extras));
        }
        if let Ok(m) = channels.audio.try_recv() {
            return Some(Inbound::AudioState(m.extras));
        }
        if let Ok(m) = channels.permissions.try_recv() {
            return Some(Inbound::PermissionError(m.extras));
        }
        if let Ok(m) = channels.picker.try_recv() {
            return Some(Inbound::LastTab(m.extras));
        }
        channels.roster.try_recv().ok().map(|()| Inbound::RosterChanged)
    }
}

async fn binding_event(binding: &mut Option<ServiceBinding>) -> Option<BindingEvent> {
    match binding {
        Some(binding) => binding.next_event().await,
        None => std::future::pending().await,
    }
}

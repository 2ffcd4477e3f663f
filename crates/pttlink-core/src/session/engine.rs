// ── Dispatch task ──
//
// Owns every piece of mutable session data. Platform events, host
// requests and keep-alive ticks are applied one at a time from a single
// `select!` loop; snapshots are replaced before subscribers are told.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pttlink_api::protocol::{self, keys};
use pttlink_api::{Extras, PackageEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Shared;
use super::link::{Inbound, Link};
use crate::command::{Command, Gate, SignInRequest};
use crate::convert;
use crate::discovery;
use crate::model::{AudioRoute, AudioState, PermissionError, Tab};

/// Shortest keep-alive period the engine will arm.
const MIN_KEEP_ALIVE: Duration = Duration::from_millis(100);

/// Host requests, applied in send order.
pub(super) enum Request {
    Command(Command),
    /// `true` enters power saving, `false` leaves it.
    PowerSaving(bool),
    /// Acknowledged once everything queued before it has been applied.
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

pub(super) struct Engine {
    shared: Arc<Shared>,
    hint: Option<String>,
    cancel: CancellationToken,
    requests: mpsc::UnboundedReceiver<Request>,
    packages: Option<mpsc::UnboundedReceiver<PackageEvent>>,
    link: Option<Link>,
    /// Bumped each time a controller is resolved.
    epoch: u64,
    pending_sign_in: Option<SignInRequest>,
    keep_alive: Option<Interval>,
    /// Out of power saving.
    resumed: bool,
}

impl Engine {
    pub(super) fn new(
        shared: Arc<Shared>,
        hint: Option<String>,
        cancel: CancellationToken,
        requests: mpsc::UnboundedReceiver<Request>,
        packages: mpsc::UnboundedReceiver<PackageEvent>,
    ) -> Self {
        Self {
            shared,
            hint,
            cancel,
            requests,
            packages: Some(packages),
            link: None,
            epoch: 0,
            pending_sign_in: None,
            keep_alive: None,
            resumed: false,
        }
    }

    pub(super) async fn run(mut self) {
        self.establish();
        if self.shared.foreground.load(Ordering::Acquire) {
            self.set_power_saving(false);
        }

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tick(&mut self.keep_alive) => self.on_keep_alive(),
                Some(event) = recv_package(&mut self.packages) => self.on_package_event(&event),
                inbound = recv_link(&mut self.link) => self.on_inbound(inbound),
                request = self.requests.recv() => match request {
                    Some(Request::Command(command)) => self.execute(command),
                    Some(Request::PowerSaving(enabled)) => self.set_power_saving(enabled),
                    Some(Request::Barrier(ack)) => {
                        self.drain();
                        let _ = ack.send(());
                    }
                    Some(Request::Shutdown) | None => break,
                },
            }
        }

        self.shutdown();
    }

    /// Apply every platform event that is already waiting.
    fn drain(&mut self) {
        loop {
            let mut applied = false;
            while let Some(event) = self.packages.as_mut().and_then(|rx| rx.try_recv().ok()) {
                self.on_package_event(&event);
                applied = true;
            }
            while let Some(inbound) = self.link.as_mut().and_then(Link::try_recv) {
                self.on_inbound(inbound);
                applied = true;
            }
            if !applied {
                break;
            }
        }
    }

    // ── Link lifecycle ───────────────────────────────────────────────

    /// Resolve a controller, subscribe to it and start binding its service.
    fn establish(&mut self) {
        let shared = Arc::clone(&self.shared);
        let Some(caps) =
            discovery::discover(&*shared.platform, &shared.config, self.hint.as_deref())
        else {
            info!(hint = ?self.hint, "no compatible controller installed");
            let state = shared.store.modify_session(|s| {
                s.available = false;
                s.initializing = false;
                s.error = false;
            });
            self.shared.subscribers.notify(|s| s.on_app_state_changed(&state));
            return;
        };

        self.epoch += 1;
        info!(
            package = %caps.package,
            service = %caps.service,
            version = caps.version,
            epoch = self.epoch,
            "controller resolved"
        );
        let (mut link, sticky) = Link::open(&shared.platform, caps, &shared.picker_callback);
        shared.store.set_controller(Some(link.capabilities().clone()));
        shared
            .roster
            .attach(protocol::roster_address(link.package()));

        let bound = match link.bind() {
            Ok(()) => true,
            Err(e) => {
                warn!(package = %link.package(), error = %e, "service bind failed");
                false
            }
        };
        shared.store.modify_session(|s| {
            s.available = true;
            s.initializing = bound;
            s.error = !bound;
        });
        self.link = Some(link);

        self.apply_app_state(sticky.app_state.as_ref());
        self.apply_message_state(sticky.message_state.as_ref());
        self.apply_selected(sticky.selected.as_ref());
        if let Some(audio) = &sticky.audio {
            self.apply_audio(audio);
        }
    }

    /// Drop the current link and everything tied to it. Returns whether
    /// there was one.
    fn close_link(&mut self) -> bool {
        self.pending_sign_in = None;
        self.shared.roster.detach();
        self.shared.store.set_controller(None);
        match self.link.take() {
            Some(link) => {
                info!(package = %link.package(), epoch = self.epoch, "link closed");
                true
            }
            None => false,
        }
    }

    fn on_package_event(&mut self, event: &PackageEvent) {
        let relevant = match &self.link {
            Some(link) => event.affects(link.package()),
            None => event
                .packages
                .iter()
                .any(|p| discovery::is_candidate(&self.shared.config, self.hint.as_deref(), p)),
        };
        if !relevant {
            debug!(kind = ?event.kind, packages = ?event.packages, "unrelated package change");
            return;
        }

        info!(kind = ?event.kind, packages = ?event.packages, "controller package changed, reconnecting");
        let had_link = self.close_link();
        self.establish();
        if had_link && self.link.is_none() {
            self.apply_message_state(None);
            self.apply_selected(None);
            self.replace_audio(AudioState::default());
        }
        self.shared.subscribers.notify(|s| s.on_contacts_changed());
    }

    fn shutdown(&mut self) {
        self.close_link();
        self.keep_alive = None;
        self.resumed = false;
        self.packages = None;
        self.shared.store.reset();
        info!("session torn down");
    }

    // ── Inbound ──────────────────────────────────────────────────────

    fn on_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::ServiceConnected => self.on_service_connected(),
            Inbound::ServiceDisconnected => {
                if let Some(link) = self.link.as_mut() {
                    link.on_disconnected();
                }
                if self.pending_sign_in.take().is_some() {
                    debug!("discarding held sign-in");
                }
                let state = self.shared.store.modify_session(|s| s.initializing = false);
                self.shared.subscribers.notify(|s| s.on_app_state_changed(&state));
            }
            Inbound::AppState(extras) => self.apply_app_state(Some(&extras)),
            Inbound::MessageState(extras) => self.apply_message_state(Some(&extras)),
            Inbound::SelectedContact(extras) => self.apply_selected(Some(&extras)),
            Inbound::AudioState(extras) => self.apply_audio(&extras),
            Inbound::PermissionError(extras) => {
                let code = extras.get_int(keys::LATEST_PERMISSION_ERROR, 0);
                match PermissionError::from_code(code) {
                    PermissionError::None => {}
                    PermissionError::MicrophoneNotGranted => self
                        .shared
                        .subscribers
                        .notify(|s| s.on_microphone_permission_not_granted()),
                    PermissionError::Unknown => debug!(code, "ignoring unknown permission error"),
                }
            }
            Inbound::LastTab(extras) => {
                let tab = Tab::from_wire(extras.get_str(keys::TAB));
                debug!(%tab, "contact picker tab reported");
                self.shared
                    .subscribers
                    .notify(|s| s.on_last_contacts_tab_changed(tab));
            }
            Inbound::RosterChanged => {
                self.shared.roster.invalidate();
                self.shared.subscribers.notify(|s| s.on_contacts_changed());
            }
        }
    }

    fn on_service_connected(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        link.on_connected();
        let state = self.shared.store.modify_session(|s| {
            s.initializing = false;
            s.error = false;
        });
        if let Some(request) = self.pending_sign_in.take() {
            debug!(package = %link.package(), "sending held sign-in");
            link.send(&Command::SignIn(request));
        }
        if self.resumed {
            link.send(&Command::StayAwake);
        }
        self.shared.subscribers.notify(|s| s.on_app_state_changed(&state));
    }

    fn apply_app_state(&self, extras: Option<&Extras>) {
        let previous = self.shared.store.session();
        let state = convert::session_state(extras, &previous);
        self.shared.store.replace_session(state.clone());
        self.shared.subscribers.notify(|s| s.on_app_state_changed(&state));
    }

    fn apply_message_state(&self, extras: Option<&Extras>) {
        let messages = convert::message_state(extras);
        self.shared.store.replace_messages(messages.clone());
        self.shared
            .subscribers
            .notify(|s| s.on_message_state_changed(&messages));
    }

    fn apply_selected(&self, extras: Option<&Extras>) {
        let contact = convert::selected_contact(extras);
        self.shared.store.replace_selected(contact.clone());
        self.shared
            .subscribers
            .notify(|s| s.on_selected_contact_changed(&contact));
    }

    fn apply_audio(&self, extras: &Extras) {
        self.replace_audio(convert::audio_state(extras));
    }

    fn replace_audio(&self, audio: AudioState) {
        self.shared.store.replace_audio(audio.clone());
        self.shared.subscribers.notify(|s| s.on_audio_state_changed(&audio));
    }

    // ── Commands ─────────────────────────────────────────────────────

    fn execute(&mut self, command: Command) {
        match command {
            Command::SignIn(request) => self.sign_in(request),
            Command::SignOut | Command::CancelSignIn => {
                self.pending_sign_in = None;
                self.send_gated(&command);
            }
            Command::SetAudioRoute(route) => self.set_audio_route(route),
            command => self.send_gated(&command),
        }
    }

    fn send_gated(&self, command: &Command) {
        match &self.link {
            Some(link) if link.satisfies(command.gate()) => link.send(command),
            Some(link) => debug!(
                command = command.name(),
                gate = ?command.gate(),
                package = %link.package(),
                "link not ready, command dropped"
            ),
            None => debug!(command = command.name(), "no controller, command dropped"),
        }
    }

    /// Sign-ins made while the service is still connecting are held and
    /// sent once it is ready. A newer one replaces the held one.
    fn sign_in(&mut self, request: SignInRequest) {
        match &self.link {
            Some(link) if link.satisfies(Gate::Ready) => link.send(&Command::SignIn(request)),
            Some(link) if link.is_connecting() => {
                debug!(package = %link.package(), "holding sign-in until the service is ready");
                self.pending_sign_in = Some(request);
            }
            _ => debug!("no ready controller, sign-in dropped"),
        }
    }

    fn set_audio_route(&self, route: AudioRoute) {
        let Some(link) = &self.link else {
            debug!(%route, "no controller, audio route change dropped");
            return;
        };
        if !self.shared.store.audio().is_route_available(route) {
            warn!(%route, "audio route not available");
            return;
        }
        let audio = self.shared.store.modify_audio(|a| a.changing = true);
        self.shared.subscribers.notify(|s| s.on_audio_state_changed(&audio));
        link.send(&Command::SetAudioRoute(route));
    }

    // ── Power saving ─────────────────────────────────────────────────

    fn set_power_saving(&mut self, enabled: bool) {
        if enabled {
            self.resumed = false;
            if self.keep_alive.take().is_some() {
                debug!("keep-alive disarmed");
            }
            return;
        }
        if self.resumed {
            return;
        }
        self.resumed = true;
        self.send_gated(&Command::StayAwake);

        let period = self.shared.config.keep_alive_interval.max(MIN_KEEP_ALIVE);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.keep_alive = Some(interval);
        debug!(?period, "keep-alive armed");
    }

    fn on_keep_alive(&self) {
        if self.resumed {
            self.send_gated(&Command::StayAwake);
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn recv_package(
    packages: &mut Option<mpsc::UnboundedReceiver<PackageEvent>>,
) -> Option<PackageEvent> {
    match packages {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_link(link: &mut Option<Link>) -> Inbound {
    match link {
        Some(link) => link.recv().await,
        None => std::future::pending().await,
    }
}

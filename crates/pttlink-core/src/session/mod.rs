// ── Session abstraction ──
//
// Host-facing handle for one logical session with a controller. Every
// command is a non-blocking send to the dispatch task; every getter
// returns a copy of the latest snapshot.

mod engine;
mod link;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pttlink_api::{ContentResolver, Platform};
use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::engine::{Engine, Request};
use crate::audio::Audio;
use crate::command::{Command, ContactRef, LockRequest, SignInRequest};
use crate::config::SessionConfig;
use crate::discovery::Capabilities;
use crate::error::CoreError;
use crate::events::{SessionEvents, SubscriptionId, Subscribers};
use crate::model::{
    AudioRoute, AudioState, Contact, ContactPicker, ContactType, InboundMessage, MessageState,
    OutboundMessage, SessionState, Status,
};
use crate::roster::Roster;
use crate::store::SnapshotStore;
use crate::stream::SnapshotStream;

/// Prefix of the per-session action the contact picker answers on.
const PICKER_CALLBACK_PREFIX: &str = "com.zello.sdk.";

/// State shared between the handle and its dispatch task.
pub(crate) struct Shared {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) config: SessionConfig,
    pub(crate) store: SnapshotStore,
    pub(crate) subscribers: Subscribers,
    pub(crate) roster: Arc<Roster>,
    pub(crate) picker_callback: String,
    /// Host is out of power saving. Outlives any one dispatch task.
    pub(crate) foreground: AtomicBool,
}

struct Running {
    requests: mpsc::UnboundedSender<Request>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct SessionInner {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
    /// Held across `configure` and `unconfigure` so a new dispatch task
    /// never starts while the previous one is still tearing down.
    lifecycle: tokio::sync::Mutex<()>,
}

impl SessionInner {
    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = running.take() {
            running.cancel.cancel();
        }
    }
}

/// A client session with one controller.
///
/// Cheaply cloneable. Construct with [`Session::new`], then call
/// [`configure`](Self::configure) from inside a Tokio runtime. Dropping
/// the last clone stops the dispatch task.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new<P: Platform + 'static>(platform: Arc<P>, config: SessionConfig) -> Self {
        let resolver: Arc<dyn ContentResolver> = platform.clone();
        let platform: Arc<dyn Platform> = platform;
        let picker_callback = format!("{PICKER_CALLBACK_PREFIX}{}", uuid::Uuid::new_v4().simple());
        Self {
            inner: Arc::new(SessionInner {
                shared: Arc::new(Shared {
                    platform,
                    config,
                    store: SnapshotStore::new(),
                    subscribers: Subscribers::default(),
                    roster: Arc::new(Roster::new(resolver)),
                    picker_callback,
                    foreground: AtomicBool::new(false),
                }),
                running: Mutex::new(None),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.shared.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the session.
    ///
    /// `hint` names the controller package to use; `None` falls back to
    /// the configured controller, then to the known builds in order. A
    /// second call before [`unconfigure`](Self::unconfigure) does nothing,
    /// and a call that overlaps an `unconfigure` waits for its teardown.
    /// A host that left power saving before the call gets its keep-alive
    /// back without calling [`leave_power_saving`](Self::leave_power_saving)
    /// again. Returns once discovery has run and any events it triggered
    /// have been applied.
    pub async fn configure(&self, hint: Option<&str>) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        {
            let mut running = self.inner.running();
            if running.is_some() {
                debug!("session already configured");
                return;
            }
            let shared = Arc::clone(&self.inner.shared);
            let hint = hint
                .map(str::to_owned)
                .or_else(|| shared.config.controller.clone());
            let packages = shared.platform.package_events();
            let (requests, rx) = mpsc::unbounded_channel();
            let cancel = CancellationToken::new();
            let engine = Engine::new(shared, hint, cancel.clone(), rx, packages);
            let task = tokio::spawn(engine.run());
            *running = Some(Running {
                requests,
                cancel,
                task,
            });
        }
        info!("session configured");
        self.settled().await;
    }

    /// Tear the session down and reset every snapshot. Safe to call when
    /// not configured.
    pub async fn unconfigure(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        let running = self.inner.running().take();
        let Some(running) = running else {
            return;
        };
        let _ = running.requests.send(Request::Shutdown);
        if let Err(e) = running.task.await {
            warn!(error = %e, "dispatch task ended abnormally");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.running().is_some()
    }

    /// Resolves once every request sent before it, and every platform
    /// event already pending, has been applied.
    pub async fn settled(&self) {
        let (ack, done) = oneshot::channel();
        if self.request(Request::Barrier(ack)) {
            let _ = done.await;
        }
    }

    /// Host moved to the background: stop the keep-alive.
    pub fn enter_power_saving(&self) {
        self.inner.shared.foreground.store(false, Ordering::Release);
        self.request(Request::PowerSaving(true));
    }

    /// Host moved to the foreground: ping now and keep pinging.
    pub fn leave_power_saving(&self) {
        self.inner.shared.foreground.store(true, Ordering::Release);
        self.request(Request::PowerSaving(false));
    }

    fn request(&self, request: Request) -> bool {
        match self.inner.running().as_ref() {
            Some(running) => running.requests.send(request).is_ok(),
            None => false,
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn session_state(&self) -> SessionState {
        self.inner.shared.store.session()
    }

    pub fn messages(&self) -> MessageState {
        self.inner.shared.store.messages()
    }

    pub fn inbound_message(&self) -> InboundMessage {
        self.messages().inbound
    }

    pub fn outbound_message(&self) -> OutboundMessage {
        self.messages().outbound
    }

    pub fn selected_contact(&self) -> Contact {
        self.inner.shared.store.selected()
    }

    pub fn audio_state(&self) -> AudioState {
        self.inner.shared.store.audio()
    }

    /// The controller the session is linked to, if any.
    pub fn controller(&self) -> Option<Capabilities> {
        self.inner.shared.store.controller()
    }

    /// The contact roster. Reads may block on a re-query; see [`Roster`].
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.inner.shared.roster)
    }

    pub fn audio(&self) -> Audio {
        Audio::new(self.clone())
    }

    // ── Streams ──────────────────────────────────────────────────────

    pub fn session_states(&self) -> SnapshotStream<SessionState> {
        self.inner.shared.store.session_stream()
    }

    pub fn message_states(&self) -> SnapshotStream<MessageState> {
        self.inner.shared.store.message_stream()
    }

    pub fn selected_contacts(&self) -> SnapshotStream<Contact> {
        self.inner.shared.store.selected_stream()
    }

    pub fn audio_states(&self) -> SnapshotStream<AudioState> {
        self.inner.shared.store.audio_stream()
    }

    // ── Subscribers ──────────────────────────────────────────────────

    /// Register for change callbacks. May be called from inside a callback.
    pub fn subscribe(&self, subscriber: Arc<dyn SessionEvents>) -> SubscriptionId {
        self.inner.shared.subscribers.add(subscriber)
    }

    /// Returns `false` when `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.shared.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.shared.subscribers.len()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Queue `command` for delivery. Dropped with a log line when the
    /// session is not configured.
    pub fn send(&self, command: Command) {
        let name = command.name();
        if !self.request(Request::Command(command)) {
            debug!(command = name, "session not configured, command dropped");
        }
    }

    pub fn begin_message(&self) {
        self.send(Command::BeginMessage);
    }

    pub fn end_message(&self) {
        self.send(Command::EndMessage);
    }

    pub fn connect_channel(&self, name: &str) -> Result<(), CoreError> {
        let name = non_empty(name, "channel name")?;
        self.send(Command::ConnectChannel { name });
        Ok(())
    }

    pub fn disconnect_channel(&self, name: &str) -> Result<(), CoreError> {
        let name = non_empty(name, "channel name")?;
        self.send(Command::DisconnectChannel { name });
        Ok(())
    }

    /// Ignored for a contact without a name.
    pub fn mute_contact(&self, contact: &Contact, mute: bool) {
        if !contact.is_valid() {
            debug!("mute requested for an unnamed contact, ignored");
            return;
        }
        self.send(Command::Mute {
            contact: ContactRef::from(contact),
            mute,
        });
    }

    /// `None` or an unnamed contact clears the selection.
    pub fn set_selected_contact(&self, contact: Option<&Contact>) {
        let target = contact.filter(|c| c.is_valid()).map(ContactRef::from);
        self.send(Command::SelectContact(target));
    }

    pub fn set_selected_user_or_gateway(&self, name: &str) {
        self.select_by_name(name, ContactType::User);
    }

    pub fn set_selected_channel_or_group(&self, name: &str) {
        self.select_by_name(name, ContactType::Channel);
    }

    fn select_by_name(&self, name: &str, contact_type: ContactType) {
        let target = (!name.is_empty()).then(|| ContactRef::new(name, contact_type));
        self.send(Command::SelectContact(target));
    }

    /// Sign in with a plaintext password. It is digested before it leaves
    /// the process.
    pub fn sign_in(&self, network: &str, username: &str, password: &str) -> Result<(), CoreError> {
        let request = SignInRequest::new(network, username, SecretString::from(password.to_owned()))?;
        self.sign_in_with(request);
        Ok(())
    }

    /// Held until the service is ready when the session is still
    /// connecting; a later sign-in replaces a held one.
    pub fn sign_in_with(&self, request: SignInRequest) {
        self.send(Command::SignIn(request));
    }

    pub fn sign_out(&self) {
        self.send(Command::SignOut);
    }

    pub fn cancel_sign_in(&self) {
        self.send(Command::CancelSignIn);
    }

    /// Lock the controller UI to this host. `package` is what the
    /// controller opens when its locked screen is tapped.
    pub fn lock(&self, application: &str, package: Option<&str>) -> Result<(), CoreError> {
        let request = LockRequest::new(application, package.map(str::to_owned))?;
        self.send(Command::Lock(request));
        Ok(())
    }

    pub fn unlock(&self) {
        self.send(Command::Unlock);
    }

    pub fn set_status(&self, status: Status) {
        self.send(Command::SetStatus(status));
    }

    pub fn set_status_message(&self, message: &str) {
        self.send(Command::SetStatusMessage(message.to_owned()));
    }

    pub fn set_auto_run(&self, enabled: bool) {
        self.send(Command::SetAutoRun(enabled));
    }

    pub fn set_auto_connect_channels(&self, enabled: bool) {
        self.send(Command::SetAutoConnectChannels(enabled));
    }

    pub fn set_external_id(&self, id: &str) {
        self.send(Command::SetExternalId(id.to_owned()));
    }

    /// Ask for a route change. Unavailable routes are refused by the
    /// engine; see [`Audio`] for the negotiation state.
    pub fn set_audio_route(&self, route: AudioRoute) {
        self.send(Command::SetAudioRoute(route));
    }

    pub fn open_main_screen(&self) {
        self.send(Command::OpenMainScreen);
    }

    pub fn open_contact_picker(&self, picker: ContactPicker) -> Result<(), CoreError> {
        if picker.tabs.is_empty() {
            return Err(CoreError::validation("contact picker needs at least one tab"));
        }
        self.send(Command::OpenContactPicker(picker));
        Ok(())
    }

    pub fn request_vital_permissions(&self) {
        self.send(Command::RequestVitalPermissions);
    }

    pub fn show_microphone_permission_dialog(&self) {
        self.send(Command::ShowMicrophonePermissionDialog);
    }
}

fn non_empty(value: &str, what: &str) -> Result<String, CoreError> {
    if value.is_empty() {
        return Err(CoreError::validation(format!("{what} must not be empty")));
    }
    Ok(value.to_owned())
}

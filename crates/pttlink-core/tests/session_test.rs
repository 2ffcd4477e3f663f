#![allow(clippy::unwrap_used)]
// Integration tests for `Session` driven against `LocalPlatform`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use pttlink_api::protocol::{self, actions, keys};
use pttlink_api::{BindPolicy, ContentTable, Extras, LocalPlatform, PackageInfo, Value};
use pttlink_core::{
    AudioRoute, AudioState, Contact, ContactPicker, ContactType, CoreError, MessageState, Session,
    SessionConfig, SessionEvents, SessionState, SignInPhase, Status, Tab, password_digest,
};

// ── Helpers ─────────────────────────────────────────────────────────

const PACKAGE: &str = "net.loudtalks";
const SERVICE: &str = "com.zello.ui.Svc";

fn controller() -> PackageInfo {
    PackageInfo::new(PACKAGE, 1).with_service(SERVICE)
}

fn action(suffix: &str) -> String {
    protocol::action(PACKAGE, suffix)
}

fn setup() -> (Arc<LocalPlatform>, Session) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let platform = Arc::new(LocalPlatform::new());
    let session = Session::new(platform.clone(), SessionConfig::default());
    (platform, session)
}

async fn configured() -> (Arc<LocalPlatform>, Session, Arc<Recorder>) {
    let (platform, session) = setup();
    platform.install(controller());
    session.configure(None).await;
    let recorder = Arc::new(Recorder::default());
    session.subscribe(recorder.clone());
    (platform, session, recorder)
}

fn count(commands: &[String], command: &str) -> usize {
    commands.iter().filter(|c| *c == command).count()
}

/// Subscriber that records every callback in order.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl SessionEvents for Recorder {
    fn on_app_state_changed(&self, _state: &SessionState) {
        self.push("app_state");
    }

    fn on_message_state_changed(&self, _messages: &MessageState) {
        self.push("message_state");
    }

    fn on_selected_contact_changed(&self, _contact: &Contact) {
        self.push("selected");
    }

    fn on_contacts_changed(&self) {
        self.push("contacts");
    }

    fn on_audio_state_changed(&self, _audio: &AudioState) {
        self.push("audio");
    }

    fn on_last_contacts_tab_changed(&self, tab: Tab) {
        self.push(format!("tab:{tab}"));
    }

    fn on_microphone_permission_not_granted(&self) {
        self.push("microphone");
    }
}

/// Subscriber that parks the dispatch task in its first contacts callback
/// until released.
struct Stall {
    armed: AtomicBool,
    entered: tokio::sync::mpsc::UnboundedSender<()>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl SessionEvents for Stall {
    fn on_contacts_changed(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            let _ = self.entered.send(());
            let _ = self.release.lock().unwrap().recv();
        }
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_install_after_configure_resolves_controller() {
    let (platform, session) = setup();
    session.configure(None).await;
    assert!(!session.session_state().available);
    assert_eq!(session.controller(), None);

    platform.install(controller());
    session.settled().await;

    let state = session.session_state();
    assert!(state.available);
    assert!(!state.initializing);
    assert!(!state.error);
    assert_eq!(session.controller().unwrap().package, PACKAGE);
    assert_eq!(platform.active_bindings(), 1);
}

#[tokio::test]
async fn test_hint_for_missing_package_ignores_other_controllers() {
    let (platform, session) = setup();
    session.configure(Some("x")).await;
    assert!(!session.session_state().available);

    platform.install(controller());
    session.settled().await;
    assert!(!session.session_state().available);
    assert_eq!(platform.active_bindings(), 0);
}

#[tokio::test]
async fn test_hinted_controller_installed_later_becomes_available() {
    let (platform, session) = setup();
    session.configure(Some("x")).await;
    assert!(!session.session_state().available);

    platform.install(PackageInfo::new("x", 1).with_service(SERVICE));
    session.settled().await;

    assert!(session.session_state().available);
    assert_eq!(session.controller().unwrap().package, "x");
    assert_eq!(platform.active_bindings(), 1);
}

#[tokio::test]
async fn test_configure_is_idempotent() {
    let (platform, session, _recorder) = configured().await;
    session.configure(None).await;
    assert_eq!(platform.active_bindings(), 1);
    assert_eq!(platform.receiver_count(&action(actions::APP_STATE)), 1);
}

#[tokio::test]
async fn test_bind_refusal_marks_error() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.set_bind_policy(BindPolicy::Refuse);
    session.configure(None).await;

    let state = session.session_state();
    assert!(state.available);
    assert!(state.error);
    assert!(!state.is_available());
}

#[tokio::test]
async fn test_sticky_state_is_applied_on_configure() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.publish_sticky(
        &action(actions::APP_STATE),
        Extras::new()
            .with(keys::STATE_SIGNED_IN, true)
            .with(keys::STATE_USERNAME, "alice"),
    );
    session.configure(None).await;

    let state = session.session_state();
    assert!(state.available);
    assert!(state.is_signed_in());
    assert_eq!(state.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_unconfigure_resets_everything() {
    let (platform, session) = setup();
    session.unconfigure().await;

    platform.install(controller());
    session.configure(None).await;
    platform.publish(
        &action(actions::CONTACT_SELECTED),
        Extras::new().with(keys::CONTACT_NAME, "alice"),
    );
    session.settled().await;
    assert!(session.selected_contact().is_valid());

    session.unconfigure().await;
    assert!(!session.is_configured());
    assert_eq!(session.session_state(), SessionState::default());
    assert_eq!(session.selected_contact(), Contact::default());
    assert_eq!(platform.active_bindings(), 0);
    assert_eq!(platform.receiver_count(&action(actions::APP_STATE)), 0);
    assert!(!session.roster().is_attached());

    session.configure(None).await;
    assert!(session.session_state().available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_configure_during_teardown_waits_for_it() {
    let (platform, session) = setup();
    platform.install(controller());
    session.configure(None).await;

    let (entered_tx, mut entered) = tokio::sync::mpsc::unbounded_channel();
    let (release, release_rx) = mpsc::channel();
    session.subscribe(Arc::new(Stall {
        armed: AtomicBool::new(true),
        entered: entered_tx,
        release: Mutex::new(release_rx),
    }));
    platform.notify_changed(&protocol::roster_address(PACKAGE));
    entered.recv().await.unwrap();

    let stopping = tokio::spawn({
        let session = session.clone();
        async move { session.unconfigure().await }
    });
    while session.is_configured() {
        tokio::task::yield_now().await;
    }
    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        release.send(()).unwrap();
    });

    session.configure(None).await;
    stopping.await.unwrap();
    releaser.join().unwrap();

    assert!(session.is_configured());
    assert!(session.session_state().available);
    assert!(session.roster().is_attached());
    assert_eq!(session.controller().unwrap().package, PACKAGE);
    assert_eq!(platform.active_bindings(), 1);
}

// ── State synchronization ───────────────────────────────────────────

#[tokio::test]
async fn test_select_contact_round_trip() {
    let (platform, session, recorder) = configured().await;
    platform.take_sent();

    session.set_selected_user_or_gateway("alice");
    session.settled().await;

    let sent = platform.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].action, action(actions::COMMAND));
    assert_eq!(sent[0].extras.get_str(keys::COMMAND), Some("SELECT_CONTACT"));
    assert_eq!(sent[0].extras.get_str(keys::CONTACT_NAME), Some("alice"));
    assert_eq!(sent[0].extras.get(keys::CONTACT_TYPE), Some(&Value::Int(0)));
    // Nothing changes until the controller confirms.
    assert!(!session.selected_contact().is_valid());

    platform.publish(
        &action(actions::CONTACT_SELECTED),
        Extras::new()
            .with(keys::CONTACT_NAME, "alice")
            .with(keys::CONTACT_TYPE, 0),
    );
    session.settled().await;

    let selected = session.selected_contact();
    assert!(selected.is_valid());
    assert_eq!(selected.name, "alice");
    assert_eq!(selected.contact_type, ContactType::User);
    assert_eq!(recorder.count("selected"), 1);
}

#[tokio::test]
async fn test_notifications_replace_instead_of_merging() {
    let (platform, session, recorder) = configured().await;

    platform.publish(
        &action(actions::MESSAGE_STATE),
        Extras::new()
            .with(keys::CONTACT_NAME, "ops")
            .with(keys::CONTACT_TYPE, 1)
            .with(keys::MESSAGE_IN, true)
            .with(keys::CHANNEL_AUTHOR_NAME, "bob"),
    );
    session.settled().await;
    let inbound = session.inbound_message();
    assert!(inbound.active);
    assert_eq!(inbound.from.name, "ops");
    assert_eq!(inbound.author.name, "bob");

    // No contact name: nothing is active any more.
    platform.publish(
        &action(actions::MESSAGE_STATE),
        Extras::new().with(keys::MESSAGE_IN, true),
    );
    session.settled().await;
    assert_eq!(session.messages(), MessageState::default());
    assert_eq!(recorder.count("message_state"), 2);
}

#[tokio::test]
async fn test_sign_in_phases_are_exclusive() {
    let (platform, session, _recorder) = configured().await;

    platform.publish(
        &action(actions::APP_STATE),
        Extras::new()
            .with(keys::STATE_SIGNED_IN, true)
            .with(keys::STATE_SIGNING_OUT, true),
    );
    session.settled().await;

    let state = session.session_state();
    assert_eq!(state.phase, SignInPhase::SigningOut);
    assert!(state.is_signing_out());
    assert!(!state.is_signed_in());
    assert!(!state.is_signing_in());
    // Engine-owned fields survive the replacement.
    assert!(state.available);
}

#[tokio::test]
async fn test_subscribers_are_notified_in_order() {
    let (platform, session, first) = configured().await;
    let second = Arc::new(Recorder::default());
    let id = session.subscribe(second.clone());
    assert_eq!(session.subscriber_count(), 2);

    platform.publish(&action(actions::APP_STATE), Extras::new());
    session.settled().await;
    assert_eq!(first.events(), vec!["app_state".to_owned()]);
    assert_eq!(second.events(), vec!["app_state".to_owned()]);

    assert!(session.unsubscribe(id));
    assert_eq!(session.subscriber_count(), 1);
    platform.publish(&action(actions::APP_STATE), Extras::new());
    session.settled().await;
    assert_eq!(first.count("app_state"), 2);
    assert_eq!(second.count("app_state"), 1);
}

// ── Sign-in and gating ──────────────────────────────────────────────

#[tokio::test]
async fn test_pending_sign_in_flushed_once_with_latest_credentials() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.set_bind_policy(BindPolicy::Manual);
    session.configure(None).await;
    assert!(session.session_state().initializing);

    session.sign_in("acme", "alice", "first").unwrap();
    session.sign_in("acme", "bob", "second").unwrap();
    session.settled().await;
    assert_eq!(count(&platform.sent_commands(), "SIGN_IN"), 0);

    assert_eq!(platform.complete_bindings(), 1);
    session.settled().await;
    assert!(!session.session_state().initializing);

    let sent = platform.sent();
    let sign_ins: Vec<_> = sent
        .iter()
        .filter(|m| m.extras.get_str(keys::COMMAND) == Some("SIGN_IN"))
        .collect();
    assert_eq!(sign_ins.len(), 1);
    assert_eq!(sign_ins[0].extras.get_str(keys::NETWORK), Some("acme"));
    assert_eq!(sign_ins[0].extras.get_str(keys::USERNAME), Some("bob"));
    assert_eq!(
        sign_ins[0].extras.get_str(keys::PASSWORD),
        Some(password_digest("second").as_str())
    );

    // Losing the service does not resend it.
    platform.drop_bindings();
    session.settled().await;
    assert_eq!(count(&platform.sent_commands(), "SIGN_IN"), 1);
}

#[tokio::test]
async fn test_unconfigure_before_ready_discards_pending_sign_in() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.set_bind_policy(BindPolicy::Manual);
    session.configure(None).await;

    session.sign_in("acme", "alice", "secret").unwrap();
    session.unconfigure().await;

    assert_eq!(platform.complete_bindings(), 0);
    assert_eq!(count(&platform.sent_commands(), "SIGN_IN"), 0);
}

#[tokio::test]
async fn test_sign_out_clears_pending_sign_in() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.set_bind_policy(BindPolicy::Manual);
    session.configure(None).await;

    session.sign_in("acme", "alice", "secret").unwrap();
    session.sign_out();
    platform.complete_bindings();
    session.settled().await;

    let commands = platform.sent_commands();
    assert_eq!(count(&commands, "SIGN_IN"), 0);
    assert_eq!(count(&commands, "SIGN_OUT"), 1);
}

#[tokio::test]
async fn test_account_commands_wait_for_a_ready_link() {
    let (platform, session) = setup();
    platform.install(controller());
    platform.set_bind_policy(BindPolicy::Manual);
    session.configure(None).await;

    session.lock("Dispatch", Some("com.example.dispatch")).unwrap();
    session.set_status(Status::Busy);
    session.begin_message();
    session.settled().await;
    assert_eq!(
        platform.sent_commands(),
        vec!["SET_STATUS".to_owned(), "BEGIN_MESSAGE".to_owned()]
    );

    platform.complete_bindings();
    session.settled().await;
    session.lock("Dispatch", Some("com.example.dispatch")).unwrap();
    session.settled().await;

    let sent = platform.sent();
    let lock = sent.last().unwrap();
    assert_eq!(lock.extras.get_str(keys::COMMAND), Some("LOCK"));
    assert_eq!(lock.extras.get_str(keys::APPLICATION), Some("Dispatch"));
    assert_eq!(lock.extras.get_str(keys::PACKAGE), Some("com.example.dispatch"));
}

#[tokio::test]
async fn test_commands_without_controller_are_dropped() {
    let (platform, session) = setup();
    session.begin_message();
    session.configure(None).await;
    session.begin_message();
    session.settled().await;
    assert!(platform.sent().is_empty());
}

#[test]
fn test_validation_errors() {
    let (_platform, session) = setup();
    assert!(matches!(
        session.connect_channel(""),
        Err(CoreError::ValidationFailed { .. })
    ));
    assert!(session.disconnect_channel("").is_err());
    assert!(session.sign_in("", "alice", "secret").is_err());
    assert!(session.sign_in("acme", "alice", "").is_err());
    assert!(session.lock("", None).is_err());
    let picker = ContactPicker {
        tabs: Vec::new(),
        ..ContactPicker::default()
    };
    assert!(session.open_contact_picker(picker).is_err());
    assert!(session.connect_channel("ops").is_ok());
}

// ── Package lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_package_removal_resets_session() {
    let (platform, session, recorder) = configured().await;
    platform.publish(
        &action(actions::CONTACT_SELECTED),
        Extras::new().with(keys::CONTACT_NAME, "alice"),
    );
    session.settled().await;

    platform.uninstall(PACKAGE);
    session.settled().await;

    assert!(!session.session_state().available);
    assert!(!session.selected_contact().is_valid());
    assert_eq!(session.controller(), None);
    assert_eq!(platform.active_bindings(), 0);
    assert_eq!(recorder.count("contacts"), 1);
    assert!(!session.roster().is_attached());
}

#[tokio::test]
async fn test_package_upgrade_reconnects() {
    let (platform, session, recorder) = configured().await;
    let address = protocol::roster_address(PACKAGE);
    platform.set_table(&address, ContentTable::new(["name"]).with_row(["alice"]));
    assert_eq!(session.roster().count(), 1);

    platform.install(PackageInfo::new(PACKAGE, 2).with_service(SERVICE));
    session.settled().await;

    let state = session.session_state();
    assert!(state.available);
    assert!(!state.initializing);
    assert_eq!(session.controller().unwrap().version, 2);
    assert_eq!(platform.active_bindings(), 1);
    assert_eq!(recorder.count("contacts"), 1);

    assert_eq!(session.roster().count(), 1);
    assert_eq!(platform.query_count(&address), 2);
}

#[tokio::test]
async fn test_unrelated_package_changes_are_ignored() {
    let (platform, session, recorder) = configured().await;
    platform.install(PackageInfo::new("com.example.other", 1));
    session.settled().await;
    assert!(recorder.events().is_empty());
    assert_eq!(platform.active_bindings(), 1);
}

// ── Roster ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_roster_requeried_once_after_change() {
    let (platform, session, recorder) = configured().await;
    let address = protocol::roster_address(PACKAGE);
    platform.set_table(
        &address,
        ContentTable::new(["name", "type"]).with_row([Value::from("alice"), Value::from(0)]),
    );
    let roster = session.roster();
    assert_eq!(roster.count(), 1);
    assert_eq!(platform.query_count(&address), 1);

    platform.set_table(
        &address,
        ContentTable::new(["name", "type"])
            .with_row([Value::from("alice"), Value::from(0)])
            .with_row([Value::from("ops"), Value::from(1)]),
    );
    platform.notify_changed(&address);
    session.settled().await;
    assert_eq!(recorder.count("contacts"), 1);
    // The re-query waits for the next read.
    assert_eq!(platform.query_count(&address), 1);

    assert_eq!(roster.count(), 2);
    assert_eq!(roster.item(1).unwrap().contact_type, ContactType::Channel);
    assert_eq!(platform.query_count(&address), 2);
}

// ── Audio ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_audio_route_negotiation() {
    let (platform, session, recorder) = configured().await;
    platform.publish(
        &action(actions::AUDIO_STATE),
        Extras::new()
            .with(keys::SPEAKER, true)
            .with(keys::EARPIECE, true)
            .with(keys::MODE, "SP"),
    );
    session.settled().await;
    let audio = session.audio();
    assert!(audio.is_route_available(AudioRoute::Earpiece));
    assert!(!audio.is_changing());
    platform.take_sent();

    audio.set_mode(AudioRoute::Earpiece);
    session.settled().await;
    assert!(audio.is_changing());
    let sent = platform.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].extras.get_str(keys::COMMAND), Some("SET_AUDIO"));
    assert_eq!(sent[0].extras.get_str(keys::MODE), Some("EP"));

    platform.publish(
        &action(actions::AUDIO_STATE),
        Extras::new()
            .with(keys::SPEAKER, true)
            .with(keys::EARPIECE, true)
            .with(keys::MODE, "EP"),
    );
    session.settled().await;
    assert!(!audio.is_changing());
    assert_eq!(audio.mode(), AudioRoute::Earpiece);
    assert_eq!(recorder.count("audio"), 3);
}

#[tokio::test]
async fn test_unavailable_audio_route_is_refused() {
    let (platform, session, _recorder) = configured().await;
    platform.take_sent();

    let audio = session.audio();
    audio.set_mode(AudioRoute::Bluetooth);
    audio.set_wearable_mode(0);
    session.settled().await;

    assert!(!audio.is_changing());
    assert!(platform.sent().is_empty());
}

// ── Keep-alive ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_keep_alive_runs_only_outside_power_saving() {
    let (platform, session, _recorder) = configured().await;
    let stay_awake = || count(&platform.sent_commands(), "STAY_AWAKE");

    session.leave_power_saving();
    session.settled().await;
    assert_eq!(stay_awake(), 1);

    tokio::time::advance(Duration::from_secs(3)).await;
    session.settled().await;
    assert_eq!(stay_awake(), 2);

    // Already armed: no extra ping, no second timer.
    session.leave_power_saving();
    session.settled().await;
    assert_eq!(stay_awake(), 2);
    tokio::time::advance(Duration::from_secs(3)).await;
    session.settled().await;
    assert_eq!(stay_awake(), 3);

    session.enter_power_saving();
    session.settled().await;
    tokio::time::advance(Duration::from_secs(10)).await;
    session.settled().await;
    assert_eq!(stay_awake(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_survives_reconfigure() {
    let (platform, session, _recorder) = configured().await;
    let stay_awake = || count(&platform.sent_commands(), "STAY_AWAKE");

    session.leave_power_saving();
    session.settled().await;
    assert_eq!(stay_awake(), 1);

    session.unconfigure().await;
    session.configure(None).await;
    assert_eq!(stay_awake(), 2);

    tokio::time::advance(Duration::from_secs(3)).await;
    session.settled().await;
    assert_eq!(stay_awake(), 3);
}

// ── Controller screens ──────────────────────────────────────────────

#[tokio::test]
async fn test_contact_picker_reports_last_tab() {
    let (platform, session, recorder) = configured().await;
    session
        .open_contact_picker(ContactPicker {
            title: Some("Pick".into()),
            active_tab: Some(Tab::Users),
            ..ContactPicker::default()
        })
        .unwrap();
    session.settled().await;

    let launches = platform.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(
        launches[0].extras.get_str(keys::TABS),
        Some("RECENTS,USERS,CHANNELS")
    );
    let callback = launches[0].extras.get_str(keys::CALLBACK).unwrap().to_owned();

    platform.publish(&callback, Extras::new().with(keys::TAB, "CHANNELS"));
    session.settled().await;
    assert_eq!(recorder.events(), vec!["tab:CHANNELS".to_owned()]);
}

#[tokio::test]
async fn test_microphone_permission_error_is_reported() {
    let (platform, session, recorder) = configured().await;
    platform.publish(
        &action(actions::PERMISSION_ERRORS),
        Extras::new().with(keys::LATEST_PERMISSION_ERROR, 1),
    );
    platform.publish(
        &action(actions::PERMISSION_ERRORS),
        Extras::new().with(keys::LATEST_PERMISSION_ERROR, 7),
    );
    session.settled().await;
    assert_eq!(recorder.events(), vec!["microphone".to_owned()]);

    session.request_vital_permissions();
    session.show_microphone_permission_dialog();
    session.settled().await;
    assert_eq!(platform.launches().len(), 2);
}

// ── Streams ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_streams_follow_snapshots() {
    let (platform, session, _recorder) = configured().await;
    let mut selected = session.selected_contacts().into_stream();
    assert_eq!(selected.next().await, Some(Contact::default()));

    platform.publish(
        &action(actions::CONTACT_SELECTED),
        Extras::new().with(keys::CONTACT_NAME, "alice"),
    );
    session.settled().await;
    assert_eq!(selected.next().await.unwrap().name, "alice");

    let mut states = session.session_states();
    platform.publish(
        &action(actions::APP_STATE),
        Extras::new().with(keys::STATE_SIGNING_IN, true),
    );
    let state = states.changed().await.unwrap();
    assert_eq!(state.phase, SignInPhase::SigningIn);
    assert_eq!(states.current().phase, SignInPhase::SigningIn);
}

// ── Snapshot store ──
//
// Latest value of each notification class, held in `watch` channels.
// Only the dispatch task writes; any thread may read a clone or
// subscribe to changes. Every write notifies, even when the new value
// equals the old one.

use tokio::sync::watch;

use crate::discovery::Capabilities;
use crate::model::{AudioState, Contact, MessageState, SessionState};
use crate::stream::SnapshotStream;

pub(crate) struct SnapshotStore {
    session: watch::Sender<SessionState>,
    messages: watch::Sender<MessageState>,
    selected: watch::Sender<Contact>,
    audio: watch::Sender<AudioState>,
    controller: watch::Sender<Option<Capabilities>>,
}

impl SnapshotStore {
    pub(crate) fn new() -> Self {
        Self {
            session: watch::Sender::new(SessionState::default()),
            messages: watch::Sender::new(MessageState::default()),
            selected: watch::Sender::new(Contact::default()),
            audio: watch::Sender::new(AudioState::default()),
            controller: watch::Sender::new(None),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub(crate) fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }

    pub(crate) fn messages(&self) -> MessageState {
        self.messages.borrow().clone()
    }

    pub(crate) fn selected(&self) -> Contact {
        self.selected.borrow().clone()
    }

    pub(crate) fn audio(&self) -> AudioState {
        self.audio.borrow().clone()
    }

    pub(crate) fn controller(&self) -> Option<Capabilities> {
        self.controller.borrow().clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub(crate) fn session_stream(&self) -> SnapshotStream<SessionState> {
        SnapshotStream::new(self.session.subscribe())
    }

    pub(crate) fn message_stream(&self) -> SnapshotStream<MessageState> {
        SnapshotStream::new(self.messages.subscribe())
    }

    pub(crate) fn selected_stream(&self) -> SnapshotStream<Contact> {
        SnapshotStream::new(self.selected.subscribe())
    }

    pub(crate) fn audio_stream(&self) -> SnapshotStream<AudioState> {
        SnapshotStream::new(self.audio.subscribe())
    }

    // ── Writes (dispatch task only) ──────────────────────────────────

    /// Apply `f` to the session snapshot and return the result.
    pub(crate) fn modify_session(&self, f: impl FnOnce(&mut SessionState)) -> SessionState {
        self.session.send_modify(f);
        self.session()
    }

    pub(crate) fn replace_session(&self, state: SessionState) {
        self.session.send_replace(state);
    }

    pub(crate) fn replace_messages(&self, messages: MessageState) {
        self.messages.send_replace(messages);
    }

    pub(crate) fn replace_selected(&self, contact: Contact) {
        self.selected.send_replace(contact);
    }

    pub(crate) fn modify_audio(&self, f: impl FnOnce(&mut AudioState)) -> AudioState {
        self.audio.send_modify(f);
        self.audio()
    }

    pub(crate) fn replace_audio(&self, audio: AudioState) {
        self.audio.send_replace(audio);
    }

    pub(crate) fn set_controller(&self, caps: Option<Capabilities>) {
        self.controller.send_replace(caps);
    }

    /// Back to defaults, as on teardown.
    pub(crate) fn reset(&self) {
        self.set_controller(None);
        self.replace_session(SessionState::default());
        self.replace_messages(MessageState::default());
        self.replace_selected(Contact::default());
        self.replace_audio(AudioState::default());
    }
}

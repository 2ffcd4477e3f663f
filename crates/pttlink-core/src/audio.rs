// ── Audio route negotiator ──
//
// Route changes are requests: the controller answers with a new audio
// notification, which clears `changing`. A second request while one is in
// flight is not blocked; hosts are expected to consult `is_changing`.

use crate::model::{AudioRoute, AudioState};
use crate::session::Session;
use crate::stream::SnapshotStream;

/// View of a session's audio routing.
#[derive(Clone)]
pub struct Audio {
    session: Session,
}

impl Audio {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn state(&self) -> AudioState {
        self.session.audio_state()
    }

    /// Route currently in use.
    pub fn mode(&self) -> AudioRoute {
        self.state().route
    }

    pub fn is_changing(&self) -> bool {
        self.state().changing
    }

    pub fn is_route_available(&self, route: AudioRoute) -> bool {
        self.state().is_route_available(route)
    }

    pub fn wearable_count(&self) -> u32 {
        self.state().wearables
    }

    /// Request `route`. Refused when the last notification did not report
    /// it as available.
    pub fn set_mode(&self, route: AudioRoute) {
        self.session.set_audio_route(route);
    }

    pub fn set_wearable_mode(&self, index: u32) {
        self.set_mode(AudioRoute::Wearable(index));
    }

    pub fn changes(&self) -> SnapshotStream<AudioState> {
        self.session.audio_states()
    }
}

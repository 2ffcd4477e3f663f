// ── Change notifications ──
//
// Hosts implement `SessionEvents` and register it with a session. Every
// callback runs on the session's dispatch task, one at a time, after the
// matching snapshot has been replaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::model::{AudioState, Contact, MessageState, SessionState, Tab};

/// Host callbacks. Every method has an empty default.
pub trait SessionEvents: Send + Sync {
    fn on_app_state_changed(&self, _state: &SessionState) {}

    fn on_message_state_changed(&self, _messages: &MessageState) {}

    fn on_selected_contact_changed(&self, _contact: &Contact) {}

    /// The roster changed; re-read it through `Session::roster`.
    fn on_contacts_changed(&self) {}

    fn on_audio_state_changed(&self, _audio: &AudioState) {}

    /// The contact picker reported the tab it was last showing.
    fn on_last_contacts_tab_changed(&self, _tab: Tab) {}

    fn on_microphone_permission_not_granted(&self) {}
}

/// Handle returned by `Session::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Entry = (SubscriptionId, Arc<dyn SessionEvents>);

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    entries: ArcSwap<Vec<Entry>>,
}

/// Copy-on-write subscriber list shared by the session handle and its
/// dispatch task.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    registry: Arc<Registry>,
}

impl Subscribers {
    pub(crate) fn add(&self, subscriber: Arc<dyn SessionEvents>) -> SubscriptionId {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.registry.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push((id, Arc::clone(&subscriber)));
            next
        });
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let previous = self.registry.entries.rcu(|current| {
            current
                .iter()
                .filter(|(entry, _)| *entry != id)
                .cloned()
                .collect::<Vec<Entry>>()
        });
        previous.iter().any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.entries.load().len()
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.registry.entries.load().iter().any(|(entry, _)| *entry == id)
    }

    /// Invoke `f` on every subscriber registered when the fan-out starts.
    ///
    /// Membership is re-checked before each call, so a subscriber removed
    /// by an earlier callback is skipped.
    pub(crate) fn notify(&self, f: impl Fn(&dyn SessionEvents)) {
        let snapshot = self.registry.entries.load_full();
        for (id, subscriber) in snapshot.iter() {
            if self.contains(*id) {
                f(subscriber.as_ref());
            }
        }
    }
}

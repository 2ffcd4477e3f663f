// ── Roster cache ──
//
// Lazily-queried view over the controller's contact list. The cursor is
// opened on first read after an invalidation and reused until the next
// one. Reads may come from any thread; the query itself runs without the
// lock held, and a result that was superseded while in flight is dropped.
// Readers that arrive while a query for the current source is in flight
// wait for it instead of reading the empty slot.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use pttlink_api::protocol::columns;
use pttlink_api::{ContentResolver, Cursor};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Contact, ContactStatus, ContactType};

/// Column positions resolved once per cursor.
#[derive(Debug, Clone, Copy)]
struct Columns {
    name: Option<usize>,
    full_name: Option<usize>,
    display_name: Option<usize>,
    status_message: Option<usize>,
    contact_type: Option<usize>,
    status: Option<usize>,
    users_count: Option<usize>,
    users_total: Option<usize>,
    title: Option<usize>,
    muted: Option<usize>,
    no_disconnect: Option<usize>,
}

impl Columns {
    fn resolve(cursor: &dyn Cursor) -> Self {
        Self {
            name: cursor.column_index(columns::NAME),
            full_name: cursor.column_index(columns::FULL_NAME),
            display_name: cursor.column_index(columns::DISPLAY_NAME),
            status_message: cursor.column_index(columns::STATUS_MESSAGE),
            contact_type: cursor.column_index(columns::TYPE),
            status: cursor.column_index(columns::STATUS),
            users_count: cursor.column_index(columns::USERS_COUNT),
            users_total: cursor.column_index(columns::USERS_TOTAL),
            title: cursor.column_index(columns::TITLE),
            muted: cursor.column_index(columns::MUTED),
            no_disconnect: cursor.column_index(columns::NO_DISCONNECT),
        }
    }
}

/// An open query result.
struct QueryHandle {
    cursor: Box<dyn Cursor>,
    columns: Columns,
}

impl QueryHandle {
    fn new(cursor: Box<dyn Cursor>) -> Self {
        let columns = Columns::resolve(cursor.as_ref());
        Self { cursor, columns }
    }

    fn count(&self) -> Result<usize, CoreError> {
        Ok(self.cursor.count()?)
    }

    fn text(&self, row: usize, column: Option<usize>) -> Result<Option<String>, CoreError> {
        let Some(column) = column else {
            return Ok(None);
        };
        Ok(self.cursor.get_str(row, column)?.filter(|s| !s.is_empty()))
    }

    fn int(&self, row: usize, column: Option<usize>) -> Result<Option<i64>, CoreError> {
        column
            .map(|c| self.cursor.get_int(row, c))
            .transpose()
            .map_err(CoreError::from)
    }

    fn count_at(&self, row: usize, column: Option<usize>) -> Result<u32, CoreError> {
        Ok(self
            .int(row, column)?
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0))
    }

    fn contact(&self, row: usize) -> Result<Option<Contact>, CoreError> {
        if row >= self.count()? {
            return Ok(None);
        }
        let Some(name) = self.text(row, self.columns.name)? else {
            return Ok(None);
        };
        let contact_type = ContactType::from_code(self.int(row, self.columns.contact_type)?.unwrap_or(0));
        let mut contact = Contact {
            name,
            full_name: self.text(row, self.columns.full_name)?,
            display_name: self.text(row, self.columns.display_name)?,
            contact_type,
            status: ContactStatus::from_code(self.int(row, self.columns.status)?.unwrap_or(0)),
            title: self.text(row, self.columns.title)?,
            muted: self.int(row, self.columns.muted)?.unwrap_or(0) != 0,
            ..Contact::default()
        };
        match contact_type {
            ContactType::User | ContactType::Gateway => {
                contact.status_message = self.text(row, self.columns.status_message)?;
            }
            ContactType::Channel => {
                contact.users_count = self.count_at(row, self.columns.users_count)?;
            }
            ContactType::Group | ContactType::Conversation => {
                contact.users_count = self.count_at(row, self.columns.users_count)?;
                contact.users_total = self.count_at(row, self.columns.users_total)?;
            }
        }
        contact.no_disconnect = !contact_type.has_members()
            || self.int(row, self.columns.no_disconnect)?.is_some_and(|v| v != 0);
        Ok(Some(contact))
    }
}

#[derive(Default)]
struct RosterState {
    address: Option<String>,
    /// Bumped whenever the roster is attached or detached.
    generation: u64,
    /// Sequence number of the last query issued.
    issued: u64,
    stale: bool,
    /// Generation of the query currently running, if any.
    in_flight: Option<u64>,
    handle: Option<QueryHandle>,
}

impl RosterState {
    fn querying(&self) -> bool {
        self.in_flight == Some(self.generation)
    }
}

/// The controller's contact list.
pub struct Roster {
    resolver: Arc<dyn ContentResolver>,
    state: Mutex<RosterState>,
    settled: Condvar,
}

impl Roster {
    pub(crate) fn new(resolver: Arc<dyn ContentResolver>) -> Self {
        Self {
            resolver,
            state: Mutex::new(RosterState::default()),
            settled: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RosterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock once no query for the current source is running.
    fn lock_settled(&self) -> MutexGuard<'_, RosterState> {
        self.settled
            .wait_while(self.lock(), |state| state.querying())
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the roster at a content source. The first read will query it.
    pub(crate) fn attach(&self, address: String) {
        let mut state = self.lock();
        debug!(%address, "roster attached");
        state.address = Some(address);
        state.generation += 1;
        state.stale = true;
        state.handle = None;
    }

    /// Release the cursor and forget the source.
    pub(crate) fn detach(&self) {
        let mut state = self.lock();
        state.address = None;
        state.generation += 1;
        state.stale = false;
        state.handle = None;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().address.is_some()
    }

    /// Mark the cached result stale. The next read re-queries exactly once.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        if state.address.is_some() {
            state.stale = true;
        }
    }

    pub fn count(&self) -> usize {
        self.requery();
        let state = self.lock_settled();
        let Some(handle) = &state.handle else {
            return 0;
        };
        handle.count().unwrap_or_else(|e| {
            warn!(error = %e, "roster count failed");
            0
        })
    }

    /// Contact at `index`, or `None` when out of range or unreadable.
    pub fn item(&self, index: usize) -> Option<Contact> {
        self.requery();
        let state = self.lock_settled();
        let handle = state.handle.as_ref()?;
        handle.contact(index).unwrap_or_else(|e| {
            warn!(index, error = %e, "roster item unreadable");
            None
        })
    }

    /// Every readable contact, in roster order.
    pub fn contacts(&self) -> Vec<Contact> {
        self.requery();
        let state = self.lock_settled();
        let Some(handle) = &state.handle else {
            return Vec::new();
        };
        let count = handle.count().unwrap_or_else(|e| {
            warn!(error = %e, "roster count failed");
            0
        });
        (0..count)
            .filter_map(|row| {
                handle.contact(row).unwrap_or_else(|e| {
                    warn!(index = row, error = %e, "roster item unreadable");
                    None
                })
            })
            .collect()
    }

    /// [`contacts`](Self::contacts) on the blocking pool, for async hosts.
    pub async fn load(self: Arc<Self>) -> Vec<Contact> {
        match tokio::task::spawn_blocking(move || self.contacts()).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "roster load task failed");
                Vec::new()
            }
        }
    }

    /// Re-open the cursor if the cache is stale.
    fn requery(&self) {
        let (address, ticket, generation) = {
            let mut state = self.lock_settled();
            if !state.stale {
                return;
            }
            let Some(address) = state.address.clone() else {
                return;
            };
            state.stale = false;
            state.handle = None;
            state.issued += 1;
            state.in_flight = Some(state.generation);
            (address, state.issued, state.generation)
        };

        let result = self.resolver.query(&address);

        let mut state = self.lock();
        if state.in_flight == Some(generation) {
            state.in_flight = None;
        }
        self.settled.notify_all();
        if state.generation != generation || state.issued != ticket {
            debug!(%address, "discarding superseded roster query");
            return;
        }
        match result {
            Ok(cursor) => state.handle = Some(QueryHandle::new(cursor)),
            Err(e) => warn!(%address, error = %CoreError::from(e), "roster query failed"),
        }
    }
}

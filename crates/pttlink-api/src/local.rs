// ── In-process platform ──
//
// A complete `Platform` that lives in memory. Hosts without a real
// controller bus use it as the reference implementation; tests drive it
// to play the controller's side of the conversation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::Error;
use crate::extras::{Extras, Message, Value};
use crate::platform::{
    BindingEvent, Broadcasts, ContentResolver, Cursor, LaunchRequest, Launcher, PackageEvent,
    PackageEventKind, PackageInfo, PackageManager, Receiver, ServiceBinding, ServiceConnector,
};
use crate::protocol::keys;

/// How [`LocalPlatform`] answers service binding requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindPolicy {
    /// Bind and report `Connected` right away.
    #[default]
    Accept,
    /// Fail the bind call.
    Refuse,
    /// Bind, but hold `Connected` until [`LocalPlatform::complete_bindings`].
    Manual,
}

/// A static result set served by the content resolver.
///
/// Cells are typed values; there is no null cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ContentTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Snapshot cursor over a [`ContentTable`].
struct TableCursor {
    table: ContentTable,
}

impl TableCursor {
    fn cell(&self, row: usize, column: usize) -> Result<&Value, Error> {
        let count = self.table.rows.len();
        let cells = self
            .table
            .rows
            .get(row)
            .ok_or(Error::RowOutOfRange { row, count })?;
        cells.get(column).ok_or(Error::ColumnOutOfRange(column))
    }
}

impl Cursor for TableCursor {
    fn count(&self) -> Result<usize, Error> {
        Ok(self.table.rows.len())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.table.columns.iter().position(|c| c == name)
    }

    fn get_str(&self, row: usize, column: usize) -> Result<Option<String>, Error> {
        match self.cell(row, column)? {
            Value::Str(s) => Ok(Some(s.clone())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::StrList(_) => Err(Error::ColumnType {
                column,
                expected: "a string",
            }),
        }
    }

    fn get_int(&self, row: usize, column: usize) -> Result<i64, Error> {
        match self.cell(row, column)? {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Str(s) => s.trim().parse().map_err(|_| Error::ColumnType {
                column,
                expected: "an integer",
            }),
            Value::StrList(_) => Err(Error::ColumnType {
                column,
                expected: "an integer",
            }),
        }
    }
}

struct Binding {
    package: String,
    events: mpsc::UnboundedSender<BindingEvent>,
    token: CancellationToken,
    connected: bool,
}

impl Binding {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.events.is_closed()
    }
}

#[derive(Default)]
struct LocalState {
    packages: BTreeMap<String, PackageInfo>,
    package_listeners: Vec<mpsc::UnboundedSender<PackageEvent>>,
    sticky: HashMap<String, Message>,
    sent: Vec<Message>,
    launches: Vec<LaunchRequest>,
    bind_policy: BindPolicy,
    bindings: Vec<Binding>,
    tables: HashMap<String, ContentTable>,
    observers: HashMap<String, Vec<mpsc::UnboundedSender<()>>>,
    queries: HashMap<String, usize>,
    failing: HashSet<String>,
}

impl LocalState {
    fn emit_package_event(&mut self, kind: PackageEventKind, package: &str) {
        let event = PackageEvent {
            kind,
            packages: vec![package.to_owned()],
        };
        self.package_listeners
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn prune_bindings(&mut self) {
        self.bindings.retain(Binding::is_live);
    }
}

/// In-memory [`Platform`](crate::Platform).
#[derive(Default)]
pub struct LocalPlatform {
    receivers: DashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
    state: Mutex<LocalState>,
}

impl LocalPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Packages ─────────────────────────────────────────────────────

    /// Install (or replace) a package and announce it.
    pub fn install(&self, info: PackageInfo) {
        let package = info.package.clone();
        let mut state = self.state();
        let kind = if state
            .packages
            .insert(package.to_ascii_lowercase(), info)
            .is_some()
        {
            PackageEventKind::Replaced
        } else {
            PackageEventKind::Installed
        };
        debug!(package = %package, ?kind, "package change");
        state.emit_package_event(kind, &package);
    }

    /// Remove a package, dropping any service connections into it.
    pub fn uninstall(&self, package: &str) {
        let mut state = self.state();
        if state
            .packages
            .remove(&package.to_ascii_lowercase())
            .is_none()
        {
            return;
        }
        for binding in &mut state.bindings {
            if binding.connected && binding.package.eq_ignore_ascii_case(package) {
                binding.connected = false;
                let _ = binding.events.send(BindingEvent::Disconnected);
            }
        }
        debug!(package, "package removed");
        state.emit_package_event(PackageEventKind::Removed, package);
    }

    // ── Service binding ──────────────────────────────────────────────

    pub fn set_bind_policy(&self, policy: BindPolicy) {
        self.state().bind_policy = policy;
    }

    /// Report `Connected` on every live binding still waiting for it.
    pub fn complete_bindings(&self) -> usize {
        let mut state = self.state();
        state.prune_bindings();
        let mut completed = 0;
        for binding in state.bindings.iter_mut().filter(|b| !b.connected) {
            binding.connected = true;
            if binding.events.send(BindingEvent::Connected).is_ok() {
                completed += 1;
            }
        }
        completed
    }

    /// Simulate the controller's service going away.
    pub fn drop_bindings(&self) -> usize {
        let mut state = self.state();
        state.prune_bindings();
        let mut dropped = 0;
        for binding in state.bindings.iter_mut().filter(|b| b.connected) {
            binding.connected = false;
            if binding.events.send(BindingEvent::Disconnected).is_ok() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Bindings the client still holds.
    pub fn active_bindings(&self) -> usize {
        let mut state = self.state();
        state.prune_bindings();
        state.bindings.len()
    }

    // ── Bus ──────────────────────────────────────────────────────────

    /// Deliver a message to every live receiver of `action`.
    pub fn publish(&self, action: &str, extras: Extras) {
        self.deliver(&Message::new(action, extras));
    }

    /// Deliver and retain as the sticky value for `action`.
    pub fn publish_sticky(&self, action: &str, extras: Extras) {
        let message = Message::new(action, extras);
        self.state()
            .sticky
            .insert(action.to_owned(), message.clone());
        self.deliver(&message);
    }

    pub fn clear_sticky(&self, action: &str) {
        self.state().sticky.remove(action);
    }

    fn deliver(&self, message: &Message) {
        if let Some(mut senders) = self.receivers.get_mut(&message.action) {
            senders.retain(|tx| tx.send(message.clone()).is_ok());
            trace!(action = %message.action, receivers = senders.len(), "delivered");
        }
    }

    pub fn receiver_count(&self, action: &str) -> usize {
        self.receivers
            .get(action)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Every broadcast the client has sent, oldest first.
    pub fn sent(&self) -> Vec<Message> {
        self.state().sent.clone()
    }

    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut self.state().sent)
    }

    /// The `COMMAND` value of every broadcast sent so far.
    pub fn sent_commands(&self) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter_map(|m| m.extras.get_str(keys::COMMAND).map(str::to_owned))
            .collect()
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.state().launches.clone()
    }

    // ── Content ──────────────────────────────────────────────────────

    pub fn set_table(&self, address: &str, table: ContentTable) {
        self.state().tables.insert(address.to_owned(), table);
    }

    /// Tell observers of `address` that its content changed.
    pub fn notify_changed(&self, address: &str) {
        if let Some(observers) = self.state().observers.get_mut(address) {
            observers.retain(|tx| tx.send(()).is_ok());
        }
    }

    pub fn fail_queries(&self, address: &str, fail: bool) {
        let mut state = self.state();
        if fail {
            state.failing.insert(address.to_owned());
        } else {
            state.failing.remove(address);
        }
    }

    pub fn query_count(&self, address: &str) -> usize {
        self.state().queries.get(address).copied().unwrap_or(0)
    }

    pub fn observer_count(&self, address: &str) -> usize {
        self.state()
            .observers
            .get(address)
            .map_or(0, |o| o.iter().filter(|tx| !tx.is_closed()).count())
    }
}

impl PackageManager for LocalPlatform {
    fn package_info(&self, package: &str) -> Option<PackageInfo> {
        self.state()
            .packages
            .get(&package.to_ascii_lowercase())
            .cloned()
    }

    fn package_events(&self) -> mpsc::UnboundedReceiver<PackageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().package_listeners.push(tx);
        rx
    }
}

impl Broadcasts for LocalPlatform {
    fn send_broadcast(&self, message: Message) -> Result<(), Error> {
        debug!(action = %message.action, "broadcast");
        self.state().sent.push(message.clone());
        self.deliver(&message);
        Ok(())
    }

    fn register_receiver(&self, action: &str) -> Receiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.receivers.entry(action.to_owned()).or_default().push(tx);
        Receiver {
            sticky: self.state().sticky.get(action).cloned(),
            messages: rx,
        }
    }
}

impl ServiceConnector for LocalPlatform {
    fn bind_service(&self, package: &str, service: &str) -> Result<ServiceBinding, Error> {
        let mut state = self.state();
        let info = state
            .packages
            .get(&package.to_ascii_lowercase())
            .ok_or_else(|| Error::PackageNotFound(package.to_owned()))?;
        if !info.exports(service) || state.bind_policy == BindPolicy::Refuse {
            return Err(Error::BindRefused {
                package: package.to_owned(),
                service: service.to_owned(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let connected = state.bind_policy == BindPolicy::Accept;
        if connected {
            let _ = tx.send(BindingEvent::Connected);
        }
        state.prune_bindings();
        state.bindings.push(Binding {
            package: package.to_owned(),
            events: tx,
            token: token.clone(),
            connected,
        });
        debug!(package, service, connected, "service bound");
        Ok(ServiceBinding::new(rx, token))
    }
}

impl ContentResolver for LocalPlatform {
    fn query(&self, address: &str) -> Result<Box<dyn Cursor>, Error> {
        let mut state = self.state();
        *state.queries.entry(address.to_owned()).or_default() += 1;
        if state.failing.contains(address) {
            return Err(Error::Query {
                address: address.to_owned(),
                message: "content source unavailable".into(),
            });
        }
        let table = state.tables.get(address).cloned().unwrap_or_default();
        Ok(Box::new(TableCursor { table }))
    }

    fn observe(&self, address: &str) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state()
            .observers
            .entry(address.to_owned())
            .or_default()
            .push(tx);
        rx
    }
}

impl Launcher for LocalPlatform {
    fn launch(&self, request: LaunchRequest) -> Result<(), Error> {
        let mut state = self.state();
        let Some(info) = state.packages.get(&request.package.to_ascii_lowercase()) else {
            return Err(Error::Launch {
                package: request.package,
                message: "package not installed".into(),
            });
        };
        debug!(package = %info.package, component = ?request.component, "launch");
        state.launches.push(request);
        Ok(())
    }
}

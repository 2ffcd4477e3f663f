// ── Host platform seams ──
//
// Everything the client needs from its host: package lookup, the
// broadcast bus, service binding, content queries and activity launch.
// Subscriptions are values; dropping a receiver or binding unsubscribes.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::extras::{Extras, Message};

// ── Packages ────────────────────────────────────────────────────────

/// What the host knows about one installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub package: String,
    pub version: u32,
    /// Fully-qualified service names exported by the package.
    pub services: Vec<String>,
    /// Static metadata declared by the package.
    pub metadata: Extras,
}

impl PackageInfo {
    pub fn new(package: impl Into<String>, version: u32) -> Self {
        Self {
            package: package.into(),
            version,
            ..Self::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.services.push(service.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<crate::Value>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn exports(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageEventKind {
    Installed,
    Replaced,
    Removed,
}

/// Install / replace / uninstall notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEvent {
    pub kind: PackageEventKind,
    pub packages: Vec<String>,
}

impl PackageEvent {
    /// Package identities compare case-insensitively.
    pub fn affects(&self, package: &str) -> bool {
        self.packages.iter().any(|p| p.eq_ignore_ascii_case(package))
    }
}

pub trait PackageManager: Send + Sync {
    fn package_info(&self, package: &str) -> Option<PackageInfo>;

    /// Subscribe to install / replace / uninstall events.
    fn package_events(&self) -> mpsc::UnboundedReceiver<PackageEvent>;
}

// ── Broadcast bus ───────────────────────────────────────────────────

/// A live subscription to one action.
///
/// `sticky` holds the last sticky message for the action at registration
/// time, if the bus retains one.
#[derive(Debug)]
pub struct Receiver {
    pub sticky: Option<Message>,
    pub messages: mpsc::UnboundedReceiver<Message>,
}

pub trait Broadcasts: Send + Sync {
    fn send_broadcast(&self, message: Message) -> Result<(), Error>;

    fn register_receiver(&self, action: &str) -> Receiver;
}

// ── Service binding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingEvent {
    Connected,
    Disconnected,
}

/// A long-lived binding to the controller's service.
///
/// The binding is released when this value is dropped or [`unbind`] is
/// called; the host observes release through the shared token.
///
/// [`unbind`]: ServiceBinding::unbind
#[derive(Debug)]
pub struct ServiceBinding {
    events: mpsc::UnboundedReceiver<BindingEvent>,
    token: CancellationToken,
}

impl ServiceBinding {
    pub fn new(events: mpsc::UnboundedReceiver<BindingEvent>, token: CancellationToken) -> Self {
        Self { events, token }
    }

    pub async fn next_event(&mut self) -> Option<BindingEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<BindingEvent> {
        self.events.try_recv().ok()
    }

    pub fn is_released(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn unbind(self) {
        drop(self);
    }
}

impl Drop for ServiceBinding {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub trait ServiceConnector: Send + Sync {
    fn bind_service(&self, package: &str, service: &str) -> Result<ServiceBinding, Error>;
}

// ── Content queries ─────────────────────────────────────────────────

/// Row-oriented view over a query result.
pub trait Cursor: Send {
    fn count(&self) -> Result<usize, Error>;

    fn column_index(&self, name: &str) -> Option<usize>;

    /// `Ok(None)` for a null cell.
    fn get_str(&self, row: usize, column: usize) -> Result<Option<String>, Error>;

    fn get_int(&self, row: usize, column: usize) -> Result<i64, Error>;
}

pub trait ContentResolver: Send + Sync {
    fn query(&self, address: &str) -> Result<Box<dyn Cursor>, Error>;

    /// Subscribe to change notifications for `address`.
    fn observe(&self, address: &str) -> mpsc::UnboundedReceiver<()>;
}

// ── Launch ──────────────────────────────────────────────────────────

/// Request to bring up a controller screen.
///
/// `component: None` opens the package's main screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub package: String,
    pub component: Option<String>,
    pub action: Option<String>,
    pub extras: Extras,
}

pub trait Launcher: Send + Sync {
    fn launch(&self, request: LaunchRequest) -> Result<(), Error>;
}

// ── Bundle ──────────────────────────────────────────────────────────

/// Everything a session needs from its host.
pub trait Platform:
    PackageManager + Broadcasts + ServiceConnector + ContentResolver + Launcher
{
}

impl<T> Platform for T where
    T: PackageManager + Broadcasts + ServiceConnector + ContentResolver + Launcher
{
}

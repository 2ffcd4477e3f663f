// pttlink-core: Session engine between pttlink-api and push-to-talk host applications.

pub mod audio;
pub mod command;
pub mod config;
mod convert;
pub mod discovery;
pub mod error;
pub mod events;
pub mod model;
pub mod roster;
pub mod session;
mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use audio::Audio;
pub use command::{Command, ContactRef, Gate, LockRequest, SignInRequest, password_digest};
pub use config::{KnownController, SessionConfig};
pub use discovery::{Capabilities, discover};
pub use error::CoreError;
pub use events::{SessionEvents, SubscriptionId};
pub use roster::Roster;
pub use session::Session;
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use model::{
    AudioRoute, AudioState, Contact, ContactPicker, ContactStatus, ContactType, InboundMessage,
    LastError, MessageState, OutboundMessage, PermissionError, SessionState, SignInPhase, Status,
    Tab, Theme,
};

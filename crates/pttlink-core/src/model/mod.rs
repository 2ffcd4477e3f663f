// ── Snapshot model ──
//
// Plain value types describing what the controller last reported. Every
// type here is cheap to clone and has a well-defined "reset" value that
// hosts see before the first notification arrives.

pub mod audio;
pub mod contact;
pub mod message;
pub mod picker;
pub mod state;

// ── Re-exports ──────────────────────────────────────────────────────

pub use audio::{AudioRoute, AudioState};
pub use contact::{Contact, ContactStatus, ContactType};
pub use message::{InboundMessage, MessageState, OutboundMessage};
pub use picker::{ContactPicker, Tab, Theme};
pub use state::{LastError, PermissionError, SessionState, SignInPhase, Status};

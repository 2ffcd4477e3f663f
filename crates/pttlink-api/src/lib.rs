// pttlink-api: Bus vocabulary and host platform seams for a push-to-talk controller

pub mod error;
pub mod extras;
pub mod local;
pub mod platform;
pub mod protocol;

pub use error::Error;
pub use extras::{Extras, Message, Value};
pub use local::{BindPolicy, ContentTable, LocalPlatform};
pub use platform::{
    BindingEvent, Broadcasts, ContentResolver, Cursor, LaunchRequest, Launcher, PackageEvent,
    PackageEventKind, PackageInfo, PackageManager, Platform, Receiver, ServiceBinding,
    ServiceConnector,
};

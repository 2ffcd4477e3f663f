// ── Session state ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Where the account is in its sign-in lifecycle.
///
/// One value, so "signed in", "signing in" and "signing out" can never be
/// observed together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum SignInPhase {
    #[default]
    SignedOut,
    SigningIn,
    SignedIn,
    SigningOut,
}

/// User availability as set by the host or the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Status {
    #[default]
    Available,
    Solo,
    Busy,
}

/// Last sign-in / connection failure reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum LastError {
    #[default]
    None,
    Unknown,
    InvalidCredentials,
    InvalidNetworkName,
    NetworkSuspended,
    ServerSecureConnectFailed,
    ServerSignInFailed,
    NetworkSignInFailed,
    Kicked,
    AppUpdateRequired,
    NoInternetConnection,
    InternetConnectionRestricted,
    ServerLicenseProblem,
    TooManySignInAttempts,
    UnreliableConnection,
    DeviceIdMismatch,
}

impl LastError {
    /// Decode the controller's error code. Negative codes mean "no error";
    /// codes past the known range are `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            i64::MIN..=0 => Self::None,
            1 => Self::Unknown,
            2 => Self::InvalidCredentials,
            3 => Self::InvalidNetworkName,
            4 => Self::NetworkSuspended,
            5 => Self::ServerSecureConnectFailed,
            6 => Self::ServerSignInFailed,
            7 => Self::NetworkSignInFailed,
            8 => Self::Kicked,
            9 => Self::AppUpdateRequired,
            10 => Self::NoInternetConnection,
            11 => Self::InternetConnectionRestricted,
            12 => Self::ServerLicenseProblem,
            13 => Self::TooManySignInAttempts,
            14 => Self::UnreliableConnection,
            15 => Self::DeviceIdMismatch,
            _ => Self::Unknown,
        }
    }
}

/// Latest permission problem reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionError {
    #[default]
    None,
    MicrophoneNotGranted,
    Unknown,
}

impl PermissionError {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::None,
            1 => Self::MicrophoneNotGranted,
            _ => Self::Unknown,
        }
    }
}

/// Snapshot of the controller's session state.
///
/// `available`, `initializing` and `error` are owned by the client: they
/// describe discovery and the service binding and are carried over when a
/// controller notification replaces the rest of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionState {
    // ── Client-owned ──
    pub available: bool,
    pub initializing: bool,
    pub error: bool,

    // ── Controller-reported ──
    pub custom_build: bool,
    pub configuring: bool,
    pub locked: bool,
    pub phase: SignInPhase,
    pub cancelling_sign_in: bool,
    /// Seconds until the next reconnect attempt, when one is scheduled.
    pub reconnect_timer_secs: Option<u32>,
    pub waiting_for_network: bool,
    pub show_contacts: bool,
    pub status: Status,
    pub status_message: Option<String>,
    pub network: Option<String>,
    pub network_url: Option<String>,
    pub username: Option<String>,
    pub last_error: LastError,
    pub auto_run_enabled: bool,
    pub channel_auto_connect_enabled: bool,
    pub external_id: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            available: false,
            initializing: false,
            error: false,
            custom_build: false,
            configuring: false,
            locked: false,
            phase: SignInPhase::SignedOut,
            cancelling_sign_in: false,
            reconnect_timer_secs: None,
            waiting_for_network: false,
            show_contacts: false,
            status: Status::Available,
            status_message: None,
            network: None,
            network_url: None,
            username: None,
            last_error: LastError::None,
            auto_run_enabled: false,
            channel_auto_connect_enabled: true,
            external_id: None,
        }
    }
}

impl SessionState {
    /// A compatible controller is installed and the binding has not failed.
    pub fn is_available(&self) -> bool {
        self.available && !self.error
    }

    pub fn is_signed_in(&self) -> bool {
        self.phase == SignInPhase::SignedIn
    }

    pub fn is_signing_in(&self) -> bool {
        self.phase == SignInPhase::SigningIn
    }

    pub fn is_signing_out(&self) -> bool {
        self.phase == SignInPhase::SigningOut
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnect_timer_secs.is_some_and(|secs| secs > 0)
    }

    /// Reset everything the controller reports, keeping client-owned fields.
    pub fn reset(&mut self) {
        *self = Self {
            available: self.available,
            initializing: self.initializing,
            error: self.error,
            ..Self::default()
        };
    }
}

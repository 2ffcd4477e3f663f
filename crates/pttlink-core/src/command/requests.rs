// ── Command request types ──
//
// Typed, validated payloads for the commands that take more than a flag.

use secrecy::{ExposeSecret, SecretString};

use crate::error::CoreError;

/// Credentials for a sign-in.
///
/// The password stays in memory only as a secret; it is digested when the
/// command is encoded.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub network: String,
    pub username: String,
    pub password: SecretString,
    /// Do not persist the account on the controller.
    pub perishable: bool,
}

impl SignInRequest {
    /// Build a request; every field must be non-empty.
    pub fn new(
        network: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, CoreError> {
        let network = network.into();
        let username = username.into();
        if network.is_empty() {
            return Err(CoreError::validation("network must not be empty"));
        }
        if username.is_empty() {
            return Err(CoreError::validation("username must not be empty"));
        }
        if password.expose_secret().is_empty() {
            return Err(CoreError::validation("password must not be empty"));
        }
        Ok(Self {
            network,
            username,
            password,
            perishable: false,
        })
    }

    pub fn perishable(mut self, perishable: bool) -> Self {
        self.perishable = perishable;
        self
    }
}

/// Lock the controller UI to a single host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub application: String,
    /// Package the controller should open when its UI is tapped.
    pub package: Option<String>,
}

impl LockRequest {
    pub fn new(application: impl Into<String>, package: Option<String>) -> Result<Self, CoreError> {
        let application = application.into();
        if application.is_empty() {
            return Err(CoreError::validation("application name must not be empty"));
        }
        Ok(Self {
            application,
            package: package.filter(|p| !p.is_empty()),
        })
    }
}

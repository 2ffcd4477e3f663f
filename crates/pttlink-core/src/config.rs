// ── Session configuration ──
//
// Describes which controllers to look for and how to keep the link warm.
// Core never reads config files; `pttlink-config` builds a
// `SessionConfig` and hands it in.

use std::time::Duration;

/// A controller build the client knows how to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownController {
    pub package: String,
    /// Require the capability marker in the package metadata.
    pub requires_marker: bool,
    /// Oldest acceptable package version.
    pub min_version: u32,
}

impl KnownController {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            requires_marker: false,
            min_version: 0,
        }
    }

    pub fn with_marker(mut self) -> Self {
        self.requires_marker = true;
        self
    }
}

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Controller package to use instead of walking `known_controllers`.
    pub controller: Option<String>,
    /// Candidates tried in order when no hint is given.
    pub known_controllers: Vec<KnownController>,
    /// Service names tried in order inside a candidate package.
    pub service_names: Vec<String>,
    /// Metadata key that flags a package as exposing the client protocol.
    pub capability_marker: String,
    /// Period of the stay-awake command while out of power saving.
    pub keep_alive_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            controller: None,
            known_controllers: vec![
                KnownController::new("com.loudtalks").with_marker(),
                KnownController::new("net.loudtalks"),
                KnownController::new("com.pttsdk"),
            ],
            service_names: vec![
                "com.zello.ui.Svc".into(),
                "com.loudtalks.client.ui.Svc".into(),
            ],
            capability_marker: "com.zello.SDK".into(),
            keep_alive_interval: Duration::from_secs(3),
        }
    }
}

use std::sync::Arc;

use pttlink_api::Platform;
use tracing::{debug, warn};

use super::Command;
use super::encode::{Outbound, Target};
use crate::error::CoreError;

/// Delivers encoded commands to one resolved controller.
pub(crate) struct Dispatcher {
    platform: Arc<dyn Platform>,
    package: String,
    picker_callback: String,
}

impl Dispatcher {
    pub(crate) fn new(platform: Arc<dyn Platform>, package: String, picker_callback: String) -> Self {
        Self {
            platform,
            package,
            picker_callback,
        }
    }

    /// Encode and hand `command` to the host. Failures are logged, never returned.
    pub(crate) fn send(&self, command: &Command) {
        if let Err(e) = self.deliver(command) {
            warn!(command = command.name(), error = %e, "command delivery failed");
        }
    }

    fn deliver(&self, command: &Command) -> Result<(), CoreError> {
        let target = Target {
            package: &self.package,
            picker_callback: &self.picker_callback,
        };
        match command.encode(&target) {
            Outbound::Broadcast(message) => self.platform.send_broadcast(message)?,
            Outbound::Launch(request) => self.platform.launch(request)?,
        }
        debug!(command = command.name(), package = %self.package, "command sent");
        Ok(())
    }
}

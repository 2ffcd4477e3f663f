// ── Audio routing ──

use std::fmt;

use serde::{Deserialize, Serialize};

const SPEAKER: &str = "SP";
const EARPIECE: &str = "EP";
const BLUETOOTH: &str = "BT";
const WEARABLE: &str = "WA";

/// Output path for received audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioRoute {
    #[default]
    Speaker,
    Earpiece,
    Bluetooth,
    /// Wearable accessory by index.
    Wearable(u32),
}

impl AudioRoute {
    /// Parse the controller's mode value. Anything unrecognised is the speaker;
    /// a wearable without a readable index is wearable 0.
    pub fn from_mode(mode: &str) -> Self {
        if let Some(index) = mode.strip_prefix(WEARABLE) {
            return Self::Wearable(index.parse().unwrap_or(0));
        }
        match mode {
            EARPIECE => Self::Earpiece,
            BLUETOOTH => Self::Bluetooth,
            _ => Self::Speaker,
        }
    }

    /// Mode value sent with a route change request.
    pub fn mode(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speaker => f.write_str(SPEAKER),
            Self::Earpiece => f.write_str(EARPIECE),
            Self::Bluetooth => f.write_str(BLUETOOTH),
            Self::Wearable(index) => write!(f, "{WEARABLE}{index}"),
        }
    }
}

/// Route availability and the route currently in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AudioState {
    pub speaker: bool,
    pub earpiece: bool,
    pub bluetooth: bool,
    /// Number of connected wearables.
    pub wearables: u32,
    pub route: AudioRoute,
    /// A route change is in flight.
    pub changing: bool,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            speaker: true,
            earpiece: false,
            bluetooth: false,
            wearables: 0,
            route: AudioRoute::Speaker,
            changing: false,
        }
    }
}

impl AudioState {
    pub fn is_route_available(&self, route: AudioRoute) -> bool {
        match route {
            AudioRoute::Speaker => self.speaker,
            AudioRoute::Earpiece => self.earpiece,
            AudioRoute::Bluetooth => self.bluetooth,
            AudioRoute::Wearable(index) => index < self.wearables,
        }
    }

    /// Every route that can currently be selected.
    pub fn available_routes(&self) -> Vec<AudioRoute> {
        let mut routes: Vec<AudioRoute> = [
            AudioRoute::Speaker,
            AudioRoute::Earpiece,
            AudioRoute::Bluetooth,
        ]
        .into_iter()
        .filter(|r| self.is_route_available(*r))
        .collect();
        routes.extend((0..self.wearables).map(AudioRoute::Wearable));
        routes
    }
}

// ── Contact picker ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A tab of the controller's contact picker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tab {
    #[default]
    Recents,
    Users,
    Channels,
}

impl Tab {
    /// Unknown or missing values read as `Recents`.
    pub fn from_wire(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Request to open the controller's contact picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPicker {
    pub title: Option<String>,
    /// Displayed tabs, in order. Must not be empty.
    pub tabs: Vec<Tab>,
    pub active_tab: Option<Tab>,
    pub theme: Theme,
}

impl Default for ContactPicker {
    fn default() -> Self {
        Self {
            title: None,
            tabs: vec![Tab::Recents, Tab::Users, Tab::Channels],
            active_tab: None,
            theme: Theme::Dark,
        }
    }
}

impl ContactPicker {
    /// Comma-separated tab list as the controller expects it.
    pub fn tab_list(&self) -> String {
        self.tabs
            .iter()
            .map(AsRef::<str>::as_ref)
            .collect::<Vec<&str>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_use_wire_names() {
        assert_eq!(Tab::Channels.as_ref(), "CHANNELS");
        assert_eq!(Tab::from_wire(Some("USERS")), Tab::Users);
        assert_eq!(Tab::from_wire(Some("bogus")), Tab::Recents);
        assert_eq!(Tab::from_wire(None), Tab::Recents);
    }

    #[test]
    fn tab_list_is_comma_joined() {
        let picker = ContactPicker {
            tabs: vec![Tab::Users, Tab::Channels],
            ..ContactPicker::default()
        };
        assert_eq!(picker.tab_list(), "USERS,CHANNELS");
    }
}

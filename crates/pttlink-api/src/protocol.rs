// ── Controller bus vocabulary ──
//
// Action suffixes, extra keys and command values understood by the
// controller. Actions are namespaced by the controller's package
// identity: `{package}.{suffix}`.

/// Build a fully-qualified action for `package`.
pub fn action(package: &str, suffix: &str) -> String {
    format!("{package}.{suffix}")
}

/// Address of the controller's contact roster content source.
pub fn roster_address(package: &str) -> String {
    format!("content://{package}.provider/contacts")
}

/// Action suffixes.
pub mod actions {
    pub const COMMAND: &str = "COMMAND";
    pub const APP_STATE: &str = "APP_STATE";
    pub const MESSAGE_STATE: &str = "MESSAGE_STATE";
    pub const CONTACT_SELECTED: &str = "CONTACT_SELECTED";
    pub const AUDIO_STATE: &str = "AUDIO_STATE";
    pub const PERMISSION_ERRORS: &str = "PERMISSION_ERRORS";

    /// Generic "pick an item" launch action used by the contact picker.
    pub const PICK: &str = "PICK";
}

/// Launchable components inside the controller package.
pub mod components {
    pub const CONTACT_PICKER: &str = "com.zello.sdk.Activity";
    pub const PERMISSIONS: &str = "com.zello.sdk.PermissionsActivity";
}

/// Extra keys.
pub mod keys {
    // ── Commands & picker ──
    pub const COMMAND: &str = "COMMAND";
    pub const TITLE: &str = "TITLE";
    pub const TABS: &str = "TABS";
    pub const TAB: &str = "TAB";
    pub const CALLBACK: &str = "CALLBACK";
    pub const THEME: &str = "THEME";

    // ── Session state ──
    pub const STATE_CUSTOM_BUILD: &str = "STATE_CUSTOM_BUILD";
    pub const STATE_CONFIGURING: &str = "STATE_CONFIGURING";
    pub const STATE_LOCKED: &str = "STATE_LOCKED";
    pub const STATE_SIGNED_IN: &str = "STATE_SIGNED_IN";
    pub const STATE_SIGNING_IN: &str = "STATE_SIGNING_IN";
    pub const STATE_SIGNING_OUT: &str = "STATE_SIGNING_OUT";
    pub const STATE_CANCELLING_SIGNIN: &str = "STATE_CANCELLING_SIGNIN";
    pub const STATE_RECONNECT_TIMER: &str = "STATE_RECONNECT_TIMER";
    pub const STATE_WAITING_FOR_NETWORK: &str = "STATE_WAITING_FOR_NETWORK";
    pub const STATE_SHOW_CONTACTS: &str = "STATE_SHOW_CONTACTS";
    pub const STATE_BUSY: &str = "STATE_BUSY";
    pub const STATE_SOLO: &str = "STATE_SOLO";
    pub const STATE_AUTO_RUN: &str = "STATE_AUTO_RUN";
    pub const STATE_AUTO_CHANNELS: &str = "STATE_AUTO_CHANNELS";
    pub const STATE_STATUS_MESSAGE: &str = "STATE_STATUS_MESSAGE";
    pub const STATE_NETWORK: &str = "STATE_NETWORK";
    pub const STATE_NETWORK_URL: &str = "STATE_NETWORK_URL";
    pub const STATE_USERNAME: &str = "STATE_USERNAME";
    pub const STATE_LAST_ERROR: &str = "STATE_LAST_ERROR";

    // ── Contacts ──
    pub const CONTACT_NAME: &str = "CONTACT_NAME";
    pub const CONTACT_FULL_NAME: &str = "CONTACT_FULL_NAME";
    pub const CONTACT_DISPLAY_NAME: &str = "CONTACT_DISPLAY_NAME";
    pub const CONTACT_TYPE: &str = "CONTACT_TYPE";
    pub const CONTACT_STATUS: &str = "CONTACT_STATUS";
    pub const CONTACT_STATUS_MESSAGE: &str = "CONTACT_STATUS_MESSAGE";
    pub const CONTACT_TITLE: &str = "CONTACT_TITLE";
    pub const CONTACT_MUTED: &str = "CONTACT_MUTED";
    pub const CHANNEL_USERS_COUNT: &str = "CHANNEL_USERS_COUNT";
    pub const CHANNEL_USERS_TOTAL: &str = "CHANNEL_USERS_TOTAL";
    pub const CHANNEL_NO_DISCONNECT: &str = "CHANNEL_NO_DISCONNECT";

    // ── Message author ──
    pub const CHANNEL_AUTHOR_NAME: &str = "CHANNEL_AUTHOR_NAME";
    pub const CHANNEL_AUTHOR_FULL_NAME: &str = "CHANNEL_AUTHOR_FULL_NAME";
    pub const CHANNEL_AUTHOR_DISPLAY_NAME: &str = "CHANNEL_AUTHOR_DISPLAY_NAME";
    pub const CHANNEL_AUTHOR_STATUS: &str = "CHANNEL_AUTHOR_STATUS";
    pub const CHANNEL_AUTHOR_STATUS_MESSAGE: &str = "CHANNEL_AUTHOR_STATUS_MESSAGE";

    // ── Message state ──
    pub const MESSAGE_OUT: &str = "MESSAGE_OUT";
    pub const MESSAGE_IN: &str = "MESSAGE_IN";
    pub const MESSAGE_CONNECTING: &str = "MESSAGE_CONNECTING";

    // ── Sign-in & lock ──
    pub const NETWORK: &str = "N";
    pub const USERNAME: &str = "U";
    pub const PASSWORD: &str = "P";
    pub const PERISHABLE: &str = "TMP";
    pub const APPLICATION: &str = "APP";
    pub const PACKAGE: &str = "PACKAGE";
    pub const EXTERNAL_ID: &str = "EID";

    // ── Audio ──
    pub const MODE: &str = "MODE";
    pub const CHANGING: &str = "CHANGING";
    pub const BLUETOOTH: &str = "BT";
    pub const EARPIECE: &str = "EP";
    pub const SPEAKER: &str = "SP";
    pub const WEARABLES: &str = "WA";

    // ── Permissions ──
    pub const REQUEST_VITAL_PERMISSIONS: &str = "REQUEST_VITAL_PERMISSIONS";
    pub const LATEST_PERMISSION_ERROR: &str = "LATEST_PERMISSION_ERROR";
    pub const PERMISSION_DIALOG: &str = "PERMISSION_DIALOG";
    pub const PERMISSION_MICROPHONE: &str = "PERMISSION_MICROPHONE";
}

/// Values carried in the `COMMAND` extra, plus picker/theme values.
pub mod values {
    pub const BEGIN_MESSAGE: &str = "BEGIN_MESSAGE";
    pub const END_MESSAGE: &str = "END_MESSAGE";
    pub const CONNECT: &str = "CONNECT";
    pub const DISCONNECT: &str = "DISCONNECT";
    pub const MUTE: &str = "MUTE";
    pub const UNMUTE: &str = "UNMUTE";
    pub const SET_STATUS: &str = "SET_STATUS";
    pub const STAY_AWAKE: &str = "STAY_AWAKE";
    pub const SELECT_CONTACT: &str = "SELECT_CONTACT";
    pub const SIGN_IN: &str = "SIGN_IN";
    pub const SIGN_OUT: &str = "SIGN_OUT";
    pub const CANCEL: &str = "CANCEL";
    pub const SET_AUTO_RUN: &str = "SET_AUTO_RUN";
    pub const SET_AUTO_CHANNELS: &str = "SET_AUTO_CHANNELS";
    pub const SET_EID: &str = "SET_EID";
    pub const LOCK: &str = "LOCK";
    pub const SET_AUDIO: &str = "SET_AUDIO";
    pub const LIGHT: &str = "LIGHT";
}

/// Roster content source column names.
pub mod columns {
    pub const NAME: &str = "name";
    pub const FULL_NAME: &str = "fullname";
    pub const DISPLAY_NAME: &str = "displayname";
    pub const STATUS_MESSAGE: &str = "statusmessage";
    pub const TYPE: &str = "type";
    pub const STATUS: &str = "status";
    pub const USERS_COUNT: &str = "userscount";
    pub const USERS_TOTAL: &str = "userstotal";
    pub const TITLE: &str = "title";
    pub const MUTED: &str = "muted";
    pub const NO_DISCONNECT: &str = "nodisconnect";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_namespaced_by_package() {
        assert_eq!(
            action("net.loudtalks", actions::APP_STATE),
            "net.loudtalks.APP_STATE"
        );
        assert_eq!(
            roster_address("com.pttsdk"),
            "content://com.pttsdk.provider/contacts"
        );
    }
}

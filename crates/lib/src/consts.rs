//! Application-wide constants.

/// Application name, used for directory names and branding.
pub const APP_NAME: &str = "pinsh";

/// Environment variable overriding the store directory.
pub const ENV_STORE: &str = "PINSH_STORE";

/// Conventional name of the pin file.
pub const PINS_FILENAME: &str = "pins.toml";

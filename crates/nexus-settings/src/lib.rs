//! # nexus-settings
//!
//! Configuration for the Nexus gateway, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`GatewaySettings::default()`]
//! 2. **Settings file**: `~/.nexus/settings.json`, or the path named by
//!    `NEXUS_SETTINGS` (deep-merged over defaults)
//! 3. **Environment variables**: `NEXUS_*` overrides (highest priority)
//!
//! Settings are loaded once at startup and handed to each component
//! explicitly; there is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

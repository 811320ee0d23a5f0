pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::{DispatcherOptions, FileOpenDispatcher, FileProvider, ProviderRoot};
use crate::platform::Platform;

/// Authority the provider URIs are minted under unless configured otherwise.
pub const DEFAULT_PROVIDER_AUTHORITY: &str = "com.crazecoder.openfile.fileProvider";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    pub provider_authority: String,
    pub provider_roots: Vec<ProviderRoot>,
    /// Open the settings screen instead of failing when broad access is missing.
    pub redirect_to_settings: bool,
    /// Fall back to the `mime_guess` database for extensions outside the fixed table.
    pub extended_mime_lookup: bool,
    /// MIME type -> application to launch instead of the system default.
    pub handler_overrides: HashMap<String, String>,
}

impl BridgeConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            redirect_to_settings: self.redirect_to_settings,
            extended_mime_lookup: self.extended_mime_lookup,
        }
    }

    pub fn file_provider(&self) -> FileProvider {
        FileProvider::new(self.provider_authority.clone(), self.provider_roots.clone())
    }

    /// Builds a dispatcher for `platform` with this configuration applied.
    pub fn build_dispatcher<P: Platform>(&self, platform: P) -> FileOpenDispatcher<P> {
        FileOpenDispatcher::new(platform, self.file_provider())
            .with_options(self.dispatcher_options())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            provider_authority: DEFAULT_PROVIDER_AUTHORITY.to_string(),
            provider_roots: vec![ProviderRoot {
                name: "root".to_string(),
                path: PathBuf::from("/"),
            }],
            redirect_to_settings: false,
            extended_mime_lookup: false,
            handler_overrides: HashMap::new(),
        }
    }
}

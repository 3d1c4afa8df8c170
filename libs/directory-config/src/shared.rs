use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;

use crate::config::DirectoryConfig;
use crate::loader::DirectoryConfigLoader;

/// Read-mostly holder of the active [`DirectoryConfig`].
///
/// Readers take an `Arc` snapshot that stays valid and unchanged for as long
/// as they hold it; a reload swaps the active config atomically.
pub struct SharedDirectoryConfig {
    current: ArcSwap<DirectoryConfig>,
}

impl SharedDirectoryConfig {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn snapshot(&self) -> Arc<DirectoryConfig> {
        self.current.load_full()
    }

    /// Install `config` and return the previous one.
    pub fn replace(&self, config: DirectoryConfig) -> Arc<DirectoryConfig> {
        self.current.swap(Arc::new(config))
    }

    /// Load a fresh config from `loader`. The active config is only replaced if loading succeeds.
    pub fn reload(&self, loader: &DirectoryConfigLoader) -> Result<()> {
        match loader.load() {
            Ok(config) => {
                self.replace(config);
                tracing::info!("Directory configuration reloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Directory configuration reload failed, keeping current");
                Err(e)
            }
        }
    }
}

impl Default for SharedDirectoryConfig {
    fn default() -> Self {
        Self::new(DirectoryConfig::default())
    }
}

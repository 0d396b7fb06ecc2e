//! Registry of configured platform adapters, keyed by platform ID.

use super::traits::PlatformDyn;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds one adapter per configured platform connection.
#[derive(Default)]
pub struct PlatformManager {
    adapters: HashMap<String, Arc<dyn PlatformDyn>>,
}

impl PlatformManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: impl super::traits::Platform) {
        let name = adapter.name().to_string();
        self.adapters.insert(name, Arc::new(adapter));
    }

    pub fn get(&self, platform_id: &str) -> Option<&Arc<dyn PlatformDyn>> {
        self.adapters.get(platform_id)
    }

    pub fn platform_ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

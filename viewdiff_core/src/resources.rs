use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use viewdiff_common::{Result, ViewDiffError};

/// Page header used by the side-by-side engine
pub const SIDE_BY_SIDE_HEADER: &str = "side-by-side-header.html";

const BUILTIN: &[(&str, &str)] = &[(
    SIDE_BY_SIDE_HEADER,
    include_str!("../resources/side-by-side-header.html"),
)];

pub type ResourceCache = Arc<RwLock<HashMap<String, Arc<str>>>>;

/// Template lookup with an optional override directory and a shared cache
#[derive(Clone, Default)]
pub struct ResourceProvider {
    override_dir: Option<PathBuf>,
    cache: ResourceCache,
}

impl ResourceProvider {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self::with_cache(override_dir, ResourceCache::default())
    }

    /// Use a cache shared with other providers
    pub fn with_cache(override_dir: Option<PathBuf>, cache: ResourceCache) -> Self {
        Self { override_dir, cache }
    }

    /// Load a resource, from the override directory when it holds the file,
    /// otherwise from the built-in set. Loaded text is cached by name.
    pub fn get(&self, name: &str) -> Result<Arc<str>> {
        if let Some(cached) = self.cache.read().ok().and_then(|c| c.get(name).cloned()) {
            return Ok(cached);
        }

        let loaded: Arc<str> = match self.load_override(name) {
            Some(text) => Arc::from(text),
            None => BUILTIN
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, text)| Arc::from(*text))
                .ok_or_else(|| ViewDiffError::Resource(format!("Unknown resource: {}", name)))?,
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(name.to_string(), Arc::clone(&loaded));
        }
        debug!("Loaded resource {}", name);
        Ok(loaded)
    }

    fn load_override(&self, name: &str) -> Option<String> {
        let path = self.override_dir.as_ref()?.join(name);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Failed to read resource override {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Clear all cached resources
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

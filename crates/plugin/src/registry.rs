//! Registry of named virtual readers
//!
//! The registry is the plug/unplug surface of the simulation: the host
//! plugs named readers in at runtime, looks them up for dispatch and
//! unplugs them when a scenario tears down. All operations are safe
//! under concurrent callers and never expose partial state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cardsim_core::{Error, Result, SimulatedCard, VirtualReader};
use parking_lot::RwLock;
use tracing::debug;

use crate::config::ReaderConfig;

/// Concurrency-safe name → reader mapping
#[derive(Debug)]
pub struct ReaderRegistry {
    /// Registry (plugin) name
    name: String,
    /// Plugged readers by name
    readers: RwLock<HashMap<String, Arc<VirtualReader>>>,
}

impl ReaderRegistry {
    /// Create an empty registry with the given plugin name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a builder for a registry with initially plugged readers
    pub fn builder(name: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            name: name.into(),
            readers: Vec::new(),
        }
    }

    /// Get the registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plug a reader, optionally pre-loaded with a card
    ///
    /// Plugging with an existing name overwrites the prior reader for
    /// that name (last write wins). Returns the plugged reader.
    pub fn plug_reader(
        &self,
        name: &str,
        contactless: bool,
        card: Option<SimulatedCard>,
    ) -> Result<Arc<VirtualReader>> {
        if name.is_empty() {
            return Err(Error::invalid_argument("reader name"));
        }

        let reader = Arc::new(VirtualReader::new(name, contactless, card));
        self.readers
            .write()
            .insert(name.to_string(), Arc::clone(&reader));
        debug!(registry = %self.name, reader = name, "plugged reader");
        Ok(reader)
    }

    /// Unplug a reader; no-op if absent
    pub fn unplug_reader(&self, name: &str) {
        if self.readers.write().remove(name).is_some() {
            debug!(registry = %self.name, reader = name, "unplugged reader");
        }
    }

    /// Snapshot of the currently plugged reader names
    pub fn reader_names(&self) -> HashSet<String> {
        self.readers.read().keys().cloned().collect()
    }

    /// Find a reader by name
    pub fn find_reader(&self, name: &str) -> Option<Arc<VirtualReader>> {
        self.readers.read().get(name).cloned()
    }

    /// Snapshot of the currently plugged readers
    pub fn readers(&self) -> Vec<Arc<VirtualReader>> {
        self.readers.read().values().cloned().collect()
    }
}

/// Builder for a [`ReaderRegistry`] with initially plugged readers
#[derive(Debug)]
pub struct RegistryBuilder {
    name: String,
    readers: Vec<ReaderConfig>,
}

impl RegistryBuilder {
    /// Add a reader to plug at build time
    pub fn with_reader(mut self, config: ReaderConfig) -> Self {
        self.readers.push(config);
        self
    }

    /// Build the registry, plugging the configured readers
    pub fn build(self) -> Result<ReaderRegistry> {
        let registry = ReaderRegistry::new(self.name);
        for config in self.readers {
            registry.plug_reader(&config.name, config.contactless, config.card)?;
        }
        Ok(registry)
    }
}

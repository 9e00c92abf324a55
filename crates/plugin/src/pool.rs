//! Pool allocation of readers by group reference
//!
//! A [`ReaderPool`] leases readers to callers by logical group instead
//! of by name. The pool wraps a [`ReaderRegistry`] and additionally
//! tracks which group each pooled reader belongs to and which readers
//! are currently allocated. The allocate check-and-mark sequence is
//! guarded by a single lock so that two concurrent allocations can
//! never hand out the same reader.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use cardsim_core::{Error, Result, SimulatedCard, VirtualReader};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::PoolReaderConfig;
use crate::registry::ReaderRegistry;

/// Pool of readers allocatable by group reference
#[derive(Debug)]
pub struct ReaderPool {
    /// Underlying registry holding the pooled readers
    registry: ReaderRegistry,
    /// Group and allocation bookkeeping, under one lock for atomicity
    state: Mutex<PoolState>,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Group reference of each pooled reader
    group_of: HashMap<String, String>,
    /// Names of the readers currently leased out
    allocated: HashSet<String>,
}

impl ReaderPool {
    /// Create an empty pool with the given plugin name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            registry: ReaderRegistry::new(name),
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Create a builder for a pool with initially plugged readers
    pub fn builder(name: impl Into<String>) -> PoolBuilder {
        PoolBuilder {
            name: name.into(),
            readers: Vec::new(),
        }
    }

    /// Get the pool name
    pub fn name(&self) -> &str {
        self.registry.name()
    }

    /// Access the underlying registry
    pub const fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Snapshot of the currently plugged reader names
    pub fn reader_names(&self) -> HashSet<String> {
        self.registry.reader_names()
    }

    /// Find a reader by name
    pub fn find_reader(&self, name: &str) -> Option<Arc<VirtualReader>> {
        self.registry.find_reader(name)
    }

    /// Snapshot of the currently plugged readers
    pub fn readers(&self) -> Vec<Arc<VirtualReader>> {
        self.registry.readers()
    }

    /// Plug a pooled reader into the given group
    ///
    /// Pooled readers are contact readers. Returns the plugged reader.
    pub fn plug_pool_reader(
        &self,
        group: &str,
        name: &str,
        card: Option<SimulatedCard>,
    ) -> Result<Arc<VirtualReader>> {
        if group.is_empty() {
            return Err(Error::invalid_argument("group reference"));
        }

        let reader = self.registry.plug_reader(name, false, card)?;
        self.state
            .lock()
            .group_of
            .insert(name.to_string(), group.to_string());
        Ok(reader)
    }

    /// Unplug a pooled reader
    ///
    /// Group and allocation bookkeeping are cleared first, so the
    /// reader is fully forgotten even if it was still allocated.
    pub fn unplug_pool_reader(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("reader name"));
        }

        {
            let mut state = self.state.lock();
            state.group_of.remove(name);
            state.allocated.remove(name);
        }
        self.registry.unplug_reader(name);
        Ok(())
    }

    /// Unplug every reader currently mapped to the given group
    pub fn unplug_pool_readers(&self, group: &str) -> Result<()> {
        if group.is_empty() {
            return Err(Error::invalid_argument("group reference"));
        }

        // Snapshot before mutating so no entry is skipped
        for name in self.readers_in_group(group) {
            self.unplug_pool_reader(&name)?;
        }
        Ok(())
    }

    /// Distinct group references, sorted ascending
    pub fn group_references(&self) -> BTreeSet<String> {
        self.state.lock().group_of.values().cloned().collect()
    }

    /// Allocate a free reader
    ///
    /// Candidates are every plugged reader when `group` is `None`,
    /// otherwise exactly the readers of that group. Candidates are
    /// scanned in ascending name order and the first unallocated one
    /// is marked and returned in a single indivisible step. Fails with
    /// [`Error::NoReaderAvailable`] when every candidate is leased out.
    pub fn allocate(&self, group: Option<&str>) -> Result<Arc<VirtualReader>> {
        let mut state = self.state.lock();

        let mut candidates: Vec<String> = match group {
            None => self.registry.reader_names().into_iter().collect(),
            Some(group) => state
                .group_of
                .iter()
                .filter(|(_, g)| g.as_str() == group)
                .map(|(name, _)| name.clone())
                .collect(),
        };
        candidates.sort();

        for name in candidates {
            if state.allocated.contains(&name) {
                continue;
            }
            // A name can outlive its reader when an unplug races a
            // grouped allocation; skip it without marking
            if let Some(reader) = self.registry.find_reader(&name) {
                state.allocated.insert(name.clone());
                debug!(pool = %self.name(), reader = %name, "allocated reader");
                return Ok(reader);
            }
        }

        Err(Error::no_reader_available(group))
    }

    /// Release an allocated reader
    ///
    /// Releasing a reader that is not allocated is a no-op, so double
    /// release is safe.
    pub fn release(&self, reader: &VirtualReader) {
        if self.state.lock().allocated.remove(reader.name()) {
            debug!(pool = %self.name(), reader = %reader.name(), "released reader");
        }
    }

    fn readers_in_group(&self, group: &str) -> Vec<String> {
        self.state
            .lock()
            .group_of
            .iter()
            .filter(|(_, g)| g.as_str() == group)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Builder for a [`ReaderPool`] with initially plugged readers
#[derive(Debug)]
pub struct PoolBuilder {
    name: String,
    readers: Vec<PoolReaderConfig>,
}

impl PoolBuilder {
    /// Add a pooled reader to plug at build time
    pub fn with_pool_reader(mut self, config: PoolReaderConfig) -> Self {
        self.readers.push(config);
        self
    }

    /// Build the pool, plugging the configured readers
    pub fn build(self) -> Result<ReaderPool> {
        let pool = ReaderPool::new(self.name);
        for config in self.readers {
            pool.plug_pool_reader(&config.group, &config.name, config.card)?;
        }
        Ok(pool)
    }
}

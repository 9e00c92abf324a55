//! Configuration options for registries, pools and monitoring

use std::fmt;
use std::time::Duration;

use cardsim_core::SimulatedCard;

/// Configuration of a reader to plug when a registry is built
pub struct ReaderConfig {
    /// Reader name
    pub name: String,
    /// Whether the reader is contactless
    pub contactless: bool,
    /// Card inserted at creation, if any
    pub card: Option<SimulatedCard>,
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("name", &self.name)
            .field("contactless", &self.contactless)
            .field("has_card", &self.card.is_some())
            .finish()
    }
}

impl ReaderConfig {
    /// Create a reader configuration
    pub fn new(name: impl Into<String>, contactless: bool, card: Option<SimulatedCard>) -> Self {
        Self {
            name: name.into(),
            contactless,
            card,
        }
    }
}

/// Configuration of a pooled reader to plug when a pool is built
pub struct PoolReaderConfig {
    /// Group reference the reader belongs to
    pub group: String,
    /// Reader name
    pub name: String,
    /// Card inserted at creation, if any
    pub card: Option<SimulatedCard>,
}

impl fmt::Debug for PoolReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolReaderConfig")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("has_card", &self.card.is_some())
            .finish()
    }
}

impl PoolReaderConfig {
    /// Create a pooled reader configuration
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        card: Option<SimulatedCard>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            card,
        }
    }
}

/// Configuration options for a [`RegistryMonitor`]
///
/// [`RegistryMonitor`]: crate::RegistryMonitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Duration between two monitoring cycles
    pub cycle: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle: Duration::from_millis(100),
        }
    }
}

impl MonitorConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration between two monitoring cycles
    pub const fn with_cycle(mut self, cycle: Duration) -> Self {
        self.cycle = cycle;
        self
    }
}

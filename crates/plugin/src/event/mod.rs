//! Event types and handling for reader monitoring
//!
//! The registry and pool expose their state changes synchronously; the
//! event types here are produced by the [`RegistryMonitor`] for hosts
//! that want connect/disconnect style notifications.
//!
//! [`RegistryMonitor`]: crate::RegistryMonitor

pub mod callback;
pub use callback::*;

pub mod channel;
pub use channel::*;

/// Events related to card insertion/removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    /// Card was inserted into a reader
    Inserted {
        /// Reader name
        reader: String,
        /// Power-on data of the inserted card
        power_on_data: Vec<u8>,
    },
    /// Card was removed from a reader
    Removed {
        /// Reader name
        reader: String,
    },
}

/// Events related to reader plug/unplug
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// Reader was plugged into the registry
    Plugged(String),
    /// Reader was unplugged from the registry
    Unplugged(String),
}

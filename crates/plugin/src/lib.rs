//! Registry, pool allocation and monitoring for simulated readers
//!
//! This crate is the plugin-facing layer of the simulation built on
//! [`cardsim-core`](cardsim_core): a concurrency-safe
//! [`ReaderRegistry`] for plugging and unplugging named readers at
//! runtime, a [`ReaderPool`] that leases readers by group reference
//! with an at-most-one-allocation guarantee, and a [`RegistryMonitor`]
//! that turns state changes into reader/card events for observing
//! hosts.
//!
//! ## Example
//!
//! ```
//! use cardsim_plugin::{ReaderPool, ReaderRegistry};
//!
//! # fn main() -> Result<(), cardsim_core::Error> {
//! let registry = ReaderRegistry::new("sim-plugin");
//! registry.plug_reader("reader-1", true, None)?;
//! assert!(registry.find_reader("reader-1").is_some());
//!
//! let pool = ReaderPool::new("sim-pool");
//! pool.plug_pool_reader("bench", "pool-reader-1", None)?;
//! let reader = pool.allocate(Some("bench"))?;
//! pool.release(&reader);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Core modules
pub mod config;
pub mod event;
mod monitor;
mod pool;
mod registry;

// Public exports
pub use config::{MonitorConfig, PoolReaderConfig, ReaderConfig};
pub use event::{CardEvent, ReaderEvent};
pub use monitor::RegistryMonitor;
pub use pool::{PoolBuilder, ReaderPool};
pub use registry::{ReaderRegistry, RegistryBuilder};

// Re-export the core types for convenience
pub use cardsim_core::{ApduResponseProvider, Error, Result, SimulatedCard, VirtualReader};

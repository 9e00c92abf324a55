//! Simulated smart cards and virtual readers
//!
//! This crate provides the card side of a smart-card reader
//! simulation: a [`SimulatedCard`] that answers APDU exchanges from a
//! regex-keyed command table or an external response provider, and a
//! [`VirtualReader`] that owns at most one card and exposes protocol
//! activation, insertion/removal, physical channel lifecycle and APDU
//! forwarding.
//!
//! No hardware is involved; everything is an in-process procedure
//! call, which makes the types suitable for exercising higher-level
//! card-communication logic in tests.
//!
//! ## Example
//!
//! ```
//! use cardsim_core::{SimulatedCard, VirtualReader};
//!
//! # fn main() -> Result<(), cardsim_core::Error> {
//! let card = SimulatedCard::builder()
//!     .with_power_on_data(vec![0x3B, 0x8F])
//!     .with_protocol("ISO_14443_4")
//!     .with_simulated_command("00A40400.*", "6F009000")
//!     .build()?;
//!
//! let reader = VirtualReader::new("test-reader", true, None);
//! reader.activate_protocol("ISO_14443_4");
//! reader.insert_card(card);
//!
//! let response = reader.transmit_apdu(&hex::decode("00A4040000").unwrap())?;
//! assert_eq!(&response[response.len() - 2..], &[0x90, 0x00]);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod card;
pub mod error;
pub mod provider;
pub mod reader;

pub use card::{CardBuilder, SimulatedCard};
pub use error::{Error, Result};
pub use provider::ApduResponseProvider;
pub use reader::VirtualReader;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        ApduResponseProvider, Bytes, BytesMut, CardBuilder, Error, Result, SimulatedCard,
        VirtualReader,
    };
}

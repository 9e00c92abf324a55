//! External response generation for simulated cards
//!
//! A provider replaces the static command table of a [`SimulatedCard`]
//! with arbitrary logic, e.g. a software card implementation driving
//! the responses.
//!
//! [`SimulatedCard`]: crate::card::SimulatedCard

/// Trait for external APDU response generators
///
/// Requests and responses are exchanged as uppercase hexadecimal
/// strings without separators. Returning `None` means the provider has
/// no response for the request; the card reports a communication error
/// in that case (the command table is never consulted as a fallback).
pub trait ApduResponseProvider: Send + Sync {
    /// Produce the hex response for a hex request, if any
    fn response_for(&self, request_hex: &str) -> Option<String>;
}

// Allow plain closures as providers
impl<F> ApduResponseProvider for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn response_for(&self, request_hex: &str) -> Option<String> {
        self(request_hex)
    }
}

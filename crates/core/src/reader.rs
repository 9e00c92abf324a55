//! Virtual reader holding at most one simulated card
//!
//! A [`VirtualReader`] models the reader side of the simulation: a set
//! of activated protocols, card insertion/removal, physical channel
//! lifecycle and APDU forwarding. Readers are created by the registry
//! layer and shared behind `Arc`, so every operation takes `&self` and
//! the mutable state lives behind a lock.

use std::collections::HashSet;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::card::SimulatedCard;
use crate::error::{Error, Result};

/// Simulated card reader
#[derive(Debug)]
pub struct VirtualReader {
    /// Unique reader name
    name: String,
    /// Whether the reader is contactless
    contactless: bool,
    /// Mutable reader state, shared with the host through `Arc`
    inner: Mutex<ReaderState>,
}

#[derive(Debug)]
struct ReaderState {
    /// Protocols the reader will accept cards for
    activated_protocols: HashSet<String>,
    /// The inserted card, exclusively owned by this reader
    card: Option<SimulatedCard>,
}

impl VirtualReader {
    /// Create a reader, optionally pre-loaded with a card
    ///
    /// A card supplied here bypasses the protocol-activation check;
    /// only interactive insertion enforces it.
    pub fn new(name: impl Into<String>, contactless: bool, card: Option<SimulatedCard>) -> Self {
        Self {
            name: name.into(),
            contactless,
            inner: Mutex::new(ReaderState {
                activated_protocols: HashSet::new(),
                card,
            }),
        }
    }

    /// Get the reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the reader is contactless
    pub const fn is_contactless(&self) -> bool {
        self.contactless
    }

    /// Activate a protocol; idempotent
    pub fn activate_protocol(&self, protocol: &str) {
        self.inner
            .lock()
            .activated_protocols
            .insert(protocol.to_string());
    }

    /// Deactivate a protocol; idempotent
    pub fn deactivate_protocol(&self, protocol: &str) {
        self.inner.lock().activated_protocols.remove(protocol);
    }

    /// Insert a card into the reader
    ///
    /// The insertion is ignored (logged, not an error) if a card is
    /// already present or if the card's protocol has not been
    /// activated, modeling expected operator mistakes during
    /// interactive simulation.
    pub fn insert_card(&self, card: SimulatedCard) {
        let mut inner = self.inner.lock();

        if inner.card.is_some() {
            warn!(
                reader = %self.name,
                "the inserted card must be removed before inserting another one"
            );
            return;
        }

        if !inner.activated_protocols.contains(card.protocol()) {
            trace!(
                reader = %self.name,
                protocol = card.protocol(),
                "inserted card protocol does not match any activated protocol"
            );
            return;
        }

        trace!(reader = %self.name, card = ?card, "inserted card");
        inner.card = Some(card);
    }

    /// Remove the inserted card, if any
    ///
    /// The physical channel is closed before the card is released.
    pub fn remove_card(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut card) = inner.card.take() {
            card.close_physical_channel();
            trace!(reader = %self.name, card = ?card, "removed card");
        }
    }

    /// Check if a card is present in the reader
    pub fn is_card_present(&self) -> bool {
        self.inner.lock().card.is_some()
    }

    /// Check if the inserted card communicates with the given protocol
    pub fn is_current_protocol(&self, protocol: &str) -> bool {
        self.inner
            .lock()
            .card
            .as_ref()
            .is_some_and(|card| card.protocol() == protocol)
    }

    /// Open the physical channel of the inserted card; no-op if none
    pub fn open_physical_channel(&self) {
        if let Some(card) = self.inner.lock().card.as_mut() {
            card.open_physical_channel();
        }
    }

    /// Close the physical channel of the inserted card; no-op if none
    pub fn close_physical_channel(&self) {
        if let Some(card) = self.inner.lock().card.as_mut() {
            card.close_physical_channel();
        }
    }

    /// Check if the physical channel of the inserted card is open
    pub fn is_physical_channel_open(&self) -> bool {
        self.inner
            .lock()
            .card
            .as_ref()
            .is_some_and(SimulatedCard::is_physical_channel_open)
    }

    /// Get the power-on data of the inserted card
    ///
    /// Fails with [`Error::NoCardAvailable`] when the reader is empty;
    /// power-on data is only meaningful while a card answers.
    pub fn power_on_data(&self) -> Result<Bytes> {
        self.inner
            .lock()
            .card
            .as_ref()
            .map(|card| card.power_on_data().clone())
            .ok_or_else(|| Error::NoCardAvailable(self.name.clone()))
    }

    /// Transmit an APDU command to the inserted card
    ///
    /// Fails with [`Error::NoCardAvailable`] when the reader is empty;
    /// card-level failures are propagated unchanged.
    pub fn transmit_apdu(&self, apdu: &[u8]) -> Result<Bytes> {
        let inner = self.inner.lock();
        match inner.card.as_ref() {
            Some(card) => card.process_apdu(apdu),
            None => Err(Error::NoCardAvailable(self.name.clone())),
        }
    }

    /// Host notification that card detection has started
    pub fn start_detection(&self) {
        trace!(reader = %self.name, "detection started");
    }

    /// Host notification that card detection has stopped
    pub fn stop_detection(&self) {
        trace!(reader = %self.name, "detection stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTOCOL: &str = "ISO_14443_4";

    fn a_card() -> SimulatedCard {
        SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B, 0x8F]))
            .with_protocol(PROTOCOL)
            .with_simulated_command("00A40400.*", "9000")
            .build()
            .unwrap()
    }

    fn a_reader() -> VirtualReader {
        let reader = VirtualReader::new("reader-1", false, None);
        reader.activate_protocol(PROTOCOL);
        reader
    }

    #[test]
    fn insert_card_with_activated_protocol() {
        let reader = a_reader();
        reader.insert_card(a_card());
        assert!(reader.is_card_present());
        assert!(reader.is_current_protocol(PROTOCOL));
        assert!(!reader.is_current_protocol("ISO_7816_3"));
    }

    #[test]
    fn insert_card_without_activated_protocol_is_ignored() {
        let reader = VirtualReader::new("reader-1", false, None);
        reader.insert_card(a_card());
        assert!(!reader.is_card_present());
    }

    #[test]
    fn insert_card_after_deactivation_is_ignored() {
        let reader = a_reader();
        reader.deactivate_protocol(PROTOCOL);
        reader.insert_card(a_card());
        assert!(!reader.is_card_present());
    }

    #[test]
    fn second_insert_keeps_first_card() {
        let reader = a_reader();
        reader.insert_card(a_card());
        reader.open_physical_channel();

        let other = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x01]))
            .with_protocol(PROTOCOL)
            .build()
            .unwrap();
        reader.insert_card(other);

        // First card unchanged, channel still open
        assert!(reader.is_card_present());
        assert!(reader.is_physical_channel_open());
        assert_eq!(
            reader.power_on_data().unwrap(),
            Bytes::from_static(&[0x3B, 0x8F])
        );
    }

    #[test]
    fn remove_card_closes_channel_and_releases_card() {
        let reader = a_reader();
        reader.insert_card(a_card());
        reader.open_physical_channel();
        assert!(reader.is_physical_channel_open());

        reader.remove_card();
        assert!(!reader.is_card_present());
        assert!(!reader.is_physical_channel_open());

        // Removing again is a no-op
        reader.remove_card();
        assert!(!reader.is_card_present());
    }

    #[test]
    fn channel_operations_without_card_are_noops() {
        let reader = a_reader();
        reader.open_physical_channel();
        assert!(!reader.is_physical_channel_open());
        reader.close_physical_channel();
        assert!(!reader.is_physical_channel_open());
    }

    #[test]
    fn transmit_without_card_fails() {
        let reader = a_reader();
        let err = reader.transmit_apdu(&[0x00, 0xA4]).unwrap_err();
        assert!(matches!(err, Error::NoCardAvailable(name) if name == "reader-1"));
    }

    #[test]
    fn transmit_forwards_to_card() {
        let reader = a_reader();
        reader.insert_card(a_card());
        let response = reader
            .transmit_apdu(&hex::decode("00A404000E315449432E49434131").unwrap())
            .unwrap();
        assert_eq!(response, hex::decode("9000").unwrap());
    }

    #[test]
    fn transmit_propagates_card_errors() {
        let reader = a_reader();
        reader.insert_card(a_card());
        let err = reader.transmit_apdu(&[0xDE, 0xAD]).unwrap_err();
        assert!(matches!(err, Error::CardCommunication { .. }));
    }

    #[test]
    fn power_on_data_without_card_fails() {
        let reader = a_reader();
        assert!(matches!(
            reader.power_on_data(),
            Err(Error::NoCardAvailable(_))
        ));
    }

    #[test]
    fn preloaded_card_bypasses_activation() {
        let reader = VirtualReader::new("reader-1", true, Some(a_card()));
        assert!(reader.is_card_present());
        assert!(reader.is_contactless());
    }
}

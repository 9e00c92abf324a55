//! Simulated smart card
//!
//! A [`SimulatedCard`] answers byte-level APDU exchanges either from a
//! static command table (regex keys over hex-encoded commands, matched
//! in insertion order) or from a pluggable [`ApduResponseProvider`].
//! Use [`SimulatedCard::builder`] to create one.

use std::fmt;

use bytes::Bytes;
use regex::Regex;

use crate::error::{Error, Result};
use crate::provider::ApduResponseProvider;

/// Simulated smart card that can be inserted into a virtual reader
///
/// Immutable after construction except for the physical channel flag,
/// which is toggled by the owning reader.
pub struct SimulatedCard {
    /// Power-on data returned on card activation (ATR-equivalent)
    power_on_data: Bytes,
    /// Protocol the card communicates with
    protocol: String,
    /// Ordered (pattern, response) table; insertion order is match priority
    commands: Vec<(String, String)>,
    /// External response generator, takes priority over the table when set
    provider: Option<Box<dyn ApduResponseProvider>>,
    /// Whether the physical channel is open
    physical_channel_open: bool,
}

impl fmt::Debug for SimulatedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedCard")
            .field("power_on_data", &hex::encode_upper(&self.power_on_data))
            .field("protocol", &self.protocol)
            .field("physical_channel_open", &self.physical_channel_open)
            .field("commands", &self.commands.len())
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

impl SimulatedCard {
    /// Create a builder for a simulated card
    pub fn builder() -> CardBuilder {
        CardBuilder::new()
    }

    /// Get the protocol the card communicates with
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Get the power-on data of the card
    pub const fn power_on_data(&self) -> &Bytes {
        &self.power_on_data
    }

    /// Get the status of the physical channel
    pub const fn is_physical_channel_open(&self) -> bool {
        self.physical_channel_open
    }

    /// Open the physical channel of the card
    pub fn open_physical_channel(&mut self) {
        self.physical_channel_open = true;
    }

    /// Close the physical channel of the card
    pub fn close_physical_channel(&mut self) {
        self.physical_channel_open = false;
    }

    /// Return the response to an APDU command
    ///
    /// An empty command yields an empty response without consulting
    /// simulation data. When a provider is configured it is the sole
    /// source of responses; otherwise the command table is scanned in
    /// insertion order and the first full regex match wins. If neither
    /// path produces a response the call fails with
    /// [`Error::CardCommunication`] carrying the hex-encoded command.
    pub fn process_apdu(&self, apdu: &[u8]) -> Result<Bytes> {
        if apdu.is_empty() {
            return Ok(Bytes::new());
        }

        let request_hex = hex::encode_upper(apdu);

        if let Some(provider) = &self.provider {
            if let Some(response_hex) = provider.response_for(&request_hex) {
                return decode_response(&response_hex);
            }
        } else {
            for (pattern, response_hex) in &self.commands {
                if matches_full(pattern, &request_hex)? {
                    return decode_response(response_hex);
                }
            }
        }

        Err(Error::card_communication(request_hex))
    }
}

/// Test a full (not substring) regex match of `input` against `pattern`
///
/// Patterns are compiled lazily so malformed simulation data surfaces
/// at the point of use.
fn matches_full(pattern: &str, input: &str) -> Result<bool> {
    let anchored = format!("^(?:{pattern})$");
    let regex = Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(regex.is_match(input))
}

fn decode_response(response_hex: &str) -> Result<Bytes> {
    hex::decode(response_hex)
        .map(Bytes::from)
        .map_err(|source| Error::InvalidHex {
            value: response_hex.to_string(),
            source,
        })
}

/// Builder for [`SimulatedCard`]
///
/// Power-on data and protocol are mandatory; [`CardBuilder::build`]
/// fails with [`Error::InvalidArgument`] if either was never set.
/// Simulated commands and a response provider are mutually exclusive
/// sources: when a provider is set, table entries are never consulted.
#[derive(Default)]
pub struct CardBuilder {
    power_on_data: Option<Bytes>,
    protocol: Option<String>,
    commands: Vec<(String, String)>,
    provider: Option<Box<dyn ApduResponseProvider>>,
}

impl fmt::Debug for CardBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardBuilder")
            .field("power_on_data", &self.power_on_data)
            .field("protocol", &self.protocol)
            .field("commands", &self.commands.len())
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

impl CardBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated power-on data
    pub fn with_power_on_data(mut self, power_on_data: impl Into<Bytes>) -> Self {
        self.power_on_data = Some(power_on_data.into());
        self
    }

    /// Set the simulated protocol
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Add a simulated command/response pair, both hexadecimal
    ///
    /// The command may be a regex to match a family of APDUs. Entries
    /// are matched in the order they were added, so put specific
    /// patterns before catch-alls.
    pub fn with_simulated_command(
        mut self,
        command: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        let command = command.into().trim().to_string();
        let response = response.into().trim().to_string();
        self.commands.push((command, response));
        self
    }

    /// Set an external response provider
    ///
    /// Takes priority over any simulated commands.
    pub fn with_response_provider<P>(mut self, provider: P) -> Self
    where
        P: ApduResponseProvider + 'static,
    {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Build the simulated card
    pub fn build(self) -> Result<SimulatedCard> {
        let power_on_data = self
            .power_on_data
            .ok_or(Error::InvalidArgument("power-on data"))?;
        let protocol = self.protocol.ok_or(Error::InvalidArgument("protocol"))?;

        Ok(SimulatedCard {
            power_on_data,
            protocol,
            commands: self.commands,
            provider: self.provider,
            physical_channel_open: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMAND_HEX: &str = "1234567890ABCDEFFEDCBA0987654321";
    const RESPONSE_HEX: &str = "9000";

    fn a_card() -> SimulatedCard {
        SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command(COMMAND_HEX, RESPONSE_HEX)
            .build()
            .unwrap()
    }

    #[test]
    fn process_apdu_with_exact_match_returns_response() {
        let card = a_card();
        let response = card.process_apdu(&hex::decode(COMMAND_HEX).unwrap()).unwrap();
        assert_eq!(response, hex::decode(RESPONSE_HEX).unwrap());
    }

    #[test]
    fn process_apdu_with_regex_match_returns_response() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command("1234.*", RESPONSE_HEX)
            .build()
            .unwrap();
        let response = card.process_apdu(&hex::decode(COMMAND_HEX).unwrap()).unwrap();
        assert_eq!(response, hex::decode(RESPONSE_HEX).unwrap());
    }

    #[test]
    fn process_apdu_without_match_fails() {
        let card = a_card();
        let err = card.process_apdu(&[0xDE, 0xAD]).unwrap_err();
        assert!(matches!(err, Error::CardCommunication { .. }));
    }

    #[test]
    fn process_apdu_with_empty_input_returns_empty_response() {
        let card = a_card();
        assert!(card.process_apdu(&[]).unwrap().is_empty());
    }

    #[test]
    fn first_matching_entry_wins() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command("1234.*", "6A82")
            .with_simulated_command(".*", RESPONSE_HEX)
            .build()
            .unwrap();
        let response = card.process_apdu(&hex::decode(COMMAND_HEX).unwrap()).unwrap();
        assert_eq!(response, hex::decode("6A82").unwrap());
    }

    #[test]
    fn pattern_matches_whole_command_only() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command("1234", RESPONSE_HEX)
            .build()
            .unwrap();
        // "1234" is a prefix of the command, not a full match
        let err = card
            .process_apdu(&hex::decode(COMMAND_HEX).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::CardCommunication { .. }));
    }

    #[test]
    fn provider_answers_without_table() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_response_provider(|request: &str| {
                request.starts_with("1234").then(|| "9000".to_string())
            })
            .build()
            .unwrap();
        let response = card.process_apdu(&hex::decode(COMMAND_HEX).unwrap()).unwrap();
        assert_eq!(response, hex::decode(RESPONSE_HEX).unwrap());
    }

    #[test]
    fn provider_takes_priority_over_table() {
        // The provider never answers; the matching table entry must be ignored
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command(COMMAND_HEX, RESPONSE_HEX)
            .with_response_provider(|_: &str| None)
            .build()
            .unwrap();
        let err = card
            .process_apdu(&hex::decode(COMMAND_HEX).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::CardCommunication { .. }));
    }

    #[test]
    fn malformed_pattern_surfaces_at_matching_time() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command("1234(", RESPONSE_HEX)
            .build()
            .unwrap();
        let err = card
            .process_apdu(&hex::decode(COMMAND_HEX).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn malformed_response_hex_surfaces_at_decode_time() {
        let card = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .with_protocol("ISO_14443_4")
            .with_simulated_command(COMMAND_HEX, "not hex")
            .build()
            .unwrap();
        let err = card
            .process_apdu(&hex::decode(COMMAND_HEX).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHex { .. }));
    }

    #[test]
    fn open_close_physical_channel() {
        let mut card = a_card();
        assert!(!card.is_physical_channel_open());
        card.open_physical_channel();
        assert!(card.is_physical_channel_open());
        card.close_physical_channel();
        assert!(!card.is_physical_channel_open());
    }

    #[test]
    fn build_without_power_on_data_fails() {
        let err = SimulatedCard::builder()
            .with_protocol("ISO_14443_4")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("power-on data")));
    }

    #[test]
    fn build_without_protocol_fails() {
        let err = SimulatedCard::builder()
            .with_power_on_data(Bytes::from_static(&[0x3B]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("protocol")));
    }
}

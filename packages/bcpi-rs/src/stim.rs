//! Stimulation control message and its 2-byte wire encoding
//!
//! The BLE stimulation link carries a single unsigned value, big-endian.

use crate::error::{BcpiError, Result};
use serde::{Deserialize, Serialize};

pub const STIM_PAYLOAD_LEN: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StimMessage {
    pub value: u16,
}

impl StimMessage {
    pub fn new(value: u16) -> Self {
        Self { value }
    }

    /// Build from a wider integer, rejecting values that do not fit the wire format
    pub fn from_value(value: u64) -> Result<Self> {
        u16::try_from(value)
            .map(Self::new)
            .map_err(|_| BcpiError::StimValueOutOfRange(value))
    }

    pub fn to_bytes(self) -> [u8; STIM_PAYLOAD_LEN] {
        self.value.to_be_bytes()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let bytes: [u8; STIM_PAYLOAD_LEN] = data
            .try_into()
            .map_err(|_| BcpiError::StimPayloadLength(data.len()))?;
        Ok(Self::new(u16::from_be_bytes(bytes)))
    }
}

impl TryFrom<u64> for StimMessage {
    type Error = BcpiError;

    fn try_from(value: u64) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<u16> for StimMessage {
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        assert_eq!(StimMessage::new(0).to_bytes(), [0x00, 0x00]);
        assert_eq!(StimMessage::new(0xFACE).to_bytes(), [0xFA, 0xCE]);
        assert_eq!(StimMessage::new(1).to_bytes(), [0x00, 0x01]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for value in [0u16, 1, 255, 256, 0xFACE, u16::MAX] {
            let msg = StimMessage::new(value);
            assert_eq!(StimMessage::from_bytes(&msg.to_bytes()).unwrap(), msg);
        }
    }

    #[test]
    fn test_out_of_range_value() {
        assert!(StimMessage::from_value(65_535).is_ok());
        assert!(matches!(
            StimMessage::try_from(65_536u64),
            Err(BcpiError::StimValueOutOfRange(65_536))
        ));
    }

    #[test]
    fn test_wrong_payload_length() {
        assert!(matches!(
            StimMessage::from_bytes(&[0x01]),
            Err(BcpiError::StimPayloadLength(1))
        ));
        assert!(StimMessage::from_bytes(&[0x01, 0x02, 0x03]).is_err());
    }
}

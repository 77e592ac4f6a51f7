use ether_data::DataError;

/// An opaque 16-byte fan-out group identifier.
///
/// Exchanged on the wire as a 32-character lowercase hex string. `BRIDGE`
/// and `BROADCAST` are reserved values recognized by the wire format but,
/// per this relay's chosen semantics, treated as ordinary fan-out groups —
/// there is no special-cased routing for either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel([u8; 16]);

impl Channel {
    pub const BRIDGE: Channel = Channel([0u8; 16]);
    pub const BROADCAST: Channel = Channel([0xffu8; 16]);

    pub fn new(bytes: [u8; 16]) -> Self {
        Channel(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Channel(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Parses the handshake frame: must be exactly 32 lowercase hex
    /// characters decoding to 16 bytes.
    pub fn from_hex(s: &str) -> Result<Self, DataError> {
        if s.len() != 32 || s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(DataError::InvalidChannelHex(s.to_owned()));
        }
        let bytes = hex::decode(s).map_err(|_| DataError::InvalidChannelHex(s.to_owned()))?;
        let array: [u8; 16] = bytes
            .try_into()
            .map_err(|_| DataError::InvalidChannelHex(s.to_owned()))?;
        Ok(Channel(array))
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let c = Channel::random();
        let hex = c.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(Channel::from_hex(&hex).unwrap(), c);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Channel::from_hex("abcd").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        let c = Channel::random();
        let upper = c.to_hex().to_uppercase();
        assert!(Channel::from_hex(&upper).is_err());
    }

    #[test]
    fn reserved_values_are_distinct() {
        assert_ne!(Channel::BRIDGE, Channel::BROADCAST);
    }
}

//! Ethereum address representation and utilities.

use std::fmt;
use std::str::FromStr;

use tiny_keccak::{Hasher, Keccak};

use crate::error::KeygenError;

/// Number of hex digits in an address, without the `0x` prefix.
pub const ADDRESS_HEX_LEN: usize = 40;

/// An Ethereum address (20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Creates an address from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the address as raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the address as a lowercase hex string (without 0x prefix).
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the address with 0x prefix.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    /// Returns the address with checksum encoding (EIP-55), `0x` included.
    ///
    /// This is the canonical textual form used for display, export and
    /// case-sensitive matching.
    pub fn to_checksum(&self) -> String {
        let hex_addr = self.to_hex();
        let mut hasher = Keccak::v256();
        hasher.update(hex_addr.as_bytes());
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);

        let mut checksum = String::with_capacity(ADDRESS_HEX_LEN + 2);
        checksum.push_str("0x");

        for (i, c) in hex_addr.chars().enumerate() {
            let hash_byte = hash[i / 2];
            let hash_nibble = if i % 2 == 0 {
                hash_byte >> 4
            } else {
                hash_byte & 0x0f
            };

            if c.is_ascii_alphabetic() && hash_nibble >= 8 {
                checksum.push(c.to_ascii_uppercase());
            } else {
                checksum.push(c);
            }
        }

        checksum
    }
}

impl FromStr for Address {
    type Err = KeygenError;

    /// Parses 40 hex digits, with or without `0x`. The checksum casing is not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s);
        if digits.len() != ADDRESS_HEX_LEN {
            return Err(KeygenError::InvalidArgument(format!(
                "address must be {} hex characters, got {}",
                ADDRESS_HEX_LEN,
                digits.len()
            )));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| KeygenError::InvalidArgument(format!("address is not hex: {}", e)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

/// Strips a leading `0x` / `0X`, if present.
pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_address() {
        // Test vectors from EIP-55
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let addr: Address = expected.parse().unwrap();
            assert_eq!(addr.to_checksum(), expected);
        }
    }

    #[test]
    fn test_hex_output() {
        let bytes = [0u8; 20];
        let addr = Address::from_bytes(bytes);
        assert_eq!(addr.to_hex(), "0000000000000000000000000000000000000000");
        assert_eq!(
            addr.to_hex_prefixed(),
            "0x0000000000000000000000000000000000000000"
        );
        assert_eq!(
            addr.to_checksum(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_parse_without_prefix() {
        let addr: Address = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(addr.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".repeat(20).parse::<Address>().is_err());
    }
}

//! Ethereum keypair generation.

use rand::RngCore;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use tiny_keccak::{Hasher, Keccak};

use super::{strip_hex_prefix, Address};
use crate::error::KeygenError;

/// Represents an Ethereum keypair (private key + derived address).
///
/// Immutable once produced: there are no setters, and the address is always
/// the one derived from the stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    /// The private key bytes (32 bytes)
    secret_key: [u8; 32],
    /// The derived Ethereum address
    address: Address,
}

impl Keypair {
    /// Generates a new random keypair.
    ///
    /// The secret comes from the thread-local CSPRNG (OS-seeded ChaCha), so
    /// concurrent callers on different threads never share generator state.
    /// Out-of-range candidates (zero or >= the curve order) are redrawn.
    #[inline]
    pub fn generate() -> Result<Self, KeygenError> {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];

        loop {
            rng.try_fill_bytes(&mut bytes)?;
            if let Ok(secret_key) = SecretKey::from_slice(&bytes) {
                return Ok(Self::from_valid_secret(secret_key));
            }
        }
    }

    /// Builds a keypair from an existing secret key.
    pub fn from_secret_key(secret_bytes: [u8; 32]) -> Result<Self, KeygenError> {
        let secret_key = SecretKey::from_slice(&secret_bytes)
            .map_err(|e| KeygenError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_valid_secret(secret_key))
    }

    /// Parses a 64-digit hex private key (with or without `0x`) and re-derives its address.
    pub fn from_private_key_hex(s: &str) -> Result<Self, KeygenError> {
        let digits = strip_hex_prefix(s.trim());
        let mut secret_bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut secret_bytes)
            .map_err(|e| KeygenError::InvalidPrivateKey(e.to_string()))?;
        Self::from_secret_key(secret_bytes)
    }

    fn from_valid_secret(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(SECP256K1, &secret_key);
        Self {
            secret_key: secret_key.secret_bytes(),
            address: derive_address(&public_key),
        }
    }

    /// Returns the private key as a hex string (without 0x prefix).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key)
    }

    /// Returns the private key as `0x`-prefixed hex, the form used in exports.
    pub fn private_key_hex_prefixed(&self) -> String {
        format!("0x{}", self.private_key_hex())
    }

    /// Returns the private key bytes.
    pub fn private_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }

    /// Returns a reference to the derived address.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }
}

/// Derives an Ethereum address from a secp256k1 public key.
///
/// Process:
/// 1. Serialize the public key in uncompressed form (65 bytes)
/// 2. Remove the first byte (0x04 prefix)
/// 3. Hash the remaining 64 bytes with Keccak-256
/// 4. Take the last 20 bytes of the hash
#[inline]
pub fn derive_address(public_key: &PublicKey) -> Address {
    let public_key_bytes = public_key.serialize_uncompressed();

    let mut hasher = Keccak::v256();
    hasher.update(&public_key_bytes[1..]);

    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);

    let mut address_bytes = [0u8; 20];
    address_bytes.copy_from_slice(&hash[12..]);

    Address::from_bytes(address_bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn key_one() -> [u8; 32] {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        secret
    }

    #[test]
    fn test_keypair_generation() {
        let keypair = Keypair::generate().unwrap();
        assert_eq!(keypair.private_key_bytes().len(), 32);
        assert_eq!(keypair.address().as_bytes().len(), 20);
        assert_ne!(keypair.private_key_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_deterministic_address() {
        let keypair = Keypair::from_secret_key(key_one()).unwrap();

        // Address for private key = 1 is well-known
        assert_eq!(
            keypair.address().to_hex(),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(
            keypair.address().to_checksum(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_rederived_address_matches() {
        for _ in 0..200 {
            let keypair = Keypair::generate().unwrap();
            let again = Keypair::from_secret_key(*keypair.private_key_bytes()).unwrap();
            assert_eq!(again.address(), keypair.address());
        }
    }

    #[test]
    fn test_private_key_hex_round_trip() {
        let keypair = Keypair::generate().unwrap();
        let prefixed = keypair.private_key_hex_prefixed();
        assert!(prefixed.starts_with("0x"));
        assert_eq!(prefixed.len(), 66);

        let parsed = Keypair::from_private_key_hex(&prefixed).unwrap();
        assert_eq!(parsed, keypair);
        let parsed = Keypair::from_private_key_hex(&keypair.private_key_hex()).unwrap();
        assert_eq!(parsed, keypair);
    }

    #[test]
    fn test_rejects_out_of_range_secret() {
        assert!(matches!(
            Keypair::from_secret_key([0u8; 32]),
            Err(KeygenError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            Keypair::from_secret_key([0xff; 32]),
            Err(KeygenError::InvalidPrivateKey(_))
        ));
        assert!(Keypair::from_private_key_hex("0x1234").is_err());
    }

    #[test]
    fn test_generated_keys_are_distinct() {
        let keys: HashSet<[u8; 32]> = (0..1000)
            .map(|_| *Keypair::generate().unwrap().private_key_bytes())
            .collect();
        assert_eq!(keys.len(), 1000);
    }
}

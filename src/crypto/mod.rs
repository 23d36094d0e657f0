//! Cryptographic operations for Ethereum key and address generation.
//!
//! This module provides:
//! - Secure random key generation using secp256k1
//! - Ethereum address derivation using Keccak-256
//! - EIP-55 checksum rendering

mod address;
mod keypair;

pub(crate) use address::strip_hex_prefix;
pub use address::{Address, ADDRESS_HEX_LEN};
pub use keypair::{derive_address, Keypair};

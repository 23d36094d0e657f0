//! JSON export and import of generated keypairs.
//!
//! The file layout is a single object with parallel `privateKeys` and
//! `addresses` arrays in generation order, plus the optional
//! `searchPrivateKey` / `searchAddress` of a vanity search result:
//!
//! ```json
//! {
//!   "privateKeys": ["0x…"],
//!   "addresses": ["0x…"],
//!   "searchPrivateKey": "0x…",
//!   "searchAddress": "0x…"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::{Address, Keypair};
use crate::error::KeygenError;

/// Conventional file name for exports.
pub const DEFAULT_EXPORT_FILE: &str = "eth_keys.json";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed export: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Key(#[from] KeygenError),

    #[error("Export lists {keys} private keys but {addresses} addresses")]
    LengthMismatch { keys: usize, addresses: usize },

    #[error("Entry {index}: address {stored} does not belong to its private key (derived {derived})")]
    AddressMismatch {
        index: usize,
        stored: String,
        derived: String,
    },
}

/// One keypair in its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// `0x`-prefixed lowercase hex
    pub private_key: String,
    /// EIP-55 checksummed, `0x`-prefixed
    pub address: String,
}

impl From<&Keypair> for KeyRecord {
    fn from(keypair: &Keypair) -> Self {
        Self {
            private_key: keypair.private_key_hex_prefixed(),
            address: keypair.address().to_checksum(),
        }
    }
}

impl KeyRecord {
    /// Re-derives the keypair and checks the stored address against it.
    pub fn to_keypair(&self) -> Result<Keypair, ExportError> {
        self.verified(0)
    }

    fn verified(&self, index: usize) -> Result<Keypair, ExportError> {
        let keypair = Keypair::from_private_key_hex(&self.private_key)?;
        let stored: Address = self.address.parse()?;
        if &stored != keypair.address() {
            return Err(ExportError::AddressMismatch {
                index,
                stored: self.address.clone(),
                derived: keypair.address().to_checksum(),
            });
        }
        Ok(keypair)
    }
}

/// Contents of an export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExport {
    pub private_keys: Vec<String>,
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_address: Option<String>,
}

impl KeyExport {
    /// Builds an export of a batch, preserving order.
    pub fn from_keypairs(keypairs: &[Keypair]) -> Self {
        let (private_keys, addresses): (Vec<_>, Vec<_>) = keypairs
            .iter()
            .map(|k| (k.private_key_hex_prefixed(), k.address().to_checksum()))
            .unzip();

        Self {
            private_keys,
            addresses,
            ..Self::default()
        }
    }

    /// Attaches a vanity search result.
    pub fn with_search_result(mut self, keypair: &Keypair) -> Self {
        let record = KeyRecord::from(keypair);
        self.search_private_key = Some(record.private_key);
        self.search_address = Some(record.address);
        self
    }

    /// Returns the batch entries as `{privateKey, address}` pairs, in order.
    pub fn records(&self) -> Result<Vec<KeyRecord>, ExportError> {
        if self.private_keys.len() != self.addresses.len() {
            return Err(ExportError::LengthMismatch {
                keys: self.private_keys.len(),
                addresses: self.addresses.len(),
            });
        }

        Ok(self
            .private_keys
            .iter()
            .zip(&self.addresses)
            .map(|(private_key, address)| KeyRecord {
                private_key: private_key.clone(),
                address: address.clone(),
            })
            .collect())
    }

    /// Returns the search result, if both of its fields are present.
    ///
    /// Files written when no search ran may carry the fields as empty
    /// strings; those count as absent.
    pub fn search_record(&self) -> Option<KeyRecord> {
        let present = |field: &Option<String>| field.clone().filter(|s| !s.is_empty());
        match (present(&self.search_private_key), present(&self.search_address)) {
            (Some(private_key), Some(address)) => Some(KeyRecord {
                private_key,
                address,
            }),
            _ => None,
        }
    }

    /// Re-derives every batch keypair, failing on the first address that
    /// does not belong to its private key.
    pub fn verify(&self) -> Result<Vec<Keypair>, ExportError> {
        let keypairs = self
            .records()?
            .iter()
            .enumerate()
            .map(|(index, record)| record.verified(index))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(record) = self.search_record() {
            record.verified(keypairs.len())?;
        }
        Ok(keypairs)
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the export as pretty-printed JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), keys = self.private_keys.len(), "wrote export");
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

//! # eth_keygen
//!
//! Ethereum keypair generation: bulk generation and vanity search.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation and address derivation
//! - `matcher`: Prefix/suffix constraints on addresses
//! - `batch`: Bulk generation of independent keypairs
//! - `worker`: Parallel, cancellable vanity search
//! - `export`: JSON export/import of keypairs
//! - `config`: Runtime configuration

pub mod batch;
pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub mod matcher;
pub mod worker;

pub use batch::generate_batch;
pub use config::Config;
pub use crypto::{Address, Keypair};
pub use error::KeygenError;
pub use export::{ExportError, KeyExport, KeyRecord, DEFAULT_EXPORT_FILE};
pub use matcher::{matches, SearchQuery};
pub use worker::{
    CancelToken, RecvTimeoutError, SearchCoordinator, SearchEvent, SearchHandle, SearchOptions, SearchState,
    SearchStatus,
};

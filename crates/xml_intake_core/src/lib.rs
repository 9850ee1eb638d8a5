//! Shared XML intake domain primitives.
//!
//! This crate owns the deterministic parts of the intake pipeline: message
//! contracts, the file-type gate, the streaming `<docId>` scanner, canonical key
//! derivation and document extraction. It intentionally excludes AWS SDK and
//! Lambda runtime concerns, which live in `xml_intake_lambda`.

pub mod contract;
pub mod error;
pub mod extract;
pub mod filter;
pub mod gate;
pub mod scanner;
pub mod storage_keys;

pub use error::IntakeError;

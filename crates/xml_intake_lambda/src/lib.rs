//! AWS-oriented adapters and handlers for the XML intake pipeline.
//!
//! This crate owns runtime integration details (Lambda handlers, queue and
//! topic decoding, object storage, publishing, HTTP forwarding) on top of the
//! deterministic primitives in `xml_intake_core`.

pub mod adapters;
pub mod config;
pub mod deadline;
pub mod handlers;
pub mod logging;

pub mod chunked_reader;
pub mod forwarder;
pub mod ledger;
pub mod memory;
pub mod object_store;
pub mod publisher;
pub mod s3;

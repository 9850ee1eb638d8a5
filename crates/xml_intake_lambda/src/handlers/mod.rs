pub mod filter;
pub mod forward;
pub mod rename;

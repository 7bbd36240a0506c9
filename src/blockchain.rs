// Thin re-export module: implementation is in `blockchain/core.rs` so block
// assembly and chain validation can live in separate files.

pub mod core;
pub use self::core::*;

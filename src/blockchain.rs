// Thin re-export module: entities and sealing rules live in `blockchain/core`,
// the persistent multi-index view of the chain in `blockchain/repository`.

pub mod core;
pub mod repository;

pub use core::*;
pub use repository::*;

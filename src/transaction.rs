//! Transaction module: the entity lives in `types`, sealing helpers on the type itself

pub mod types;

pub use types::*;

// core.rs splits the block entity, the Merkle tree and the validator into submodules.
pub mod chain;
pub mod merkle;
pub mod validation;

pub use chain::*;
pub use merkle::TxSeal;
pub use validation::*;

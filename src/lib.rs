//! Sealchain - integrity and persistence core of a minimal blockchain ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Block entity, Merkle sealing, validator and block repository
//! - [`transaction`] - Transaction entity
//! - [`mempool`] - Pool of uncommitted transactions
//!
//! ## Cryptography & Encoding
//! - [`crypto`] - SHA-256 seals and hex/base64 helpers
//! - [`codec`] - Serialization of stored entities
//!
//! ## Storage
//! - [`persistence`] - Key-value stores (SQLite, in-memory) and partition handles
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Cryptography & Encoding
// ============================================================================
pub mod codec;
pub mod crypto;

// ============================================================================
// Storage
// ============================================================================
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod logging;

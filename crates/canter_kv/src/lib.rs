//! # Canter KV
//!
//! Sorted key-value backend trait and implementations for Canter.
//!
//! This crate provides the lowest-level storage abstraction the Canter core
//! builds on. Backends are **sorted byte-key stores** - they order keys
//! lexicographically and know nothing about idents, facts, or indexes.
//!
//! ## Design Principles
//!
//! - Writes happen inside `update` closures and apply atomically
//! - Reads happen against consistent `view` snapshots
//! - Prefix scans iterate in key order and may stop early
//! - A backend supplies monotonic sequences for ID allocation
//! - Backends must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - For testing and ephemeral databases
//!
//! ## Example
//!
//! ```rust
//! use canter_kv::{KvBackend, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! backend
//!     .update(&mut |txn| txn.put(b"a/1", b"one"))
//!     .unwrap();
//!
//! backend
//!     .view(&mut |txn| {
//!         assert_eq!(txn.get(b"a/1")?, Some(b"one".to_vec()));
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::{KvBackend, ReadTxn, ScanNext, Sequence, WriteTxn};
pub use error::{KvError, KvResult};
pub use memory::MemoryBackend;

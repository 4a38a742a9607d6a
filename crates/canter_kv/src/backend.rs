//! Backend trait definitions.

use crate::error::KvResult;

/// Whether a prefix scan should keep producing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanNext {
    /// Produce the next entry.
    Continue,
    /// Terminate the scan early.
    Stop,
}

/// A consistent read snapshot of the store.
pub trait ReadTxn {
    /// Returns the value stored at `key`, if any.
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Scans all entries whose key starts with `prefix`, in ascending key
    /// order, invoking `visit` per entry.
    ///
    /// Iteration ends when the prefix is exhausted or `visit` returns
    /// [`ScanNext::Stop`].
    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<ScanNext>,
    ) -> KvResult<()>;
}

/// A write transaction over the store.
///
/// All `put` calls are applied atomically when the enclosing `update`
/// closure returns `Ok`; none are applied otherwise.
pub trait WriteTxn: ReadTxn {
    /// Stages a key/value pair for atomic application.
    ///
    /// Within the same transaction, a staged write is visible to `get` and
    /// `scan_prefix`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()>;
}

/// A monotonic value allocator.
///
/// Sequences lease blocks of values from durable storage so that most
/// allocations avoid a backend round-trip. Values are never reused, even
/// across backend reopen.
pub trait Sequence: Send + Sync {
    /// Returns the next value in the sequence.
    fn next(&self) -> KvResult<u64>;
}

/// A sorted key-value store.
///
/// # Invariants
///
/// - Keys are ordered bytewise; `scan_prefix` yields entries in that order
/// - `update` applies all staged writes atomically or none of them
/// - `view` observes a consistent snapshot for its whole duration
/// - Sequences obtained via [`KvBackend::sequence`] are monotonic and
///   shared process-wide for a given key
///
/// # Implementors
///
/// - [`crate::MemoryBackend`] - For testing and ephemeral databases
pub trait KvBackend: Send + Sync {
    /// Runs `f` inside a write transaction.
    ///
    /// Writes staged by `f` are applied atomically iff `f` returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a backend error if the commit
    /// fails.
    fn update(&self, f: &mut dyn FnMut(&mut dyn WriteTxn) -> KvResult<()>) -> KvResult<()>;

    /// Runs `f` against a consistent read snapshot.
    fn view(&self, f: &mut dyn FnMut(&dyn ReadTxn) -> KvResult<()>) -> KvResult<()>;

    /// Returns the shared monotonic sequence stored under `key`.
    ///
    /// `prefetch` values are leased per durable round-trip. Leased but
    /// unused values are discarded on drop, so observed values may skip
    /// ahead but never repeat.
    fn sequence(&self, key: &[u8], prefetch: u64) -> KvResult<Box<dyn Sequence>>;
}

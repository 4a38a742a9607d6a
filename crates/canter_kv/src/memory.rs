//! In-memory backend for testing and ephemeral databases.

use crate::backend::{KvBackend, ReadTxn, ScanNext, Sequence, WriteTxn};
use crate::error::{KvError, KvResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory sorted KV backend.
///
/// This backend stores all data in a `BTreeMap` and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// The backend is thread-safe. `update` holds the tree's write lock for the
/// duration of the closure, so writers are serialized; `view` runs under the
/// read lock and observes a stable snapshot.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<Tree>>,
}

impl MemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the store.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn update(&self, f: &mut dyn FnMut(&mut dyn WriteTxn) -> KvResult<()>) -> KvResult<()> {
        let mut data = self.data.write();
        let mut txn = MemoryWriteTxn {
            base: &*data,
            staged: BTreeMap::new(),
        };
        f(&mut txn)?;
        let staged = txn.staged;
        for (key, value) in staged {
            data.insert(key, value);
        }
        Ok(())
    }

    fn view(&self, f: &mut dyn FnMut(&dyn ReadTxn) -> KvResult<()>) -> KvResult<()> {
        let data = self.data.read();
        let txn = MemoryReadTxn { base: &*data };
        f(&txn)
    }

    fn sequence(&self, key: &[u8], prefetch: u64) -> KvResult<Box<dyn Sequence>> {
        if prefetch == 0 {
            return Err(KvError::invalid_operation("sequence prefetch must be > 0"));
        }
        Ok(Box::new(MemorySequence {
            data: Arc::clone(&self.data),
            key: key.to_vec(),
            prefetch,
            lease: Mutex::new(Lease { next: 0, limit: 0 }),
        }))
    }
}

struct MemoryReadTxn<'a> {
    base: &'a Tree,
}

impl ReadTxn for MemoryReadTxn<'_> {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        Ok(self.base.get(key).cloned())
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<ScanNext>,
    ) -> KvResult<()> {
        for (key, value) in self.base.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if visit(key, value)? == ScanNext::Stop {
                break;
            }
        }
        Ok(())
    }
}

struct MemoryWriteTxn<'a> {
    base: &'a Tree,
    staged: Tree,
}

impl ReadTxn for MemoryWriteTxn<'_> {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        if let Some(value) = self.staged.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.base.get(key).cloned())
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> KvResult<ScanNext>,
    ) -> KvResult<()> {
        // Merge-iterate the committed tree and the staged writes so the
        // transaction reads its own uncommitted puts.
        let mut base = self
            .base
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .peekable();
        let mut staged = self
            .staged
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .peekable();

        loop {
            let ord = match (base.peek(), staged.peek()) {
                (None, None) => break,
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (Some((bk, _)), Some((sk, _))) => bk.cmp(sk),
            };
            let (key, value) = match ord {
                std::cmp::Ordering::Less => base.next().expect("peeked"),
                std::cmp::Ordering::Greater => staged.next().expect("peeked"),
                std::cmp::Ordering::Equal => {
                    // Staged write shadows the committed entry.
                    base.next();
                    staged.next().expect("peeked")
                }
            };
            if visit(key, value)? == ScanNext::Stop {
                break;
            }
        }
        Ok(())
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.staged.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}

struct Lease {
    next: u64,
    limit: u64,
}

/// Sequence backed by the in-memory tree.
///
/// The durable high-water mark lives in the tree under the sequence key, so
/// a sequence reopened over the same backend resumes past every leased
/// block.
struct MemorySequence {
    data: Arc<RwLock<Tree>>,
    key: Vec<u8>,
    prefetch: u64,
    lease: Mutex<Lease>,
}

impl Sequence for MemorySequence {
    fn next(&self) -> KvResult<u64> {
        let mut lease = self.lease.lock();
        if lease.next == lease.limit {
            let mut data = self.data.write();
            let durable = match data.get(&self.key) {
                Some(raw) => {
                    let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| {
                        KvError::invalid_operation("malformed sequence value")
                    })?;
                    u64::from_be_bytes(bytes)
                }
                None => 0,
            };
            let limit = durable.checked_add(self.prefetch).ok_or_else(|| {
                KvError::sequence_exhausted(format!("sequence at {durable} cannot lease more"))
            })?;
            data.insert(self.key.clone(), limit.to_be_bytes().to_vec());
            lease.next = durable;
            lease.limit = limit;
        }
        let value = lease.next;
        lease.next += 1;
        Ok(value)
    }
}

//! KV-backed implementation of the ident store, ID source, and indexer.

mod ident;
mod index;

use crate::error::CoreResult;
use crate::id::{Id, IdSource};
use canter_kv::{KvBackend, Sequence};
use std::sync::Arc;

// Key namespace prefixes. Each table lives under a single leading byte.
pub(crate) const NS_IDENTS: u8 = 0x00;
pub(crate) const NS_IDENT_ID_BY_NAME: u8 = 0x01;
pub(crate) const NS_EAVT: u8 = 0x02;
pub(crate) const NS_AEVT: u8 = 0x03;
pub(crate) const NS_AVET: u8 = 0x04;
pub(crate) const NS_VAET: u8 = 0x05;
pub(crate) const NS_ID_SEQ: u8 = 0x06;

const ID_SEQ_PREFETCH: u64 = 100;

/// Implements the storage capabilities the connection consumes - ident
/// tables, the four covering indexes, and ID allocation - over any sorted
/// [`KvBackend`].
pub struct KvStore {
    backend: Arc<dyn KvBackend>,
    id_seq: Box<dyn Sequence>,
}

impl KvStore {
    /// Opens the store over a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot supply the ID sequence.
    pub fn new(backend: Arc<dyn KvBackend>) -> CoreResult<Self> {
        let id_seq = backend.sequence(&[NS_ID_SEQ], ID_SEQ_PREFETCH)?;
        Ok(Self { backend, id_seq })
    }

    pub(crate) fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }
}

impl IdSource for KvStore {
    fn next_id(&self) -> CoreResult<Id> {
        // The sequence numbers from 0, but 0 is the unresolved sentinel.
        loop {
            let raw = self.id_seq.next()?;
            if raw != 0 {
                return Ok(Id::new(raw as i64));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canter_kv::MemoryBackend;

    #[test]
    fn next_id_skips_the_unresolved_sentinel() {
        let store = KvStore::new(Arc::new(MemoryBackend::new())).unwrap();
        assert_eq!(store.next_id().unwrap(), Id::new(1));
        assert_eq!(store.next_id().unwrap(), Id::new(2));
    }

    #[test]
    fn ids_are_unique_across_store_handles() {
        let backend = Arc::new(MemoryBackend::new());
        let first = KvStore::new(Arc::clone(&backend) as Arc<dyn KvBackend>).unwrap();
        let a = first.next_id().unwrap();
        drop(first);

        let second = KvStore::new(backend).unwrap();
        let b = second.next_id().unwrap();
        assert!(b > a);
    }
}

//! Ident table persistence.
//!
//! Two tables back the ident registry:
//!
//! - `NS_IDENTS ‖ id(8) ‖ name` with an empty value. The table is a
//!   covering sorted set; both halves of the binding live in the key.
//! - `NS_IDENT_ID_BY_NAME ‖ name` → `id(8)` for reverse lookup.

use crate::error::{CoreError, CoreResult};
use crate::id::Id;
use crate::ident::{Ident, IdentStore};
use crate::kvstore::{KvStore, NS_IDENTS, NS_IDENT_ID_BY_NAME};
use canter_kv::ScanNext;

fn idents_key(id: Id, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + name.len());
    key.push(NS_IDENTS);
    key.extend_from_slice(&id.to_key_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

fn id_by_name_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(NS_IDENT_ID_BY_NAME);
    key.extend_from_slice(name.as_bytes());
    key
}

fn parse_idents_key(key: &[u8]) -> CoreResult<Ident> {
    if key.len() < 9 {
        return Err(CoreError::corrupt("ident key shorter than id prefix"));
    }
    let id = Id::from_key_bytes(key[1..9].try_into().expect("checked length"));
    let name = std::str::from_utf8(&key[9..])
        .map_err(|_| CoreError::corrupt("ident name is not UTF-8"))?;
    Ok(Ident::new(id, name))
}

impl IdentStore for KvStore {
    fn load_idents(&self) -> CoreResult<Vec<Ident>> {
        let mut raw_keys: Vec<Vec<u8>> = Vec::new();
        self.backend().view(&mut |txn| {
            txn.scan_prefix(&[NS_IDENTS], &mut |key, _| {
                raw_keys.push(key.to_vec());
                Ok(ScanNext::Continue)
            })
        })?;

        raw_keys.iter().map(|key| parse_idents_key(key)).collect()
    }

    fn lookup_ident_ids(&self, names: &[&str]) -> CoreResult<Vec<Id>> {
        let mut raw: Vec<Option<Vec<u8>>> = Vec::with_capacity(names.len());
        self.backend().view(&mut |txn| {
            for name in names {
                raw.push(txn.get(&id_by_name_key(name))?);
            }
            Ok(())
        })?;

        names
            .iter()
            .zip(raw)
            .map(|(name, value)| match value {
                Some(bytes) => {
                    let bytes: [u8; 8] = bytes
                        .as_slice()
                        .try_into()
                        .map_err(|_| CoreError::corrupt("ident id value is not 8 bytes"))?;
                    Ok(Id::from_key_bytes(bytes))
                }
                None => Err(CoreError::no_such_ident(format!("name {name:?}"))),
            })
            .collect()
    }

    fn lookup_ident_names(&self, ids: &[Id]) -> CoreResult<Vec<String>> {
        let mut found: Vec<Option<Ident>> = Vec::with_capacity(ids.len());
        self.backend().view(&mut |txn| {
            for id in ids {
                let mut prefix = Vec::with_capacity(9);
                prefix.push(NS_IDENTS);
                prefix.extend_from_slice(&id.to_key_bytes());

                let mut first: Option<Vec<u8>> = None;
                txn.scan_prefix(&prefix, &mut |key, _| {
                    first = Some(key.to_vec());
                    Ok(ScanNext::Stop)
                })?;
                match first {
                    Some(key) => found.push(Some(parse_idents_key(&key).map_err(|err| {
                        canter_kv::KvError::app(err.to_string())
                    })?)),
                    None => found.push(None),
                }
            }
            Ok(())
        })?;

        ids.iter()
            .zip(found)
            .map(|(id, ident)| match ident {
                Some(ident) => Ok(ident.name),
                None => Err(CoreError::no_such_ident(format!("id {id}"))),
            })
            .collect()
    }

    fn store_ident(&self, ident: &Ident) -> CoreResult<()> {
        let name_key = id_by_name_key(&ident.name);
        let id_bytes = ident.id.to_key_bytes();

        let mut already_bound = false;
        self.backend().update(&mut |txn| {
            if let Some(existing) = txn.get(&name_key)? {
                if existing != id_bytes {
                    already_bound = true;
                    return Ok(());
                }
            }
            txn.put(&idents_key(ident.id, &ident.name), &[])?;
            txn.put(&name_key, &id_bytes)?;
            Ok(())
        })?;

        if already_bound {
            return Err(CoreError::ident_already_exists(ident.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canter_kv::MemoryBackend;
    use std::sync::Arc;

    fn store() -> KvStore {
        KvStore::new(Arc::new(MemoryBackend::new())).unwrap()
    }

    #[test]
    fn store_and_lookup_by_name_and_id() {
        let store = store();
        let ident = Ident::new(Id::new(17), "person/email");
        store.store_ident(&ident).unwrap();

        assert_eq!(
            store.lookup_ident_ids(&["person/email"]).unwrap(),
            vec![Id::new(17)]
        );
        assert_eq!(
            store.lookup_ident_names(&[Id::new(17)]).unwrap(),
            vec!["person/email".to_string()]
        );
    }

    #[test]
    fn lookup_unknown_name_fails() {
        let store = store();
        let err = store.lookup_ident_ids(&["missing/name"]).unwrap_err();
        assert!(matches!(err, CoreError::NoSuchIdent { .. }));
    }

    #[test]
    fn lookup_unknown_id_fails() {
        let store = store();
        let err = store.lookup_ident_names(&[Id::new(404)]).unwrap_err();
        assert!(matches!(err, CoreError::NoSuchIdent { .. }));
    }

    #[test]
    fn load_idents_returns_all_bindings() {
        let store = store();
        store.store_ident(&Ident::new(Id::new(1), "a/one")).unwrap();
        store.store_ident(&Ident::new(Id::new(2), "a/two")).unwrap();

        let mut loaded = store.load_idents().unwrap();
        loaded.sort_by_key(|ident| ident.id);
        assert_eq!(
            loaded,
            vec![Ident::new(Id::new(1), "a/one"), Ident::new(Id::new(2), "a/two")]
        );
    }

    #[test]
    fn rebinding_a_name_is_rejected() {
        let store = store();
        store.store_ident(&Ident::new(Id::new(1), "a/one")).unwrap();

        let err = store
            .store_ident(&Ident::new(Id::new(2), "a/one"))
            .unwrap_err();
        assert!(matches!(err, CoreError::IdentAlreadyExists { .. }));

        // Re-storing the identical binding is a no-op.
        store.store_ident(&Ident::new(Id::new(1), "a/one")).unwrap();
    }
}

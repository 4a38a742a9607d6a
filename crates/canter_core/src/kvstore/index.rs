//! The four covering indexes over the KV backend.
//!
//! Key and value layouts (all IDs big-endian 8 bytes, `enc(V)` the tuple
//! encoding):
//!
//! | Index | Key                          | Value                     |
//! |-------|------------------------------|---------------------------|
//! | EAVT  | `0x02 ‖ E ‖ A ‖ enc(V)`      | `mode ‖ tx ‖ enc(V)`      |
//! | AEVT  | `0x03 ‖ A ‖ E ‖ enc(V)`      | `mode ‖ tx ‖ enc(V)`      |
//! | AVET  | `0x04 ‖ A ‖ enc(V) ‖ E`      | `mode ‖ tx ‖ E`           |
//! | VAET  | `0x05 ‖ enc(V) ‖ A ‖ E`      | `mode ‖ tx ‖ E`           |
//!
//! Because the full `(E, A, V)` triple is part of every key, distinct
//! values for a cardinality/many attribute occupy distinct keys, and a
//! retraction lands exactly on its addition's key with a later tx and a
//! different mode byte. Scans skip non-addition entries, which hides
//! retracted facts without any read-side merging.

use crate::error::{CoreError, CoreResult};
use crate::fact::{AssertMode, Fact, ResolvedAssertion};
use crate::id::Id;
use crate::index::Indexer;
use crate::kvstore::{KvStore, NS_AEVT, NS_AVET, NS_EAVT, NS_VAET};
use crate::stream::FactStream;
use canter_kv::ScanNext;
use canter_tuple::{decode_value, encode_value, Value};
use tracing::debug;

impl Indexer for KvStore {
    fn write(&self, assertions: &[ResolvedAssertion]) -> CoreResult<()> {
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(assertions.len() * 4);
        for assertion in assertions {
            let fact = &assertion.fact;
            debug_assert!(!fact.entity.is_unresolved() && !fact.tx.is_unresolved());

            let enc = encode_value(&fact.value);
            let e = fact.entity.to_key_bytes();
            let a = fact.attribute.to_key_bytes();
            let mode = assertion.mode.as_byte();
            let tx = fact.tx.to_key_bytes();

            let mut fact_value = Vec::with_capacity(9 + enc.len());
            fact_value.push(mode);
            fact_value.extend_from_slice(&tx);
            fact_value.extend_from_slice(&enc);

            let mut entity_value = Vec::with_capacity(17);
            entity_value.push(mode);
            entity_value.extend_from_slice(&tx);
            entity_value.extend_from_slice(&e);

            entries.push((
                concat_key(NS_EAVT, &[&e, &a, &enc]),
                fact_value.clone(),
            ));
            entries.push((concat_key(NS_AEVT, &[&a, &e, &enc]), fact_value));
            entries.push((
                concat_key(NS_AVET, &[&a, &enc, &e]),
                entity_value.clone(),
            ));
            entries.push((concat_key(NS_VAET, &[&enc, &a, &e]), entity_value));
        }

        self.backend().update(&mut |txn| {
            for (key, value) in &entries {
                txn.put(key, value)?;
            }
            Ok(())
        })?;

        debug!(count = assertions.len(), "wrote assertion batch");
        Ok(())
    }

    fn scan_eavt(&self, entity: Id, attribute: Option<Id>) -> CoreResult<FactStream> {
        let mut prefix = vec![NS_EAVT];
        prefix.extend_from_slice(&entity.to_key_bytes());
        if let Some(attribute) = attribute {
            prefix.extend_from_slice(&attribute.to_key_bytes());
        }

        let entries = self.scan_raw(&prefix)?;
        let mut facts = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let attribute = id_at(&key, 9)?;
            if let Some((tx, value)) = decode_fact_value(&value)? {
                facts.push(Fact {
                    entity,
                    attribute,
                    value,
                    tx,
                });
            }
        }
        Ok(FactStream::from_facts(facts))
    }

    fn scan_aevt(&self, attribute: Id, entity: Option<Id>) -> CoreResult<FactStream> {
        let mut prefix = vec![NS_AEVT];
        prefix.extend_from_slice(&attribute.to_key_bytes());
        if let Some(entity) = entity {
            prefix.extend_from_slice(&entity.to_key_bytes());
        }

        let entries = self.scan_raw(&prefix)?;
        let mut facts = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let entity = id_at(&key, 9)?;
            if let Some((tx, value)) = decode_fact_value(&value)? {
                facts.push(Fact {
                    entity,
                    attribute,
                    value,
                    tx,
                });
            }
        }
        Ok(FactStream::from_facts(facts))
    }

    fn scan_avet(&self, attribute: Id, value: &Value) -> CoreResult<FactStream> {
        let mut prefix = vec![NS_AVET];
        prefix.extend_from_slice(&attribute.to_key_bytes());
        prefix.extend_from_slice(&encode_value(value));

        let entries = self.scan_raw(&prefix)?;
        let mut facts = Vec::with_capacity(entries.len());
        for (_, stored) in entries {
            if let Some((tx, entity)) = decode_entity_value(&stored)? {
                facts.push(Fact {
                    entity,
                    attribute,
                    value: value.clone(),
                    tx,
                });
            }
        }
        Ok(FactStream::from_facts(facts))
    }

    fn scan_vaet(&self, value: &Value, attribute: Option<Id>) -> CoreResult<FactStream> {
        let enc = encode_value(value);
        let mut prefix = vec![NS_VAET];
        prefix.extend_from_slice(&enc);
        if let Some(attribute) = attribute {
            prefix.extend_from_slice(&attribute.to_key_bytes());
        }

        let entries = self.scan_raw(&prefix)?;
        let mut facts = Vec::with_capacity(entries.len());
        for (key, stored) in entries {
            let attribute = match attribute {
                Some(attribute) => attribute,
                None => id_at(&key, 1 + enc.len())?,
            };
            if let Some((tx, entity)) = decode_entity_value(&stored)? {
                facts.push(Fact {
                    entity,
                    attribute,
                    value: value.clone(),
                    tx,
                });
            }
        }
        Ok(FactStream::from_facts(facts))
    }
}

impl KvStore {
    /// Collects raw `(key, value)` pairs under a prefix inside one view.
    fn scan_raw(&self, prefix: &[u8]) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        self.backend().view(&mut |txn| {
            txn.scan_prefix(prefix, &mut |key, value| {
                entries.push((key.to_vec(), value.to_vec()));
                Ok(ScanNext::Continue)
            })
        })?;
        Ok(entries)
    }
}

fn concat_key(ns: u8, parts: &[&[u8]]) -> Vec<u8> {
    let len = 1 + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.push(ns);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

fn id_at(key: &[u8], offset: usize) -> CoreResult<Id> {
    let bytes: [u8; 8] = key
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| CoreError::corrupt("index key too short for id field"))?;
    Ok(Id::from_key_bytes(bytes))
}

/// Splits a `mode ‖ tx ‖ enc(V)` stored value. Returns `None` for
/// non-addition modes, which scans skip.
fn decode_fact_value(stored: &[u8]) -> CoreResult<Option<(Id, Value)>> {
    let (mode, tx) = decode_mode_and_tx(stored)?;
    if mode != AssertMode::Addition {
        return Ok(None);
    }
    let (value, _) = decode_value(&stored[9..])?;
    Ok(Some((tx, value)))
}

/// Splits a `mode ‖ tx ‖ E` stored value. Returns `None` for non-addition
/// modes.
fn decode_entity_value(stored: &[u8]) -> CoreResult<Option<(Id, Id)>> {
    let (mode, tx) = decode_mode_and_tx(stored)?;
    if mode != AssertMode::Addition {
        return Ok(None);
    }
    Ok(Some((tx, id_at(stored, 9)?)))
}

fn decode_mode_and_tx(stored: &[u8]) -> CoreResult<(AssertMode, Id)> {
    if stored.len() < 9 {
        return Err(CoreError::corrupt("stored index value shorter than header"));
    }
    let mode = AssertMode::from_byte(stored[0])
        .ok_or_else(|| CoreError::corrupt(format!("invalid mode byte {:#04x}", stored[0])))?;
    let tx = id_at(stored, 1)?;
    Ok((mode, tx))
}

//! The index writer/scanner contract.

use crate::error::CoreResult;
use crate::fact::ResolvedAssertion;
use crate::stream::FactStream;
use canter_tuple::{Id, Value};

/// Writes resolved assertions into the four covering indexes and scans them
/// back out.
///
/// All four indexes (EAVT, AEVT, AVET, VAET) are maintained on every write.
/// Scans yield only addition-mode entries; retracted and redacted facts are
/// skipped during iteration.
pub trait Indexer: Send + Sync {
    /// Atomically commits a batch of resolved assertions.
    ///
    /// No reader ever observes a partial batch.
    fn write(&self, assertions: &[ResolvedAssertion]) -> CoreResult<()>;

    /// Scans facts about one entity, optionally restricted to one
    /// attribute. Facts come back in attribute-ID order.
    fn scan_eavt(&self, entity: Id, attribute: Option<Id>) -> CoreResult<FactStream>;

    /// Attribute-major scan: all facts bearing `attribute`, optionally
    /// restricted to one entity.
    fn scan_aevt(&self, attribute: Id, entity: Option<Id>) -> CoreResult<FactStream>;

    /// Point lookup by attribute and value; used for unique-key resolution.
    fn scan_avet(&self, attribute: Id, value: &Value) -> CoreResult<FactStream>;

    /// Reverse-reference scan: facts carrying `value`, optionally
    /// restricted to one attribute ("which entities point at X?").
    fn scan_vaet(&self, value: &Value, attribute: Option<Id>) -> CoreResult<FactStream>;
}

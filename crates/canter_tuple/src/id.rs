//! Entity identifier.

use std::fmt;

/// Identifier for an entity or ident.
///
/// IDs are signed 64-bit integers. Positive IDs are allocated by the
/// backend's monotonic sequence; negative IDs are reserved for
/// system-managed entities. `Id::new(0)` means "unresolved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(i64);

impl Id {
    /// Creates an ID from a raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns true if this is the unresolved sentinel (`0`).
    #[must_use]
    pub const fn is_unresolved(self) -> bool {
        self.0 == 0
    }

    /// Encodes the ID for use in an index key position.
    ///
    /// The two's-complement bytes are written big-endian, so positive IDs
    /// sort in numeric order and negative (system) IDs sort after all
    /// positive ones. System ranges are only ever scanned by exact ID, so
    /// their placement does not matter.
    #[must_use]
    pub const fn to_key_bytes(self) -> [u8; 8] {
        (self.0 as u64).to_be_bytes()
    }

    /// Decodes an ID from its key-position encoding.
    #[must_use]
    pub const fn from_key_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes) as i64)
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bytes_roundtrip() {
        for raw in [0i64, 1, 42, -1, -511, i64::MAX, i64::MIN] {
            let id = Id::new(raw);
            assert_eq!(Id::from_key_bytes(id.to_key_bytes()), id);
        }
    }

    #[test]
    fn positive_ids_sort_numerically() {
        let a = Id::new(1).to_key_bytes();
        let b = Id::new(256).to_key_bytes();
        assert!(a < b);
    }

    #[test]
    fn negative_ids_sort_after_positive() {
        let positive = Id::new(i64::MAX).to_key_bytes();
        let negative = Id::new(-1).to_key_bytes();
        assert!(positive < negative);
    }

    #[test]
    fn unresolved_sentinel() {
        assert!(Id::new(0).is_unresolved());
        assert!(!Id::new(7).is_unresolved());
    }
}

//! Newtype ID for stable record identity.
//!
//! Record ids are handed out by the store when a record is created and are
//! the only key used to connect a record to its table row and map marker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a coordinate record within a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Creates a new RecordId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(RecordId(1), RecordId(1));
        assert_ne!(RecordId(1), RecordId(2));
    }

    #[test]
    fn test_id_ordering() {
        assert!(RecordId(1) < RecordId(2));
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(RecordId(1));
        set.insert(RecordId(2));
        set.insert(RecordId(1)); // duplicate
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(RecordId::from(7).to_string(), "7");
        assert_eq!(format!("{:?}", RecordId(7)), "RecordId(7)");
    }
}

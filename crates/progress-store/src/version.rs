use serde::{Deserialize, Serialize};

/// Checkpoint counter of one ticket's saga.
///
/// `0` means nothing is stored; every write advances it by exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a ticket with no checkpoint.
    pub fn initial() -> Self {
        Self(0)
    }

    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// True once at least one checkpoint has been written.
    pub fn is_stored(&self) -> bool {
        self.0 > 0
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_sequence() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::first().next(), Version::new(2));
        assert!(Version::new(3) > Version::new(2));
    }

    #[test]
    fn only_written_versions_are_stored() {
        assert!(!Version::initial().is_stored());
        assert!(!Version::default().is_stored());
        assert!(!Version::new(-1).is_stored());
        assert!(Version::first().is_stored());
    }
}

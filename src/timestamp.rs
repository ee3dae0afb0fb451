//! Unix timestamp type shared across verification records.
//!
//! Block-inclusion times reported by explorers, the `as-of` instant of a
//! balance snapshot, and the moment a verification was performed are all
//! plain seconds since the Unix epoch. [`UnixTimestamp`] keeps them in one
//! place with a JSON encoding that survives JavaScript tooling.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// Seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// # Serialization
///
/// Serialized as a stringified integer to avoid loss of precision in JSON,
/// since JavaScript's `Number` type cannot safely represent all 64-bit
/// integers. Explorer APIs encode block timestamps the same way.
///
/// ```json
/// "1699999999"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let ts = s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer"))?;
        Ok(UnixTimestamp(ts))
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0 + rhs)
    }
}

impl UnixTimestamp {
    /// Creates a [`UnixTimestamp`] from a raw seconds value.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time as a [`UnixTimestamp`].
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set to a time before the Unix epoch,
    /// which should never happen on properly configured systems.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_string() {
        let ts = UnixTimestamp::from_secs(1699999999);
        let json = serde_json::to_string(&ts).expect("serializes");
        assert_eq!(json, "\"1699999999\"");
    }

    #[test]
    fn deserializes_from_string() {
        let ts: UnixTimestamp = serde_json::from_str("\"1699999999\"").expect("deserializes");
        assert_eq!(ts.as_secs(), 1699999999);
    }

    #[test]
    fn rejects_non_numeric_string() {
        let result = serde_json::from_str::<UnixTimestamp>("\"soon\"");
        assert!(result.is_err());
    }

    #[test]
    fn ordering_follows_seconds() {
        let earlier = UnixTimestamp::from_secs(100);
        let later = earlier + 50;
        assert!(earlier < later);
        assert_eq!(later.as_secs(), 150);
    }
}

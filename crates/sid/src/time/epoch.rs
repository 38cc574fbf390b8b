use chrono::{DateTime, Utc};
use core::fmt;

use crate::{Error, Result};

/// The epoch all `sid` timestamps are measured from, as an RFC 3339 instant.
///
/// Saturday, August 1, 2020 00:00:00 UTC. With 42 timestamp bits this leaves
/// room for roughly 139 years of IDs.
pub const DEFAULT_EPOCH: &str = "2020-08-01T00:00:00+00:00";

/// The origin (t = 0) of every timestamp encoded in a [`Sid`].
///
/// Stored as milliseconds since the Unix epoch. Timestamps inside IDs are
/// relative to this instant, never to 1970.
///
/// [`Sid`]: crate::Sid
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch {
    unix_millis: u64,
}

impl Epoch {
    /// [`DEFAULT_EPOCH`] as a constant.
    pub const SID: Self = Self::from_unix_millis(1_596_240_000_000);

    /// Creates an epoch from milliseconds since the Unix epoch.
    pub const fn from_unix_millis(unix_millis: u64) -> Self {
        Self { unix_millis }
    }

    /// Parses an RFC 3339 instant such as `2020-08-01T00:00:00Z`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpochInvalid`] if `input` is not RFC 3339 or lies
    /// before the Unix epoch. This is a configuration error: a process that
    /// cannot resolve its epoch must not hand out IDs.
    ///
    /// # Example
    ///
    /// ```
    /// use sid::{DEFAULT_EPOCH, Epoch};
    ///
    /// assert_eq!(Epoch::parse(DEFAULT_EPOCH).unwrap(), Epoch::SID);
    /// assert!(Epoch::parse("August 1st").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(input).map_err(|e| Error::EpochInvalid {
            input: input.to_owned(),
            reason: e.to_string(),
        })?;
        let unix_millis =
            u64::try_from(parsed.timestamp_millis()).map_err(|_| Error::EpochInvalid {
                input: input.to_owned(),
                reason: "instant precedes the Unix epoch".to_owned(),
            })?;

        Ok(Self::from_unix_millis(unix_millis))
    }

    /// Milliseconds between the Unix epoch and this epoch.
    pub const fn as_unix_millis(&self) -> u64 {
        self.unix_millis
    }

    /// Converts a timestamp relative to this epoch into a UTC instant.
    pub fn to_datetime(&self, millis: u64) -> DateTime<Utc> {
        let unix_millis = self.unix_millis.saturating_add(millis);
        i64::try_from(unix_millis)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::SID
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime(0).to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_epoch_string_matches_constant() {
        let epoch = Epoch::parse(DEFAULT_EPOCH).unwrap();
        assert_eq!(epoch, Epoch::SID);
        assert_eq!(epoch.as_unix_millis(), 1_596_240_000_000);
    }

    #[test]
    fn parses_zulu_and_offsets() {
        let zulu = Epoch::parse("2020-08-01T00:00:00Z").unwrap();
        let offset = Epoch::parse("2020-08-01T02:00:00+02:00").unwrap();
        assert_eq!(zulu, offset);
    }

    #[test]
    fn rejects_malformed_epoch() {
        let err = Epoch::parse("2020-13-01T00:00:00Z").unwrap_err();
        assert!(matches!(err, Error::EpochInvalid { ref input, .. } if input == "2020-13-01T00:00:00Z"));
    }

    #[test]
    fn rejects_pre_unix_epoch() {
        let err = Epoch::parse("1969-12-31T23:59:59Z").unwrap_err();
        assert!(matches!(err, Error::EpochInvalid { .. }));
    }

    #[test]
    fn to_datetime_adds_offset() {
        let time = Epoch::SID.to_datetime(1000);
        assert_eq!(time.timestamp_millis(), 1_596_240_001_000);
        assert_eq!(Epoch::SID.to_string(), "2020-08-01T00:00:00+00:00");
    }
}

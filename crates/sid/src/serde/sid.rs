//! Serde helpers for [`Sid`](crate::Sid).
//!
//! `Sid` itself (de)serializes transparently as its `u64`. Use [`as_string`]
//! with `#[serde(with = "...")]` when the consumer cannot hold 64-bit integers
//! exactly, such as JavaScript clients of a JSON API.

/// (De)serialize a [`Sid`](crate::Sid) as a decimal string.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use sid::Sid;
///
/// #[derive(Serialize, Deserialize)]
/// struct Record {
///     #[serde(with = "sid::as_string")]
///     id: Sid,
/// }
///
/// let json = serde_json::to_string(&Record { id: Sid::from_raw(42) }).unwrap();
/// assert_eq!(json, r#"{"id":"42"}"#);
/// ```
pub mod as_string {
    use core::fmt;
    use serde::{Deserializer, Serializer, de};

    use crate::Sid;

    /// Serialize an ID as its decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &Sid, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(id)
    }

    /// Deserialize an ID from a decimal string.
    ///
    /// Plain integers are accepted as well, so existing payloads keep
    /// decoding after switching a field to this representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is neither a decimal string nor a
    /// non-negative integer.
    pub fn deserialize<'de, D>(d: D) -> Result<Sid, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SidVisitor;

        impl de::Visitor<'_> for SidVisitor {
            type Value = Sid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal sid string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Sid, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Sid, E> {
                Ok(Sid::from_raw(v))
            }
        }

        d.deserialize_any(SidVisitor)
    }
}

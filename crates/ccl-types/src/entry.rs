use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::temporal::Timestamp;

/// Payload field holding the device identifier.
pub const DEVICE_FIELD: &str = "deviceId";
/// Payload field holding the credit amount.
pub const CREDITS_FIELD: &str = "carbonCredits";

/// The caller-supplied record carried by an entry.
///
/// The ledger treats it as opaque apart from the device and credits fields
/// it reads for indexing and aggregation.
pub type Payload = serde_json::Map<String, Value>;

/// Convert an arbitrary JSON value into a [`Payload`].
///
/// Only JSON objects are accepted.
pub fn into_payload(value: Value) -> Result<Payload, TypeError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(TypeError::NotAnObject("array")),
        Value::String(_) => Err(TypeError::NotAnObject("string")),
        Value::Number(_) => Err(TypeError::NotAnObject("number")),
        Value::Bool(_) => Err(TypeError::NotAnObject("boolean")),
        Value::Null => Err(TypeError::NotAnObject("null")),
    }
}

/// Identifier of a ledger entry.
///
/// Generated as `<prefix>-<unix millis>-<8 hex chars>`. The millisecond
/// component keeps ids roughly time-ordered for humans; the random suffix
/// separates entries created within the same millisecond.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a fresh id for an entry created at `at`.
    pub fn generate(prefix: &str, at: Timestamp) -> Self {
        let suffix: [u8; 4] = rand::random();
        Self(format!("{prefix}-{}-{}", at.as_millis(), hex::encode(suffix)))
    }

    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl PartialEq<str> for EntryId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// One signed record in the ledger.
///
/// `timestamp` is the ledger-recorded creation time. A payload may carry
/// its own `timestamp` field inside `data`; the two are independent.
///
/// `data` and `signature` tolerate being absent or `null` in a stored
/// snapshot so that a damaged entry still loads and is reported by the
/// integrity sweep instead of making the whole ledger unreadable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Payload,
    pub timestamp: Timestamp,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signature: String,
}

impl LedgerEntry {
    /// The string value of `field` inside `data`, if present.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// The numeric value of `field` inside `data`, if present.
    pub fn number_field(&self, field: &str) -> Option<f64> {
        self.data.get(field).and_then(Value::as_f64)
    }

    /// Device identifier carried by the payload.
    pub fn device_id(&self) -> Option<&str> {
        self.str_field(DEVICE_FIELD)
    }

    /// Credit amount carried by the payload; zero when absent or non-numeric.
    pub fn credits(&self) -> f64 {
        self.number_field(CREDITS_FIELD).unwrap_or(0.0)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(data: Value) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new("entry-1-00000000"),
            data: into_payload(data).unwrap(),
            timestamp: Timestamp::from_millis(1_000).unwrap(),
            signature: "ab".into(),
        }
    }

    #[test]
    fn generated_id_has_prefix_millis_and_suffix() {
        let at = Timestamp::from_millis(1_700_000_000_000).unwrap();
        let id = EntryId::generate("ccl", at);
        let parts: Vec<_> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ccl");
        assert_eq!(parts[1], "1700000000000");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_differ_within_one_millisecond() {
        let at = Timestamp::from_millis(42).unwrap();
        let ids: std::collections::HashSet<_> =
            (0..64).map(|_| EntryId::generate("ccl", at)).collect();
        assert!(ids.len() > 60);
    }

    #[test]
    fn into_payload_rejects_non_objects() {
        assert_eq!(into_payload(json!([1])), Err(TypeError::NotAnObject("array")));
        assert_eq!(into_payload(json!("x")), Err(TypeError::NotAnObject("string")));
        assert_eq!(into_payload(Value::Null), Err(TypeError::NotAnObject("null")));
        assert!(into_payload(json!({})).is_ok());
    }

    #[test]
    fn field_accessors() {
        let e = entry(json!({"deviceId": "sim-1", "carbonCredits": 5, "kWh": "n/a"}));
        assert_eq!(e.str_field("deviceId"), Some("sim-1"));
        assert_eq!(e.number_field("carbonCredits"), Some(5.0));
        assert_eq!(e.number_field("kWh"), None);
        assert_eq!(e.str_field("missing"), None);
        assert_eq!(e.device_id(), Some("sim-1"));
        assert_eq!(e.credits(), 5.0);
        assert_eq!(entry(json!({"carbonCredits": "5"})).credits(), 0.0);
    }

    #[test]
    fn wire_format_matches_snapshot_layout() {
        let e = entry(json!({"deviceId": "sim-1"}));
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "entry-1-00000000",
                "data": {"deviceId": "sim-1"},
                "timestamp": "1970-01-01T00:00:01.000Z",
                "signature": "ab"
            })
        );
    }

    #[test]
    fn missing_or_null_signature_and_data_still_load() {
        let e: LedgerEntry = serde_json::from_value(json!({
            "id": "x",
            "timestamp": "1970-01-01T00:00:01.000Z",
            "data": null
        }))
        .unwrap();
        assert!(e.data.is_empty());
        assert!(e.signature.is_empty());
    }
}

//! proto3 JSON carries int64 values as strings. Use with
//! `#[serde(with = "crate::gcp::int64")]`; numbers are accepted on input too.

use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(n) => Ok(n),
        Repr::Str(s) => s.parse().map_err(de::Error::custom),
    }
}

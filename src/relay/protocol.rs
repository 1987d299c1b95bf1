use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::RelayError;

/// Everything the relay can tell us. Unknown `type`s land in `Unknown`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inbound {
    Init {
        #[serde(rename = "userId", deserialize_with = "user_id")]
        user_id: String,
    },
    UserUpdate {
        #[serde(rename = "userId", deserialize_with = "user_id")]
        user_id: String,
        page: i64,
    },
    UserLeave {
        #[serde(rename = "userId", deserialize_with = "user_id")]
        user_id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    PageMove { page: u8 },
}

// servers hand out ids as numbers or strings; we key on text either way
fn user_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("bad userId: {other}"))),
    }
}

pub fn decode(text: &str) -> Result<Inbound, RelayError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode(msg: &Outbound) -> Result<String, RelayError> {
    Ok(serde_json::to_string(msg)?)
}

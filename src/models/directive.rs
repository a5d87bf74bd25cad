use anyhow::{Error, Result, anyhow};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Top-level shape of the pending-ack directive file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectiveFile {
    #[serde(default)]
    pub messages: Vec<MatchRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchRule {
    #[serde(rename = "routingKey", default)]
    pub routing_key: String,

    #[serde(default)]
    pub contains: Vec<ContainsClause>,

    #[serde(rename = "containsString", default)]
    pub contains_string: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainsClause {
    pub key: String,
    pub value: ClauseValue,
}

/// Comparison value of a contains-clause.
///
/// Numbers keep the decimal count of their shortest textual form so the
/// search token is rendered exactly as a JSON serializer would write it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseValue {
    String(String),
    Number { value: f64, decimals: usize },
    Bool(bool),
}

impl ClauseValue {
    pub fn number(value: f64) -> Self {
        let shortest = value.to_string();
        let decimals = shortest
            .find('.')
            .map(|dot| shortest.len() - dot - 1)
            .unwrap_or(0);

        ClauseValue::Number { value, decimals }
    }

    fn from_json(value: JsonValue) -> Result<Self, Error> {
        match value {
            JsonValue::String(s) => Ok(ClauseValue::String(s)),
            JsonValue::Bool(b) => Ok(ClauseValue::Bool(b)),
            JsonValue::Number(n) => n
                .as_f64()
                .map(ClauseValue::number)
                .ok_or_else(|| anyhow!("Number {} is not representable as f64", n)),
            other => Err(anyhow!(
                "Unsupported contains value {}, expected string, number or bool",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ClauseValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = JsonValue::deserialize(deserializer)?;
        ClauseValue::from_json(raw).map_err(serde::de::Error::custom)
    }
}

impl DirectiveFile {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let file = serde_json::from_slice::<Self>(bytes)?;
        Ok(file)
    }
}

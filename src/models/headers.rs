use lapin::types::{AMQPValue, FieldArray, FieldTable, LongString, ShortString};
use serde_json::{Map, Number, Value as JsonValue};

/// Converts an AMQP header table into a plain JSON object.
pub fn table_to_json(table: &FieldTable) -> Map<String, JsonValue> {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), value_to_json(value)))
        .collect()
}

pub fn value_to_json(value: &AMQPValue) -> JsonValue {
    match value {
        AMQPValue::Boolean(b) => JsonValue::Bool(*b),
        AMQPValue::ShortShortInt(v) => JsonValue::from(*v),
        AMQPValue::ShortShortUInt(v) => JsonValue::from(*v),
        AMQPValue::ShortInt(v) => JsonValue::from(*v),
        AMQPValue::ShortUInt(v) => JsonValue::from(*v),
        AMQPValue::LongInt(v) => JsonValue::from(*v),
        AMQPValue::LongUInt(v) => JsonValue::from(*v),
        AMQPValue::LongLongInt(v) => JsonValue::from(*v),
        AMQPValue::Timestamp(v) => JsonValue::from(*v),
        AMQPValue::Float(v) => float_to_json(f64::from(*v)),
        AMQPValue::Double(v) => float_to_json(*v),
        AMQPValue::DecimalValue(d) => {
            float_to_json(f64::from(d.value) / 10f64.powi(i32::from(d.scale)))
        }
        AMQPValue::ShortString(s) => JsonValue::String(s.as_str().to_string()),
        AMQPValue::LongString(s) => {
            JsonValue::String(String::from_utf8_lossy(s.as_bytes()).into_owned())
        }
        AMQPValue::FieldArray(items) => {
            JsonValue::Array(items.as_slice().iter().map(value_to_json).collect())
        }
        AMQPValue::FieldTable(table) => JsonValue::Object(table_to_json(table)),
        AMQPValue::ByteArray(bytes) => {
            JsonValue::Array(bytes.as_slice().iter().map(|b| JsonValue::from(*b)).collect())
        }
        AMQPValue::Void => JsonValue::Null,
        #[allow(unreachable_patterns)]
        _ => JsonValue::Null,
    }
}

fn float_to_json(v: f64) -> JsonValue {
    Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Converts a JSON header object back into an AMQP field table.
pub fn json_to_table(map: &Map<String, JsonValue>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in map {
        table.insert(ShortString::from(key.clone()), json_to_value(value));
    }
    table
}

pub fn json_to_value(value: &JsonValue) -> AMQPValue {
    match value {
        JsonValue::Null => AMQPValue::Void,
        JsonValue::Bool(b) => AMQPValue::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                AMQPValue::LongLongInt(i)
            } else {
                AMQPValue::Double(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => AMQPValue::LongString(LongString::from(s.clone())),
        JsonValue::Array(items) => AMQPValue::FieldArray(FieldArray::from(
            items.iter().map(json_to_value).collect::<Vec<_>>(),
        )),
        JsonValue::Object(map) => AMQPValue::FieldTable(json_to_table(map)),
    }
}

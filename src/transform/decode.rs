use crate::errors::ReaderError;
use serde_json::{Map, Value};

/// Extract the `Message` text from a JSON notification envelope.
///
/// The body must be a JSON object; other fields are ignored and a repeated
/// `Message` key keeps its last value.
pub fn decode_envelope(body: &str) -> Result<String, ReaderError> {
    let mut env: Map<String, Value> =
        serde_json::from_str(body).map_err(|e| ReaderError::Envelope(e.to_string()))?;
    match env.remove("Message") {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ReaderError::Envelope(format!(
            "Message is not a string: {}",
            json_kind(&other)
        ))),
        None => Err(ReaderError::Envelope("missing Message field".into())),
    }
}

/// Non-empty `\n`-separated lines of a payload, in order.
pub fn payload_lines(message: &str) -> impl Iterator<Item = &str> {
    message.split('\n').filter(|line| !line.is_empty())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

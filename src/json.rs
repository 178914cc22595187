use serde_json::{Map, Number as JsonNumber, Value as JsonValue};

use crate::error::Error;
use crate::interpreter::evaluator::Interpreter;
use crate::value::Value;

/// Converts a runtime value to its JSON counterpart. Complex values dump
/// their visible own entries (the `__...__` protocol keys are skipped);
/// lists dump their integer-keyed entries in numeric order. Non-finite
/// numbers and the imaginary part have no JSON form and become null.
pub fn to_json(interp: &Interpreter, value: &Value) -> JsonValue {
    match value {
        Value::Null | Value::Void => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Number(n) => {
            if n.is_complex() {
                return JsonValue::Null;
            }
            JsonNumber::from_f64(n.real)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        }
        Value::Str(s) => JsonValue::String(s.to_string()),
        Value::Buffer(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::List(props) => {
            let mut items = Vec::new();
            for (_, key) in interp.tables.integer_keys(props.own) {
                if let Some(child) = interp.tables.get(props.own, &key) {
                    items.push(to_json(interp, child));
                }
            }
            JsonValue::Array(items)
        }
        other => match other.properties() {
            Some(props) => {
                let mut map = Map::new();
                for (key, child) in interp.tables.entries(props.own) {
                    if key.starts_with("__") && key.ends_with("__") {
                        continue;
                    }
                    map.insert(key.clone(), to_json(interp, child));
                }
                JsonValue::Object(map)
            }
            None => JsonValue::Null,
        },
    }
}

/// Converts parsed JSON back into runtime values. Objects become objects,
/// arrays become lists, numbers become real numbers.
pub fn from_json(interp: &mut Interpreter, json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::Number(n) => interp.make_real(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::string(s.as_str()),
        JsonValue::Array(items) => {
            let values: Vec<Value> = items.iter().map(|item| from_json(interp, item)).collect();
            interp.list_from(values)
        }
        JsonValue::Object(map) => {
            let entries: Vec<(String, Value)> = map
                .iter()
                .map(|(key, child)| (key.clone(), from_json(interp, child)))
                .collect();
            interp.object_from(entries)
        }
    }
}

/// Renders a runtime value as JSON text, pretty-printed when asked.
pub fn to_text(interp: &Interpreter, value: &Value, pretty: bool) -> Result<String, Error> {
    let json = to_json(interp, value);
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.map_err(|e| Error::invalid_argument(e.to_string()))
}

/// Parses JSON text into a runtime value.
pub fn from_text(interp: &mut Interpreter, text: &str) -> Result<Value, Error> {
    let json: JsonValue = serde_json::from_str(text)
        .map_err(|_| Error::invalid_argument("El texto no es JSON valido"))?;
    Ok(from_json(interp, &json))
}

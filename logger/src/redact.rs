use serde_json::Value;

/// Keys whose values identify a customer.
pub const PII_KEYS: [&str; 6] = ["firstName", "lastName", "email", "phone", "address", "notes"];

const MASK: &str = "[redacted]";

/// Masks every PII value in `value`, at any depth.
pub fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if PII_KEYS.contains(&key.as_str()) {
                    *inner = Value::String(MASK.to_string());
                } else {
                    redact_json(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}

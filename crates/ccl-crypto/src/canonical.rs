use serde_json::Value;

use crate::error::SignerError;

/// Encode a JSON value as canonical bytes.
///
/// Compact output with object keys sorted by byte order at every nesting
/// level. Independent of whether `serde_json` was built with
/// `preserve_order`, so a payload signs identically no matter how its map
/// was constructed or which features the final binary unified.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>, SignerError> {
    let mut out = Vec::with_capacity(128);
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), SignerError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(&Value::String(key.clone()), out)?;
                out.push(b':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) -> Result<(), SignerError> {
    serde_json::to_writer(out, value).map_err(|e| SignerError::Canonicalization(e.to_string()))
}

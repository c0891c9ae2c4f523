use crate::errors::{error_codes, ProjectError};
use crate::types::{Map, Value};

/// Parses a raw query string into a parameter container.
///
/// - `+` decodes to a space, `%XX` sequences are percent-decoded
/// - a bare key (`?flag`) is stored as an empty string
/// - repeated keys collect into an array, in order of appearance
pub fn parse_query_string(query: &str) -> Map {
    let mut params = Map::new();
    let query = query.strip_prefix('?').unwrap_or(query);

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((key, value)) => (key, value),
            None => (pair, ""),
        };
        let (Some(key), Some(value)) = (decode_component(raw_key), decode_component(raw_value)) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        match params.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                params.insert(key, Value::String(value));
            }
        }
    }

    params
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Parses a JSON request body. The top level must be an object.
pub fn parse_json_body(data: &[u8]) -> Result<Map, ProjectError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let json: serde_json::Value = serde_json::from_slice(data).map_err(|e| {
        ProjectError::request(error_codes::INVALID_JSON, format!("Invalid JSON: {e}"))
    })?;

    match Value::from(json) {
        Value::Object(map) => Ok(map),
        other => Err(ProjectError::request(
            error_codes::INVALID_JSON,
            format!("JSON body must be an object, received `{}`", other.type_name()),
        )),
    }
}

/// Parses an `application/x-www-form-urlencoded` body.
pub fn parse_form_body(data: &[u8]) -> Result<Map, ProjectError> {
    let body_str = std::str::from_utf8(data).map_err(|e| {
        ProjectError::request(
            error_codes::INVALID_UTF8,
            format!("Invalid UTF-8 in form body: {e}"),
        )
    })?;

    Ok(parse_query_string(body_str))
}
